//! Follow repository.

use std::collections::HashMap;

use crate::entities::{Follow, follow};
use chrono::Utc;
use cutaway_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};

/// Follow repository for database operations.
pub struct FollowRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> FollowRepository<'a, C> {
    /// Create a new follow repository on top of a connection or session.
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Create the edge `follower_id -> user_id`.
    ///
    /// Returns `false` if the edge already existed. A concurrent duplicate
    /// lands on the unique index and is skipped instead of failing.
    pub async fn create(&self, follower_id: i32, user_id: i32) -> AppResult<bool> {
        let model = follow::ActiveModel {
            user_id: Set(user_id),
            follower_id: Set(follower_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let inserted = Follow::insert(model)
            .on_conflict(
                OnConflict::columns([follow::Column::FollowerId, follow::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Delete the edge `follower_id -> user_id`.
    ///
    /// Returns `false` if there was no such edge.
    pub async fn delete_by_pair(&self, follower_id: i32, user_id: i32) -> AppResult<bool> {
        let result = Follow::delete_many()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::UserId.eq(user_id))
            .exec(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Count followers of a user.
    pub async fn count_followers(&self, user_id: i32) -> AppResult<u64> {
        Follow::find()
            .filter(follow::Column::UserId.eq(user_id))
            .count(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Follower counts for several users at once. Users without followers are absent.
    pub async fn count_followers_many(&self, user_ids: &[i32]) -> AppResult<HashMap<i32, u64>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Follow::find()
            .select_only()
            .column(follow::Column::UserId)
            .column_as(follow::Column::Id.count(), "followers")
            .filter(follow::Column::UserId.is_in(user_ids.to_vec()))
            .group_by(follow::Column::UserId)
            .into_tuple::<(i32, i64)>()
            .all(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(user_id, followers)| (user_id, followers as u64))
            .collect())
    }

    /// Users with the most followers, best first, ties by ascending id.
    ///
    /// Users nobody follows never appear.
    pub async fn top_followed(&self, limit: u64) -> AppResult<Vec<(i32, u64)>> {
        let rows = Follow::find()
            .select_only()
            .column(follow::Column::UserId)
            .column_as(follow::Column::Id.count(), "followers")
            .group_by(follow::Column::UserId)
            .order_by_desc(follow::Column::Id.count())
            .order_by_asc(follow::Column::UserId)
            .limit(limit)
            .into_tuple::<(i32, i64)>()
            .all(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(user_id, followers)| (user_id, followers as u64))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::repositories::UserRepository;
    use crate::test_utils::{TestDatabase, new_user};

    async fn setup(count: usize) -> (TestDatabase, Vec<i32>) {
        let db = TestDatabase::memory().await.unwrap();
        let users = UserRepository::new(db.connection());
        let mut ids = Vec::new();
        for i in 0..count {
            let user = users
                .create(new_user(&format!("user{i}"), &format!("user{i}@x.com")))
                .await
                .unwrap();
            ids.push(user.id);
        }
        (db, ids)
    }

    #[tokio::test]
    async fn test_create_edge() {
        let (db, ids) = setup(2).await;
        let repo = FollowRepository::new(db.connection());

        assert!(repo.create(ids[0], ids[1]).await.unwrap());

        assert_eq!(repo.count_followers(ids[1]).await.unwrap(), 1);
        assert_eq!(repo.count_followers(ids[0]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_edge_is_skipped() {
        let (db, ids) = setup(2).await;
        let repo = FollowRepository::new(db.connection());

        assert!(repo.create(ids[0], ids[1]).await.unwrap());
        assert!(!repo.create(ids[0], ids[1]).await.unwrap());
        assert_eq!(repo.count_followers(ids[1]).await.unwrap(), 1);

        // The reverse edge is a different pair
        assert!(repo.create(ids[1], ids[0]).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_pair() {
        let (db, ids) = setup(2).await;
        let repo = FollowRepository::new(db.connection());

        repo.create(ids[0], ids[1]).await.unwrap();
        assert!(repo.delete_by_pair(ids[0], ids[1]).await.unwrap());
        assert!(!repo.delete_by_pair(ids[0], ids[1]).await.unwrap());
    }

    #[tokio::test]
    async fn test_top_followed_orders_by_count() {
        // a:3, b:1, c:0, d:2
        let (db, ids) = setup(7).await;
        let (a, b, d) = (ids[0], ids[1], ids[3]);
        let fans = &ids[4..];
        let repo = FollowRepository::new(db.connection());

        for fan in fans {
            repo.create(*fan, a).await.unwrap();
        }
        repo.create(fans[0], b).await.unwrap();
        repo.create(fans[0], d).await.unwrap();
        repo.create(fans[1], d).await.unwrap();

        let top = repo.top_followed(2).await.unwrap();
        assert_eq!(top, vec![(a, 3), (d, 2)]);

        let all = repo.top_followed(10).await.unwrap();
        assert_eq!(all, vec![(a, 3), (d, 2), (b, 1)]);
    }

    #[tokio::test]
    async fn test_top_followed_ties_by_id() {
        let (db, ids) = setup(3).await;
        let repo = FollowRepository::new(db.connection());

        repo.create(ids[0], ids[2]).await.unwrap();
        repo.create(ids[0], ids[1]).await.unwrap();

        let top = repo.top_followed(5).await.unwrap();
        assert_eq!(top, vec![(ids[1], 1), (ids[2], 1)]);
    }

    #[tokio::test]
    async fn test_count_followers_many() {
        let (db, ids) = setup(3).await;
        let repo = FollowRepository::new(db.connection());

        repo.create(ids[0], ids[1]).await.unwrap();
        repo.create(ids[2], ids[1]).await.unwrap();

        let counts = repo.count_followers_many(&ids).await.unwrap();
        assert_eq!(counts.get(&ids[1]), Some(&2));
        assert_eq!(counts.get(&ids[0]), None);
    }
}
