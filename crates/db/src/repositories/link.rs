//! Link repository.

use crate::entities::{Link, link};
use cutaway_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};

/// Outcome of [`LinkRepository::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkUpsert {
    /// A new link row was inserted.
    Created,
    /// An existing link with the same name was rewritten in place.
    Updated,
}

/// Link repository for database operations.
pub struct LinkRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> LinkRepository<'a, C> {
    /// Create a new link repository on top of a connection or session.
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Links of one bucket of a user.
    pub async fn list(&self, user_id: i32, additional: bool) -> AppResult<Vec<link::Model>> {
        Link::find()
            .filter(link::Column::UserId.eq(user_id))
            .filter(link::Column::Additional.eq(additional))
            .order_by_asc(link::Column::Id)
            .all(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All links of a user, both buckets.
    pub async fn list_all(&self, user_id: i32) -> AppResult<Vec<link::Model>> {
        Link::find()
            .filter(link::Column::UserId.eq(user_id))
            .order_by_asc(link::Column::Id)
            .all(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a link, or rewrite the user's link that already carries `name`.
    ///
    /// The match is on `name` alone, whichever bucket the existing link is in:
    /// an existing link is moved into the requested bucket and gets the new
    /// address instead of a second row being created.
    pub async fn upsert(
        &self,
        user_id: i32,
        name: &str,
        address: &str,
        additional: bool,
    ) -> AppResult<LinkUpsert> {
        let existing = self
            .list_all(user_id)
            .await?
            .into_iter()
            .find(|l| l.name == name);

        if let Some(existing) = existing {
            let mut model = existing.into_active_model();
            model.link = Set(address.to_string());
            model.additional = Set(additional);
            model
                .update(self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(LinkUpsert::Updated);
        }

        let model = link::ActiveModel {
            name: Set(name.to_string()),
            link: Set(address.to_string()),
            additional: Set(additional),
            user_id: Set(user_id),
            ..Default::default()
        };
        model
            .insert(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(LinkUpsert::Created)
    }

    /// Delete the user's link named `name`.
    ///
    /// Returns `false` if the user has no such link.
    pub async fn delete(&self, user_id: i32, name: &str) -> AppResult<bool> {
        let found = Link::find()
            .filter(link::Column::UserId.eq(user_id))
            .filter(link::Column::Name.eq(name))
            .order_by_asc(link::Column::Id)
            .one(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match found {
            Some(l) => {
                l.delete(self.db)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::repositories::UserRepository;
    use crate::test_utils::{TestDatabase, new_user};

    async fn setup() -> (TestDatabase, i32) {
        let db = TestDatabase::memory().await.unwrap();
        let user = UserRepository::new(db.connection())
            .create(new_user("alice", "alice@x.com"))
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let (db, user_id) = setup().await;
        let repo = LinkRepository::new(db.connection());

        let first = repo.upsert(user_id, "telegram", "@a", false).await.unwrap();
        assert_eq!(first, LinkUpsert::Created);

        let second = repo.upsert(user_id, "telegram", "@b", false).await.unwrap();
        assert_eq!(second, LinkUpsert::Updated);

        let links = repo.list(user_id, false).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link, "@b");
    }

    #[tokio::test]
    async fn test_upsert_moves_link_between_buckets() {
        let (db, user_id) = setup().await;
        let repo = LinkRepository::new(db.connection());

        repo.upsert(user_id, "telegram", "@a", false).await.unwrap();
        let outcome = repo.upsert(user_id, "telegram", "@b", true).await.unwrap();
        assert_eq!(outcome, LinkUpsert::Updated);

        let all = repo.list_all(user_id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "telegram");
        assert_eq!(all[0].link, "@b");
        assert!(all[0].additional);

        assert!(repo.list(user_id, false).await.unwrap().is_empty());
        assert_eq!(repo.list(user_id, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_buckets_are_separate_lists() {
        let (db, user_id) = setup().await;
        let repo = LinkRepository::new(db.connection());

        repo.upsert(user_id, "telegram", "@a", false).await.unwrap();
        repo.upsert(user_id, "GitHub", "github.com/a", true).await.unwrap();

        let primary = repo.list(user_id, false).await.unwrap();
        let additional = repo.list(user_id, true).await.unwrap();
        assert_eq!(primary.len(), 1);
        assert_eq!(primary[0].name, "telegram");
        assert_eq!(additional.len(), 1);
        assert_eq!(additional[0].name, "GitHub");
    }

    #[tokio::test]
    async fn test_delete_link() {
        let (db, user_id) = setup().await;
        let repo = LinkRepository::new(db.connection());

        repo.upsert(user_id, "telegram", "@a", false).await.unwrap();
        assert!(repo.delete(user_id, "telegram").await.unwrap());
        assert!(!repo.delete(user_id, "telegram").await.unwrap());
        assert!(repo.list_all(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_only_touches_owner() {
        let (db, alice) = setup().await;
        let bob = UserRepository::new(db.connection())
            .create(new_user("bob", "bob@x.com"))
            .await
            .unwrap()
            .id;
        let repo = LinkRepository::new(db.connection());

        repo.upsert(bob, "telegram", "@bob", false).await.unwrap();
        assert!(!repo.delete(alice, "telegram").await.unwrap());
        assert_eq!(repo.list_all(bob).await.unwrap().len(), 1);
    }
}
