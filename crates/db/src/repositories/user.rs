//! User repository.

use crate::entities::{Follow, Link, User, follow, link, user};
use cutaway_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Default page size for [`UserRepository::list`].
pub const DEFAULT_PAGE_LIMIT: u64 = 1000;

/// Upper bound on username search results.
pub const SEARCH_LIMIT: u64 = 100;

/// The single criterion a user is looked up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookupKey {
    Email(String),
    Username(String),
    GoogleId(String),
    Id(i32),
}

/// Loose lookup criteria where any subset may be filled in.
///
/// Resolves to the first present criterion in the order
/// email, username, google id, id.
#[derive(Debug, Clone, Default)]
pub struct UserLookup {
    pub email: Option<String>,
    pub username: Option<String>,
    pub google_id: Option<String>,
    pub id: Option<i32>,
}

impl UserLookup {
    /// Pick the criterion to search by.
    pub fn into_key(self) -> AppResult<UserLookupKey> {
        // Empty strings count as absent
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());

        if let Some(email) = present(self.email) {
            Ok(UserLookupKey::Email(email))
        } else if let Some(username) = present(self.username) {
            Ok(UserLookupKey::Username(username))
        } else if let Some(google_id) = present(self.google_id) {
            Ok(UserLookupKey::GoogleId(google_id))
        } else if let Some(id) = self.id {
            Ok(UserLookupKey::Id(id))
        } else {
            Err(AppError::BadRequest("No search query".to_string()))
        }
    }
}

/// User repository for database operations.
pub struct UserRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    /// Create a new user repository on top of a connection or session.
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Find a user by a lookup key.
    pub async fn find(&self, key: &UserLookupKey) -> AppResult<Option<user::Model>> {
        let query = match key {
            UserLookupKey::Email(email) => User::find().filter(user::Column::Email.eq(email)),
            UserLookupKey::Username(username) => {
                User::find().filter(user::Column::Username.eq(username))
            }
            UserLookupKey::GoogleId(google_id) => {
                User::find().filter(user::Column::GoogleId.eq(google_id))
            }
            UserLookupKey::Id(id) => User::find_by_id(*id),
        };

        query
            .one(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        self.find(&UserLookupKey::Username(username.to_string()))
            .await
    }

    /// Find a user by username, returning an error if not found.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// Find users by IDs, in ID order.
    pub async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(user::Column::Id)
            .all(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List users in insertion order.
    pub async fn list(&self, offset: u64, limit: u64) -> AppResult<Vec<user::Model>> {
        User::find()
            .order_by_asc(user::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Case-sensitive substring search on usernames.
    pub async fn search(&self, pattern: &str) -> AppResult<Vec<user::Model>> {
        // SQLite's LIKE ignores ASCII case, so it gets instr() instead
        let condition = match self.db.get_database_backend() {
            DbBackend::Sqlite => {
                Expr::cust_with_values("instr(\"username\", ?) > 0", [pattern.to_string()])
            }
            _ => {
                let escaped = pattern
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                user::Column::Username.like(format!("%{escaped}%"))
            }
        };

        User::find()
            .filter(condition)
            .order_by_asc(user::Column::Id)
            .limit(SEARCH_LIMIT)
            .all(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .update(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a user together with its links and every follow edge touching it.
    ///
    /// Returns `false` if no such user exists.
    pub async fn delete(&self, id: i32) -> AppResult<bool> {
        Link::delete_many()
            .filter(link::Column::UserId.eq(id))
            .exec(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Follow::delete_many()
            .filter(
                follow::Column::UserId
                    .eq(id)
                    .or(follow::Column::FollowerId.eq(id)),
            )
            .exec(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let result = User::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{TestDatabase, new_user};

    #[test]
    fn test_lookup_priority() {
        let lookup = UserLookup {
            email: Some("a@x.com".to_string()),
            username: Some("alice".to_string()),
            google_id: Some("g1".to_string()),
            id: Some(1),
        };
        assert_eq!(
            lookup.into_key().unwrap(),
            UserLookupKey::Email("a@x.com".to_string())
        );

        let lookup = UserLookup {
            username: Some("alice".to_string()),
            id: Some(1),
            ..Default::default()
        };
        assert_eq!(
            lookup.into_key().unwrap(),
            UserLookupKey::Username("alice".to_string())
        );

        let lookup = UserLookup {
            google_id: Some("g1".to_string()),
            id: Some(1),
            ..Default::default()
        };
        assert_eq!(
            lookup.into_key().unwrap(),
            UserLookupKey::GoogleId("g1".to_string())
        );

        let lookup = UserLookup {
            id: Some(0),
            ..Default::default()
        };
        assert_eq!(lookup.into_key().unwrap(), UserLookupKey::Id(0));
    }

    #[test]
    fn test_lookup_without_criteria_fails() {
        let result = UserLookup::default().into_key();
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let lookup = UserLookup {
            email: Some(String::new()),
            ..Default::default()
        };
        assert!(lookup.into_key().is_err());
    }

    #[tokio::test]
    async fn test_find_by_each_key() {
        let db = TestDatabase::memory().await.unwrap();
        let repo = UserRepository::new(db.connection());

        let mut model = new_user("alice", "alice@x.com");
        model.google_id = sea_orm::Set(Some("g-alice".to_string()));
        let alice = repo.create(model).await.unwrap();

        for key in [
            UserLookupKey::Email("alice@x.com".to_string()),
            UserLookupKey::Username("alice".to_string()),
            UserLookupKey::GoogleId("g-alice".to_string()),
            UserLookupKey::Id(alice.id),
        ] {
            let found = repo.find(&key).await.unwrap();
            assert_eq!(found.map(|u| u.id), Some(alice.id), "lookup by {key:?}");
        }

        let missing = repo
            .find(&UserLookupKey::Username("bob".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let db = TestDatabase::memory().await.unwrap();
        let repo = UserRepository::new(db.connection());

        for i in 0..5 {
            repo.create(new_user(&format!("test{i}"), &format!("user{i}@example.com")))
                .await
                .unwrap();
        }

        let all = repo.list(0, DEFAULT_PAGE_LIMIT).await.unwrap();
        let names: Vec<_> = all.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["test0", "test1", "test2", "test3", "test4"]);

        let page = repo.list(1, 2).await.unwrap();
        let names: Vec<_> = page.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["test1", "test2"]);
    }

    #[tokio::test]
    async fn test_search_is_case_sensitive_substring() {
        let db = TestDatabase::memory().await.unwrap();
        let repo = UserRepository::new(db.connection());

        repo.create(new_user("test2_edit", "a@x.com")).await.unwrap();
        repo.create(new_user("Editor", "b@x.com")).await.unwrap();
        repo.create(new_user("nobody", "c@x.com")).await.unwrap();

        let found = repo.search("edi").await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["test2_edit"]);

        let found = repo.search("Edi").await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["Editor"]);
    }

    #[tokio::test]
    async fn test_unique_username_is_enforced_by_schema() {
        let db = TestDatabase::memory().await.unwrap();
        let repo = UserRepository::new(db.connection());

        repo.create(new_user("alice", "alice@x.com")).await.unwrap();
        let result = repo.create(new_user("alice", "other@x.com")).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let db = TestDatabase::memory().await.unwrap();
        let repo = UserRepository::new(db.connection());

        assert!(!repo.delete(42).await.unwrap());
    }
}
