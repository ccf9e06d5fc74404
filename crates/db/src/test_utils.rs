//! Test utilities for database operations.
//!
//! Provides an in-memory `SQLite` database with the schema already migrated,
//! plus builders for the rows most tests need.

use crate::entities::user;
use crate::migrations::Migrator;
use chrono::Utc;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// URL of a private in-memory `SQLite` database.
pub const MEMORY_URL: &str = "sqlite::memory:";

/// A migrated test database.
///
/// Each instance owns its own in-memory database, so tests can run in
/// parallel without sharing state.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
}

impl TestDatabase {
    /// Create a fresh in-memory database and run all migrations.
    pub async fn memory() -> Result<Self, DbErr> {
        // A second pooled connection would open a second, empty database
        let mut opt = ConnectOptions::new(MEMORY_URL);
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        info!("Created in-memory test database");

        Ok(Self { conn })
    }

    /// Get the database connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Consume the wrapper and hand out the connection.
    #[must_use]
    pub fn into_connection(self) -> DatabaseConnection {
        self.conn
    }
}

/// A user row ready to insert, with only the required columns filled in.
#[must_use]
pub fn new_user(username: &str, email: &str) -> user::ActiveModel {
    user::ActiveModel {
        email: Set(email.to_string()),
        username: Set(username.to_string()),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
}
