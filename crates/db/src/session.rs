//! Request-scoped unit of work.

use cutaway_common::AppResult;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

/// A database transaction opened for the lifetime of one request.
///
/// Every repository call made while serving the request goes through
/// [`Session::conn`]. The request ends with [`Session::commit`]; dropping the
/// session without committing (an early `?` return, a panic) rolls it back.
pub struct Session {
    txn: DatabaseTransaction,
}

impl Session {
    /// Open a new session on a pooled connection.
    pub async fn begin(db: &DatabaseConnection) -> AppResult<Self> {
        let txn = db.begin().await?;
        Ok(Self { txn })
    }

    /// Connection handle for repositories.
    #[must_use]
    pub const fn conn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Make every change of this session visible.
    pub async fn commit(self) -> AppResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    /// Discard every change of this session.
    pub async fn rollback(self) -> AppResult<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}
