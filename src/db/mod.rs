//! Relational storage for paper metadata: the database lifecycle and
//! repository interfaces, with their PostgreSQL implementation.

pub mod papers;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

pub use papers::{NewPaper, Paper, PaperRepository};
pub use postgres::PgDatabase;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("database is not started; call startup() first")]
    NotStarted,
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// A storage backend with an explicit lifecycle.
#[async_trait]
pub trait Database: Send + Sync {
    /// Unit of work. Changes made through it are kept only once committed.
    type Session: Send;

    /// Connect, verify the connection and create missing tables.
    async fn startup(&mut self) -> Result<()>;

    /// Close all connections. Safe to call more than once.
    async fn teardown(&self);

    async fn session(&self) -> Result<Self::Session>;
}

/// CRUD over one record type.
#[async_trait]
pub trait Repository: Send + Sync {
    type Id: Send + Sync + ?Sized;
    type Record: Send;
    type Input: Send + Sync;

    async fn create(&self, input: &Self::Input) -> Result<Self::Record>;

    async fn get_by_id(&self, id: &Self::Id) -> Result<Option<Self::Record>>;

    /// `None` when no record has this id.
    async fn update(&self, id: &Self::Id, input: &Self::Input) -> Result<Option<Self::Record>>;

    /// True when a record was removed.
    async fn delete(&self, id: &Self::Id) -> Result<bool>;

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Self::Record>>;
}
