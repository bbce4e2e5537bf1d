use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

use crate::config::PostgresSettings;
use crate::db::{Database, DatabaseError, Result};

const CREATE_PAPERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS papers (
    arxiv_id       TEXT PRIMARY KEY,
    title          TEXT NOT NULL,
    authors        TEXT[] NOT NULL DEFAULT '{}',
    abstract       TEXT NOT NULL DEFAULT '',
    categories     TEXT[] NOT NULL DEFAULT '{}',
    published_date DATE,
    pdf_url        TEXT,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

pub struct PgDatabase {
    settings: PostgresSettings,
    pool: Option<PgPool>,
}

impl PgDatabase {
    pub fn new(settings: PostgresSettings) -> Self {
        Self {
            settings,
            pool: None,
        }
    }

    pub fn pool(&self) -> Result<&PgPool> {
        self.pool.as_ref().ok_or(DatabaseError::NotStarted)
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Session = Transaction<'static, Postgres>;

    async fn startup(&mut self) -> Result<()> {
        tracing::info!(pool_size = self.settings.pool_size, "connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(self.settings.pool_size)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&self.settings.database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        sqlx::query(CREATE_PAPERS_TABLE).execute(&pool).await?;

        tracing::info!("PostgreSQL ready");
        self.pool = Some(pool);
        Ok(())
    }

    async fn teardown(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            tracing::info!("PostgreSQL connections closed");
        }
    }

    async fn session(&self) -> Result<Self::Session> {
        Ok(self.pool()?.begin().await?)
    }
}
