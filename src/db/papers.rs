use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, PgDatabase, Repository, Result};
use crate::search::document::{Authors, PaperDocument};

const PAPER_COLUMNS: &str =
    "arxiv_id, title, authors, abstract, categories, published_date, pdf_url, created_at, updated_at";

/// A row of the `papers` table.
#[derive(Serialize, Deserialize, sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Paper {
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub r#abstract: String,
    pub categories: Vec<String>,
    pub published_date: Option<NaiveDate>,
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies when creating or replacing a paper.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NewPaper {
    pub arxiv_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub r#abstract: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub published_date: Option<NaiveDate>,
    #[serde(default)]
    pub pdf_url: Option<String>,
}

impl From<Paper> for PaperDocument {
    fn from(paper: Paper) -> Self {
        PaperDocument {
            arxiv_id: paper.arxiv_id,
            title: paper.title,
            authors: Authors::List(paper.authors),
            r#abstract: paper.r#abstract,
            categories: paper.categories,
            published_date: paper.published_date.map(|d| d.format("%Y-%m-%d").to_string()),
            pdf_url: paper.pdf_url,
            created_at: Some(paper.created_at),
            updated_at: Some(paper.updated_at),
        }
    }
}

pub struct PaperRepository<'a> {
    db: &'a PgDatabase,
}

impl<'a> PaperRepository<'a> {
    pub fn new(db: &'a PgDatabase) -> Self {
        Self { db }
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM papers")
            .fetch_one(self.db.pool()?)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl Repository for PaperRepository<'_> {
    type Id = str;
    type Record = Paper;
    type Input = NewPaper;

    async fn create(&self, input: &NewPaper) -> Result<Paper> {
        let mut session = self.db.session().await?;
        let sql = format!(
            "INSERT INTO papers (arxiv_id, title, authors, abstract, categories, published_date, pdf_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PAPER_COLUMNS}"
        );
        let paper: Paper = sqlx::query_as(&sql)
            .bind(&input.arxiv_id)
            .bind(&input.title)
            .bind(&input.authors)
            .bind(&input.r#abstract)
            .bind(&input.categories)
            .bind(input.published_date)
            .bind(&input.pdf_url)
            .fetch_one(&mut *session)
            .await?;
        session.commit().await?;

        tracing::debug!(arxiv_id = %paper.arxiv_id, "stored paper");
        Ok(paper)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Paper>> {
        let sql = format!("SELECT {PAPER_COLUMNS} FROM papers WHERE arxiv_id = $1");
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.db.pool()?)
            .await?)
    }

    async fn update(&self, id: &str, input: &NewPaper) -> Result<Option<Paper>> {
        let mut session = self.db.session().await?;
        let sql = format!(
            "UPDATE papers SET title = $2, authors = $3, abstract = $4, categories = $5, \
             published_date = $6, pdf_url = $7, updated_at = now() \
             WHERE arxiv_id = $1 RETURNING {PAPER_COLUMNS}"
        );
        let paper: Option<Paper> = sqlx::query_as(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(&input.authors)
            .bind(&input.r#abstract)
            .bind(&input.categories)
            .bind(input.published_date)
            .bind(&input.pdf_url)
            .fetch_optional(&mut *session)
            .await?;
        session.commit().await?;
        Ok(paper)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut session = self.db.session().await?;
        let deleted = sqlx::query("DELETE FROM papers WHERE arxiv_id = $1")
            .bind(id)
            .execute(&mut *session)
            .await?
            .rows_affected();
        session.commit().await?;
        Ok(deleted > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Paper>> {
        let sql = format!("SELECT {PAPER_COLUMNS} FROM papers ORDER BY arxiv_id LIMIT $1 OFFSET $2");
        Ok(sqlx::query_as(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool()?)
            .await?)
    }
}
