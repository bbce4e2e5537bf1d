//! PostgreSQL repository tests. Need a live database:
//!     POSTGRES_URI=postgres://... cargo test -- --ignored

use arxiv_search::config::PostgresSettings;
use arxiv_search::db::{Database, NewPaper, PaperRepository, PgDatabase, Repository};
use arxiv_search::search::PaperDocument;
use chrono::NaiveDate;
use dotenvy::dotenv;
use std::env;

async fn database() -> PgDatabase {
    dotenv().ok();
    let database_url = env::var("POSTGRES_URI").expect("POSTGRES_URI must be set");
    let mut db = PgDatabase::new(PostgresSettings {
        database_url,
        pool_size: 2,
    });
    db.startup().await.expect("Failed to connect to database");
    db
}

fn new_paper(arxiv_id: &str) -> NewPaper {
    NewPaper {
        arxiv_id: arxiv_id.to_string(),
        title: "Graph Nets".to_string(),
        authors: vec!["A Doe".to_string()],
        r#abstract: "Message passing.".to_string(),
        categories: vec!["cs.AI".to_string()],
        published_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        pdf_url: Some("http://x/1.pdf".to_string()),
    }
}

#[tokio::test]
#[ignore]
async fn paper_crud_round_trip() {
    let db = database().await;
    let repo = PaperRepository::new(&db);
    let arxiv_id = format!("test.{}", uuid::Uuid::new_v4().simple());

    let created = repo.create(&new_paper(&arxiv_id)).await.unwrap();
    assert_eq!(created.arxiv_id, arxiv_id);

    let fetched = repo.get_by_id(&arxiv_id).await.unwrap().expect("paper stored");
    assert_eq!(fetched.title, "Graph Nets");

    let mut changed = new_paper(&arxiv_id);
    changed.title = "Graph Networks".to_string();
    let updated = repo.update(&arxiv_id, &changed).await.unwrap().expect("paper updated");
    assert_eq!(updated.title, "Graph Networks");
    assert!(updated.updated_at >= created.updated_at);

    let doc = PaperDocument::from(updated);
    assert_eq!(doc.published_date.as_deref(), Some("2024-01-01"));

    assert!(repo.delete(&arxiv_id).await.unwrap());
    assert!(!repo.delete(&arxiv_id).await.unwrap());
    assert!(repo.get_by_id(&arxiv_id).await.unwrap().is_none());

    db.teardown().await;
}

#[tokio::test]
#[ignore]
async fn update_of_unknown_paper_is_none() {
    let db = database().await;
    let repo = PaperRepository::new(&db);
    let missing = repo.update("does-not-exist", &new_paper("does-not-exist")).await.unwrap();
    assert!(missing.is_none());
    assert!(repo.list(10, 0).await.unwrap().len() <= 10);
    db.teardown().await;
}

#[tokio::test]
async fn repository_requires_startup() {
    let db = PgDatabase::new(PostgresSettings {
        database_url: "postgres://localhost/unused".to_string(),
        pool_size: 1,
    });
    let repo = PaperRepository::new(&db);
    assert!(matches!(
        repo.list(1, 0).await,
        Err(arxiv_search::db::DatabaseError::NotStarted)
    ));
}
