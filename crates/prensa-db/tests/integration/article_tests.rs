use prensa_core::models::{ArticleRecord, SentimentLabel, SentimentVerdict};
use prensa_core::traits::ArticleStore;
use prensa_db::ArticleRepository;

use crate::common::setup_test_db;

fn record(url: &str, headline: &str) -> ArticleRecord {
    ArticleRecord {
        headline: Some(headline.to_string()),
        canonical_url: url.to_string(),
        body: Some("Cuerpo.".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn upsert_stores_and_round_trips_the_document() {
    let (pool, _container) = setup_test_db().await;
    let repo = ArticleRepository::new(pool);

    let mut stored = record("https://www.diariodecadiz.es/cadiz/a.html", "Titular");
    stored.comments.push(prensa_core::models::CommentRecord {
        author: "Ana".into(),
        timestamp: "Hace 1 hora".into(),
        text: "Comentario".into(),
        sentiment: SentimentVerdict::Classified {
            label: SentimentLabel::Negative,
            confidence_percent: 88,
        },
    });

    repo.upsert("diariodecadiz", &stored).await.unwrap();

    let loaded = repo
        .get("diariodecadiz", "https://www.diariodecadiz.es/cadiz/a.html")
        .await
        .unwrap()
        .expect("Document should exist");

    assert_eq!(loaded, stored);
}

#[tokio::test]
async fn upsert_is_idempotent_per_site_and_url() {
    let (pool, _container) = setup_test_db().await;
    let repo = ArticleRepository::new(pool);

    let url = "https://www.diariodecadiz.es/cadiz/a.html";
    let first_id = repo.upsert("diariodecadiz", &record(url, "Primera versión")).await.unwrap();
    let second_id = repo.upsert("diariodecadiz", &record(url, "Versión corregida")).await.unwrap();

    assert_eq!(first_id, second_id);
    assert_eq!(repo.count_for_site("diariodecadiz").await.unwrap(), 1);

    let loaded = repo.get("diariodecadiz", url).await.unwrap().unwrap();
    assert_eq!(loaded.headline.as_deref(), Some("Versión corregida"));
}

#[tokio::test]
async fn same_url_under_different_sites_stays_separate() {
    let (pool, _container) = setup_test_db().await;
    let repo = ArticleRepository::new(pool);

    let url = "https://example.com/shared.html";
    repo.upsert("diariodecadiz", &record(url, "A")).await.unwrap();
    repo.upsert("europasur", &record(url, "B")).await.unwrap();

    assert_eq!(repo.count_for_site("diariodecadiz").await.unwrap(), 1);
    assert_eq!(repo.count_for_site("europasur").await.unwrap(), 1);
}

#[tokio::test]
async fn get_returns_none_for_unknown_documents() {
    let (pool, _container) = setup_test_db().await;
    let repo = ArticleRepository::new(pool);

    let loaded = repo
        .get("diariodecadiz", "https://www.diariodecadiz.es/nada.html")
        .await
        .unwrap();
    assert!(loaded.is_none());
}
