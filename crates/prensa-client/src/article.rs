use prensa_core::error::AppError;
use prensa_core::models::{ArticleRecord, ArticleStub, RawComment, SessionExtract};
use prensa_core::structured::article_from_structured_data;
use prensa_core::traits::ArticleSource;
use scraper::{Html, Selector};

use crate::browser::BrowserEngine;

fn selector(css: &str) -> Selector {
    // All inputs are compile-time literals.
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css}: {e}"))
}

/// Parse a rendered article page into a record plus its raw comments.
///
/// The record comes from the first `application/ld+json` block. When
/// the block is missing or unparseable the page still yields a record
/// carrying only the navigated URL, flagged `structured_data_missing`,
/// so the pipeline can emit a partial document instead of dropping
/// the article.
pub fn parse_article_page(html: &str, page_url: &str) -> SessionExtract {
    let ld_sel = selector(r#"script[type="application/ld+json"]"#);
    let document = Html::parse_document(html);

    let (record, structured_data_missing) = match document.select(&ld_sel).next() {
        Some(script) => {
            let raw = script.text().collect::<String>();
            match article_from_structured_data(&raw, page_url) {
                Ok(record) => (record, false),
                Err(e) => {
                    tracing::warn!(url = %page_url, error = %e, "Unparseable structured-data block");
                    (placeholder_record(page_url), true)
                }
            }
        }
        None => {
            tracing::debug!(url = %page_url, "No structured-data block");
            (placeholder_record(page_url), true)
        }
    };

    SessionExtract {
        record,
        comments: parse_comments(&document, page_url),
        structured_data_missing,
    }
}

fn placeholder_record(page_url: &str) -> ArticleRecord {
    ArticleRecord {
        canonical_url: page_url.to_string(),
        ..Default::default()
    }
}

/// Comments are `.comment` elements with name/date/text children. A
/// comment missing one of the three is skipped; the rest survive.
fn parse_comments(document: &Html, page_url: &str) -> Vec<RawComment> {
    let comment_sel = selector(".comment");
    let name_sel = selector(".comment-info-name");
    let date_sel = selector(".comment-info-date");
    let text_sel = selector(".comment-info-text");

    let mut comments = Vec::new();
    for element in document.select(&comment_sel) {
        let field = |sel: &Selector| {
            element
                .select(sel)
                .next()
                .map(|e| e.text().collect::<String>().trim().to_string())
        };

        match (field(&name_sel), field(&date_sel), field(&text_sel)) {
            (Some(author), Some(timestamp), Some(text)) => {
                comments.push(RawComment {
                    author,
                    timestamp,
                    text,
                });
            }
            _ => {
                tracing::warn!(url = %page_url, "Comment missing a sub-field; skipping");
            }
        }
    }
    comments
}

/// Browser-backed article source: one exclusively-owned page per
/// stub, rendered by the shared engine, then parsed offline.
#[derive(Clone)]
pub struct BrowserArticleSource {
    engine: BrowserEngine,
}

impl BrowserArticleSource {
    pub fn new(engine: BrowserEngine) -> Self {
        Self { engine }
    }
}

impl ArticleSource for BrowserArticleSource {
    async fn extract(&self, stub: &ArticleStub) -> Result<SessionExtract, AppError> {
        let html = self.engine.render_article(&stub.url).await?;
        Ok(parse_article_page(&html, &stub.url))
    }
}
