//! Typed schema for the embedded structured-data (JSON-LD) block.
//!
//! The block is parsed once into [`LdArticle`]; every polymorphic
//! field (image as string/object/list, author as object/list, …) is
//! an untagged enum with an explicit resolution policy, instead of
//! chained optional lookups at each access site.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::ArticleRecord;

/// Structured-data block of an article page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdArticle {
    headline: Option<String>,
    url: Option<String>,
    image: Option<ImageField>,
    author: Option<NamedField>,
    date_published: Option<String>,
    date_modified: Option<String>,
    publisher: Option<NamedField>,
    article_section: Option<StringList>,
    description: Option<String>,
    article_body: Option<String>,
    keywords: Option<StringList>,
    content_location: Option<NamedField>,
}

/// `image` may be a bare URL string, a single object, or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageField {
    Url(String),
    Object(ImageObject),
    Many(Vec<ImageEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageEntry {
    Url(String),
    Object(ImageObject),
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: Option<String>,
    name: Option<String>,
}

impl ImageField {
    /// Resolve to `(url, caption)`. For lists, the first entry with a
    /// usable URL wins.
    fn resolve(self) -> (Option<String>, Option<String>) {
        match self {
            ImageField::Url(url) => (Some(url), None),
            ImageField::Object(obj) => (obj.url, obj.name),
            ImageField::Many(entries) => {
                for entry in entries {
                    match entry {
                        ImageEntry::Url(url) => return (Some(url), None),
                        ImageEntry::Object(obj) if obj.url.is_some() => {
                            return (obj.url, obj.name);
                        }
                        ImageEntry::Object(_) => {}
                    }
                }
                (None, None)
            }
        }
    }
}

/// Person/organization fields: a name string, a `{name}` object, or
/// a list of either. Resolution takes the first available name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamedField {
    One(NamedEntry),
    Many(Vec<NamedEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamedEntry {
    Name(String),
    Object(NamedObject),
}

#[derive(Debug, Deserialize)]
struct NamedObject {
    name: Option<String>,
}

impl NamedField {
    fn first_name(self) -> Option<String> {
        let entries = match self {
            NamedField::One(entry) => vec![entry],
            NamedField::Many(entries) => entries,
        };
        entries.into_iter().find_map(|entry| match entry {
            NamedEntry::Name(name) => Some(name),
            NamedEntry::Object(obj) => obj.name,
        })
    }
}

/// Fields that appear either as a single string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    fn into_vec(self) -> Vec<String> {
        match self {
            StringList::One(value) => vec![value],
            StringList::Many(values) => values,
        }
    }
}

impl LdArticle {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Generic(format!("Malformed structured-data block: {e}")))
    }

    /// Map into an [`ArticleRecord`] skeleton. Absent source fields
    /// stay `None`; `canonical_url` falls back to the navigated URL
    /// when the block omits `url`.
    pub fn into_record(self, page_url: &str) -> ArticleRecord {
        let (image_url, image_caption) = match self.image {
            Some(image) => image.resolve(),
            None => (None, None),
        };

        ArticleRecord {
            headline: self.headline,
            canonical_url: self.url.unwrap_or_else(|| page_url.to_string()),
            image_url,
            image_caption,
            author: self.author.and_then(NamedField::first_name),
            date_published: self.date_published,
            date_modified: self.date_modified,
            publisher: self.publisher.and_then(NamedField::first_name),
            section_path: self
                .article_section
                .map(StringList::into_vec)
                .unwrap_or_default(),
            description: self.description,
            body: self.article_body,
            keywords: self
                .keywords
                .map(|k| k.into_vec().into_iter().collect::<BTreeSet<_>>())
                .unwrap_or_default(),
            content_location: self.content_location.and_then(NamedField::first_name),
            comments: Vec::new(),
            enrichment: Default::default(),
        }
    }
}

/// Parse a structured-data block straight into a record skeleton.
pub fn article_from_structured_data(raw: &str, page_url: &str) -> Result<ArticleRecord, AppError> {
    Ok(LdArticle::parse(raw)?.into_record(page_url))
}
