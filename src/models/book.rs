//! Book record model and its JSON representation

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::FieldErrors;

/// A single catalog entry as exchanged with the library API.
///
/// `id` is absent until the server has persisted the record; `created_on`
/// is assigned by the server and never sent back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing, deserialize_with = "deserialize_timestamp")]
    pub created_on: Option<DateTime<Utc>>,
}

impl Book {
    /// New unsaved record
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            created_on: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Case-folded substring match on title or author; an empty query matches
    pub fn matches(&self, folded_query: &str) -> bool {
        folded_query.is_empty()
            || self.title.to_lowercase().contains(folded_query)
            || self.author.to_lowercase().contains(folded_query)
    }
}

/// Title/author pair as typed by the user, trimmed before validation
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct BookDraft {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
}

impl BookDraft {
    pub fn new(title: &str, author: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            author: author.trim().to_string(),
        }
    }

    /// Validate the trimmed fields, returning per-field messages on failure
    pub fn check(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }
}

impl From<&Book> for BookDraft {
    fn from(book: &Book) -> Self {
        BookDraft::new(&book.title, &book.author)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

/// Accepts RFC 3339, a zone-less ISO-8601 date-time (taken as UTC) or epoch
/// milliseconds.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawTimestamp> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawTimestamp::Millis(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", ms))),
        Some(RawTimestamp::Text(text)) => parse_timestamp(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", text))),
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
