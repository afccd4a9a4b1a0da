use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp::{format_rating, format_watched_date, from_unix_seconds};

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerIdentity {
    pub machine_identifier: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl ServerIdentity {
    pub fn display_name(&self) -> &str {
        self.friendly_name
            .as_deref()
            .unwrap_or(self.machine_identifier.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionsPayload {
    #[serde(rename = "Directory", default)]
    pub directories: Vec<SectionDirectory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionDirectory {
    pub key: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<MetadataItem>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItem {
    pub rating_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub user_rating: Option<f64>,
    #[serde(default)]
    pub last_viewed_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountInfo {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUser {
    pub id: i64,
    pub title: String,
    pub username: String,
    pub email: String,
}

impl AccountUser {
    pub fn matches(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        [&self.title, &self.username, &self.email]
            .iter()
            .any(|candidate| !candidate.is_empty() && candidate.to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedServer {
    pub user_id: i64,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieMetadata {
    pub title: String,
    pub year: Option<i32>,
    pub user_rating: Option<f64>,
    pub last_viewed_at: Option<DateTime<Utc>>,
}

impl From<MetadataItem> for MovieMetadata {
    fn from(item: MetadataItem) -> Self {
        Self {
            title: item.title,
            year: item.year,
            user_rating: item.user_rating,
            last_viewed_at: item.last_viewed_at.and_then(from_unix_seconds),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: Option<i32>,
    #[serde(rename = "Rating10")]
    pub rating: Option<String>,
    #[serde(rename = "WatchedDate")]
    pub watched_date: Option<String>,
}

impl MovieRecord {
    pub fn from_metadata<Tz>(metadata: &MovieMetadata, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            title: metadata.title.clone(),
            year: metadata.year,
            rating: metadata.user_rating.map(format_rating),
            watched_date: metadata
                .last_viewed_at
                .as_ref()
                .map(|viewed_at| format_watched_date(viewed_at, tz)),
        }
    }
}
