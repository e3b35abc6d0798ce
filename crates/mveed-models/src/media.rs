//! Extracted video metadata and media download models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::platform::Platform;

/// What to pull from a proxy URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    /// File extension of the saved asset.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    /// `{title}.{ext}`, falling back to `video` for an empty title.
    pub fn file_name(&self, title: &str) -> String {
        let title = title.trim();
        let stem = if title.is_empty() { "video" } else { title };
        format!("{}.{}", stem, self.extension())
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reasons an extraction payload could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractShapeError {
    #[error("Invalid response structure from server")]
    InvalidStructure,

    #[error("Server did not return a valid download URL.")]
    MissingProxyUrl,
}

/// Normalized metadata for a video ready to download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub platform: Platform,
    pub title: String,
    pub author: String,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub description: Option<String>,
    /// Backend proxy the client downloads through
    pub proxy_url: String,
    pub video_url: Option<String>,
}

/// Non-blank string field. Other JSON types read as absent.
fn text(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Positive numeric field. Strings such as "12K" or "3:45" read as absent.
fn positive(data: &Value, key: &str) -> Option<f64> {
    data.get(key).and_then(Value::as_f64).filter(|n| *n > 0.0)
}

fn count(data: &Value, key: &str) -> Option<u64> {
    let value = data.get(key)?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|n| n.is_finite() && *n >= 0.0).map(|n| n as u64))
        .filter(|n| *n > 0)
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(_) => true,
    }
}

impl VideoMetadata {
    /// Normalize an extraction response.
    ///
    /// Two envelopes are accepted: `{ success: true, data: {...} }` and a bare
    /// object carrying `platform`. `detected` fills in a missing platform.
    pub fn from_payload(payload: &Value, detected: Platform) -> Result<Self, ExtractShapeError> {
        let video_value = if is_truthy(payload.get("success")) && is_truthy(payload.get("data")) {
            &payload["data"]
        } else if is_truthy(payload.get("platform")) {
            payload
        } else {
            return Err(ExtractShapeError::InvalidStructure);
        };

        if !video_value.is_object() {
            return Err(ExtractShapeError::InvalidStructure);
        }
        let data = video_value;

        let proxy_url = text(data, "proxy_url").ok_or(ExtractShapeError::MissingProxyUrl)?;
        let platform = data
            .get("platform")
            .and_then(Value::as_str)
            .and_then(|p| p.parse().ok())
            .unwrap_or(detected);

        Ok(Self {
            platform,
            title: text(data, "title").unwrap_or_else(|| "Untitled Video".to_string()),
            author: text(data, "author")
                .or_else(|| text(data, "uploader"))
                .unwrap_or_else(|| "Unknown".to_string()),
            thumbnail: text(data, "thumbnail"),
            duration: positive(data, "duration"),
            views: count(data, "views"),
            likes: count(data, "likes"),
            description: text(data, "description"),
            proxy_url,
            video_url: text(data, "video_url"),
        })
    }

    /// Thumbnail resolved against the backend root.
    pub fn thumbnail_url(&self, backend_root: &str) -> Option<String> {
        let thumb = self.thumbnail.as_deref()?;
        if thumb.starts_with("http") {
            return Some(thumb.to_string());
        }
        let root = backend_root.trim_end_matches('/');
        if thumb.starts_with('/') {
            Some(format!("{}{}", root, thumb))
        } else {
            Some(format!("{}/{}", root, thumb))
        }
    }
}

/// Record of the most recent completed download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastDownload {
    pub title: String,
    pub platform: Option<Platform>,
    pub original_url: Option<String>,
    pub download_url: String,
    pub kind: MediaKind,
    /// Unix milliseconds
    pub completed_at: i64,
}

impl LastDownload {
    pub fn completed_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.completed_at)
    }
}
