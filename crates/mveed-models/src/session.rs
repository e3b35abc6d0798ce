//! Highlight upload session models.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle of a highlight upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing submitted yet
    #[default]
    Idle,
    /// File is being sent to the analysis endpoint
    Uploading,
    /// Request is out, waiting on segment detection
    Analyzing,
    /// Segments received
    Ready,
    /// Last submission failed
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Uploading => "uploading",
            SessionStatus::Analyzing => "analyzing",
            SessionStatus::Ready => "ready",
            SessionStatus::Error => "error",
        }
    }

    /// Whether a request is currently outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SessionStatus::Uploading | SessionStatus::Analyzing)
    }

    /// Check if this is a terminal state for the current submission.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Ready | SessionStatus::Error)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A time range the analysis backend proposes for the reel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Server-assigned identifier
    pub segment_id: String,

    /// Start offset in seconds
    #[serde(default)]
    pub start: f64,

    /// End offset in seconds
    #[serde(default)]
    pub end: f64,

    /// Detection confidence (0.0 - 1.0)
    #[serde(default)]
    pub confidence: f64,

    /// Preview clip location (relative or absolute)
    #[serde(default)]
    pub clip_url: String,

    /// Explicit duration, when the backend sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Segment {
    pub fn new(segment_id: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            segment_id: segment_id.into(),
            start,
            end,
            confidence: 0.0,
            clip_url: String::new(),
            duration: None,
        }
    }

    /// Duration in seconds, preferring the server value over `end - start`.
    pub fn duration_secs(&self) -> f64 {
        match self.duration {
            Some(d) if d.is_finite() => d,
            _ => {
                let fallback = self.end - self.start;
                if fallback.is_finite() {
                    fallback
                } else {
                    0.0
                }
            }
        }
    }
}

/// Body of a successful `POST /analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub session_id: Option<String>,

    /// `null`, a non-array, or entries without an id are tolerated.
    #[serde(default, deserialize_with = "lenient_segments")]
    pub segments: Vec<Segment>,
}

fn lenient_segments<'de, D>(deserializer: D) -> Result<Vec<Segment>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// The current tab's view of an analyzed upload.
///
/// Replaced wholesale on each new upload; nothing survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub session_id: String,
    pub segments: Vec<Segment>,
    pub status: SessionStatus,
}

impl UploadSession {
    /// Build a ready session from an analyze response.
    ///
    /// Returns `None` when the backend omitted the session id.
    pub fn from_response(response: AnalyzeResponse) -> Option<Self> {
        let session_id = response.session_id.filter(|id| !id.is_empty())?;
        Some(Self {
            session_id,
            segments: response.segments,
            status: SessionStatus::Ready,
        })
    }

    pub fn segment_ids(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.segment_id.clone()).collect()
    }

    pub fn segment(&self, segment_id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.segment_id == segment_id)
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.segments.iter().map(Segment::duration_secs).sum()
    }

    pub fn average_duration_secs(&self) -> f64 {
        if self.segments.is_empty() {
            return 0.0;
        }
        self.total_duration_secs() / self.segments.len() as f64
    }

    pub fn average_confidence(&self) -> f64 {
        if self.segments.is_empty() {
            return 0.0;
        }
        self.segments.iter().map(|s| s.confidence).sum::<f64>() / self.segments.len() as f64
    }
}
