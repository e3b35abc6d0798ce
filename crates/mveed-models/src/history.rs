//! Recent highlight session listing (`GET /sessions`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status value the backend uses once a reel exists.
pub const REEL_READY: &str = "reel_ready";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestInfo {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub download_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionDiagnostics {
    #[serde(default)]
    pub fallback_segment: bool,
    #[serde(default)]
    pub advanced_timeout: bool,
    #[serde(default)]
    pub advanced_segmentation_ms: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleInfo {
    #[serde(default)]
    pub label: Option<String>,
}

/// Problems flagged by the analysis backend for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlag {
    /// Segmentation fell back to the simple detector
    Fallback,
    /// Advanced segmentation timed out
    SegmentationTimeout,
}

impl SessionFlag {
    pub fn label(&self) -> &'static str {
        match self {
            SessionFlag::Fallback => "Fallback",
            SessionFlag::SegmentationTimeout => "Seg timeout",
        }
    }
}

/// One row of the recent sessions listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub ingest: Option<IngestInfo>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub segment_count: Option<u32>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub video_duration: Option<f64>,
    #[serde(default)]
    pub reel_duration: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub processing_time_ms: Option<f64>,
    #[serde(default)]
    pub reel_latency_ms: Option<f64>,
    #[serde(default)]
    pub style: Option<StyleInfo>,
    #[serde(default)]
    pub diagnostics: Option<SessionDiagnostics>,
    /// Unix seconds
    #[serde(default)]
    pub created_at: Option<f64>,
}

impl SessionSummary {
    pub fn user_label(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.email.as_deref().or(u.id.as_deref()))
            .unwrap_or("—")
    }

    /// `UPLOAD • direct`, `URL • YOUTUBE`, ...
    pub fn source_label(&self) -> String {
        let ingest = self.ingest.as_ref();
        let source = ingest
            .and_then(|i| i.source.as_deref())
            .or(self.source.as_deref())
            .unwrap_or("upload")
            .to_uppercase();
        let platform = ingest
            .and_then(|i| i.platform.as_deref())
            .map(str::to_uppercase)
            .unwrap_or_else(|| "direct".to_string());
        format!("{} • {}", source, platform)
    }

    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("pending")
    }

    pub fn is_reel_ready(&self) -> bool {
        self.status.as_deref() == Some(REEL_READY)
    }

    pub fn flags(&self) -> Vec<SessionFlag> {
        let mut flags = Vec::new();
        if let Some(diag) = &self.diagnostics {
            if diag.fallback_segment {
                flags.push(SessionFlag::Fallback);
            }
            if diag.advanced_timeout {
                flags.push(SessionFlag::SegmentationTimeout);
            }
        }
        flags
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.created_at?;
        DateTime::from_timestamp_millis((secs * 1000.0) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sparse_row() {
        let row: SessionSummary = serde_json::from_str(r#"{"session_id":"s-1"}"#).unwrap();
        assert_eq!(row.user_label(), "—");
        assert_eq!(row.source_label(), "UPLOAD • direct");
        assert_eq!(row.status_label(), "pending");
        assert!(row.flags().is_empty());
        assert!(row.created_at_utc().is_none());
    }

    #[test]
    fn test_parse_full_row() {
        let json = r#"{
            "session_id": "s-2",
            "user": {"id": "u1", "email": "a@b.co"},
            "ingest": {"source": "url", "platform": "youtube", "download_ms": 1200},
            "segment_count": 6,
            "status": "reel_ready",
            "diagnostics": {"fallback_segment": true, "advanced_timeout": true},
            "created_at": 1700000000
        }"#;
        let row: SessionSummary = serde_json::from_str(json).unwrap();
        assert_eq!(row.user_label(), "a@b.co");
        assert_eq!(row.source_label(), "URL • YOUTUBE");
        assert!(row.is_reel_ready());
        assert_eq!(
            row.flags(),
            vec![SessionFlag::Fallback, SessionFlag::SegmentationTimeout]
        );
        assert_eq!(row.created_at_utc().unwrap().timestamp(), 1_700_000_000);
    }
}
