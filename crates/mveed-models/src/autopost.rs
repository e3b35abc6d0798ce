//! Auto-post scheduling schemas.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /api/v1/autopost/request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoPostRequest {
    pub session_id: String,

    /// Target networks (`tiktok`, `youtube`, ...)
    pub platforms: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reel_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// An auto-post job as listed by `GET /api/v1/autopost/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoPostJob {
    #[serde(default, alias = "job_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Feature availability from `GET /api/v1/autopost/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoPostStatus {
    #[serde(default)]
    pub enabled: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
