//! Supported source platforms and URL detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Video platforms the extraction backend understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    TikTok,
    Instagram,
    Twitter,
}

impl Platform {
    pub const ALL: &'static [Platform] = &[
        Platform::YouTube,
        Platform::TikTok,
        Platform::Instagram,
        Platform::Twitter,
    ];

    /// Path segment used by the extraction API (`/api/v1/{platform}/extract`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "youtube" => Ok(Platform::YouTube),
            "tiktok" => Ok(Platform::TikTok),
            "instagram" => Ok(Platform::Instagram),
            "twitter" | "x" => Ok(Platform::Twitter),
            _ => Err(PlatformParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown platform: {0}")]
pub struct PlatformParseError(String);

/// Detect the platform from a pasted URL.
///
/// Plain case-insensitive substring checks, evaluated in a fixed order.
pub fn detect_platform(url: &str) -> Option<Platform> {
    let url = url.to_lowercase();

    if url.contains("youtube.com") || url.contains("youtu.be") {
        return Some(Platform::YouTube);
    }
    if url.contains("tiktok.com") {
        return Some(Platform::TikTok);
    }
    if url.contains("instagram.com") {
        return Some(Platform::Instagram);
    }
    if url.contains("twitter.com") || url.contains("x.com") {
        return Some(Platform::Twitter);
    }

    None
}
