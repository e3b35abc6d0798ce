//! Reel compilation models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default target reel length in seconds.
pub const DEFAULT_TARGET_DURATION: u32 = 60;

/// Default cap on stitched segments.
pub const DEFAULT_MAX_SEGMENTS: u32 = 8;

/// Ordering strategy the compile backend uses when stitching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReelStyle {
    /// Variety plus an energy curve
    #[default]
    Variety,
    /// Chronological story flow
    Story,
}

impl ReelStyle {
    pub const ALL: &'static [ReelStyle] = &[ReelStyle::Variety, ReelStyle::Story];

    /// Value sent in the `style` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReelStyle::Variety => "variety",
            ReelStyle::Story => "story",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ReelStyle::Variety => "Variety + Energy Curve",
            ReelStyle::Story => "Story Flow",
        }
    }
}

impl fmt::Display for ReelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReelStyle {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "variety" => Ok(ReelStyle::Variety),
            "story" => Ok(ReelStyle::Story),
            _ => Err(StyleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown reel style: {0}")]
pub struct StyleParseError(String);

/// Query parameters of `POST /reel/{session_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileParams {
    pub target_duration: u32,
    pub max_segments: u32,
    pub style: ReelStyle,
}

impl Default for CompileParams {
    fn default() -> Self {
        Self {
            target_duration: DEFAULT_TARGET_DURATION,
            max_segments: DEFAULT_MAX_SEGMENTS,
            style: ReelStyle::default(),
        }
    }
}

impl CompileParams {
    pub fn with_style(style: ReelStyle) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }
}

/// JSON body of `POST /reel/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub selected_ids: Vec<String>,
}

/// Output locations of a compiled reel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelResult {
    /// Stitched MP4
    pub download_url: String,

    /// SRT captions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captions_url: Option<String>,

    /// JSON timeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_url: Option<String>,
}

impl ReelResult {
    /// Rewrite every URL through `f`, dropping optional ones that become empty.
    pub fn map_urls(&self, f: impl Fn(&str) -> String) -> Self {
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(|url| f(url))
                .filter(|url| !url.is_empty())
        };
        Self {
            download_url: f(&self.download_url),
            captions_url: optional(&self.captions_url),
            timeline_url: optional(&self.timeline_url),
        }
    }
}
