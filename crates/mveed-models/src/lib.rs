//! Shared data models for the MediaVeed client.
//!
//! This crate provides Serde-serializable types for:
//! - Highlight upload sessions and detected segments
//! - Reel compilation requests and results
//! - Platform detection and extracted video metadata
//! - Backend error payloads
//! - Account, profile and auto-post schemas

pub mod account;
pub mod autopost;
pub mod error_body;
pub mod format;
pub mod history;
pub mod media;
pub mod platform;
pub mod reel;
pub mod session;

// Re-export common types
pub use account::{AuthResponse, LoginRequest, Profile, SignupRequest};
pub use autopost::{AutoPostJob, AutoPostRequest, AutoPostStatus};
pub use error_body::ErrorPayload;
pub use history::{SessionFlag, SessionSummary};
pub use media::{ExtractShapeError, LastDownload, MediaKind, VideoMetadata};
pub use platform::{detect_platform, Platform, PlatformParseError};
pub use reel::{CompileParams, CompileRequest, ReelResult, ReelStyle, StyleParseError};
pub use session::{AnalyzeResponse, Segment, SessionStatus, UploadSession};
