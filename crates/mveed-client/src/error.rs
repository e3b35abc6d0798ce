//! Client error types and user-facing message mapping.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Fallback when neither the server nor the transport gave anything useful.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Which user action a request belongs to. Drives wording of network errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Analyze,
    CompileReel,
    DownloadAsset,
    Extract,
    DownloadMedia,
    ListSessions,
    Account,
    AutoPost,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Analyze => "analyze_upload",
            Operation::CompileReel => "create_reel",
            Operation::DownloadAsset => "download_asset",
            Operation::Extract => "extract",
            Operation::DownloadMedia => "download_media",
            Operation::ListSessions => "list_sessions",
            Operation::Account => "account",
            Operation::AutoPost => "autopost",
        }
    }

    fn unreachable_message(&self) -> &'static str {
        match self {
            Operation::Analyze => {
                "Unable to reach the highlight engine. Check your connection and try again."
            }
            Operation::CompileReel => {
                "Unable to reach the highlight engine. Please try again shortly."
            }
            Operation::DownloadAsset => {
                "Download failed because the server could not be reached. Please try again."
            }
            Operation::Extract => "Network error. Please check your connection and try again.",
            Operation::DownloadMedia => {
                "Connection error. Please check your internet and try again."
            }
            Operation::ListSessions => "Unable to load recent highlights",
            Operation::Account | Operation::AutoPost => "Unable to complete request.",
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// Request never got a response.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response; `message` is already user-facing.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// 2xx response with a body we could not use.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// True if the error was raised before touching the network.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Single string shown to the user for this failure.
    pub fn user_message(&self, operation: Operation) -> String {
        match self {
            ClientError::Validation(msg) | ClientError::Server { message: msg, .. } => msg.clone(),
            ClientError::Network(e) if operation == Operation::DownloadMedia && e.is_timeout() => {
                "Download timed out. The video might be too large. Try again.".to_string()
            }
            ClientError::Network(_) => operation.unreachable_message().to_string(),
            ClientError::InvalidResponse(msg) => msg.clone(),
            ClientError::Io(e) => format!("Could not save the file: {}", e),
            ClientError::Json(_) => GENERIC_MESSAGE.to_string(),
        }
    }
}

/// Map a highlight backend failure to one of the fixed friendly messages.
///
/// Status codes win over message sniffing; unmatched failures keep the server
/// message, or the generic text when there is none.
pub fn friendly_message(message: &str, status: Option<u16>, max_upload_mb: u64) -> String {
    let normalized = message.to_lowercase();

    if status == Some(413) || normalized.contains("too large") {
        return format!(
            "That file exceeds the {}MB limit. Trim your clip and try again.",
            max_upload_mb
        );
    }
    if status == Some(422) || normalized.contains("too long") {
        return "This clip is longer than our current limit. Please trim the video and retry."
            .to_string();
    }
    if status == Some(404) || normalized.contains("not found") {
        return "We could not find that highlight session. Please re-upload your video."
            .to_string();
    }
    if status == Some(500)
        || normalized.contains("analysis failed")
        || normalized.contains("failed to create highlight")
    {
        return "We hit a processing snag. Please retry with a different clip or try again in a few minutes."
            .to_string();
    }
    if normalized.contains("invalid api key") {
        return "Your session expired. Refresh and sign back in to continue.".to_string();
    }

    if message.is_empty() {
        GENERIC_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

/// Trim a message to 150 characters, marking the cut with `...`.
pub fn cap_message(message: &str) -> String {
    const MAX: usize = 150;
    if message.chars().count() <= MAX {
        return message.to_string();
    }
    let head: String = message.chars().take(MAX - 3).collect();
    format!("{}...", head)
}
