//! Upload controller: validate a video, post it for analysis, track the lifecycle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mveed_models::{AnalyzeResponse, SessionStatus, UploadSession};
use reqwest::multipart::{Form, Part};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::mb_to_bytes;
use crate::error::{friendly_message, ClientError, ClientResult, Operation};
use crate::metrics;
use crate::telemetry::{ErrorReporter, HIGHLIGHT_FEATURE};
use crate::transport::{decode_json, read_error_payload, Transport};

pub const STATUS_UPLOADING: &str = "Uploading file…";
pub const STATUS_ANALYZING: &str = "Analyzing video…";
pub const STATUS_READY: &str = "Highlights ready — preview below";
pub const ALREADY_ANALYZING: &str = "A video is already being analyzed. Please wait for it to finish.";

/// Where the bytes of a [`VideoFile`] live.
#[derive(Debug, Clone)]
pub enum FileContent {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct VideoFile {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub content: FileContent,
}

impl VideoFile {
    /// Describe a file on disk, guessing its MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ClientError::validation("Please select a video file."),
            _ => ClientError::Io(e),
        })?;
        if !meta.is_file() {
            return Err(ClientError::validation("Please select a video file."));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            file_name,
            mime_type,
            size: meta.len(),
            content: FileContent::Path(path.to_path_buf()),
        })
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            content: FileContent::Memory(bytes),
        }
    }

    async fn read(&self) -> ClientResult<Vec<u8>> {
        match &self.content {
            FileContent::Path(path) => Ok(tokio::fs::read(path).await?),
            FileContent::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Local checks run before any request is made.
pub fn validate_video(file: &VideoFile, max_upload_mb: u64) -> ClientResult<()> {
    if !file.mime_type.starts_with("video/") {
        return Err(ClientError::validation(
            "Unsupported file type. Please upload an MP4 or MOV video file.",
        ));
    }
    if file.size > mb_to_bytes(max_upload_mb) {
        return Err(ClientError::validation(format!(
            "File exceeds {}MB limit. Please upload a smaller clip.",
            max_upload_mb
        )));
    }
    Ok(())
}

/// Observable state of the upload controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub status: SessionStatus,
    pub status_text: String,
    pub session: Option<UploadSession>,
    pub error: Option<String>,
}

pub struct UploadController {
    transport: Arc<Transport>,
    reporter: Arc<dyn ErrorReporter>,
    in_flight: AtomicBool,
    state: watch::Sender<UploadState>,
}

/// Clears the in-flight flag however the upload ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl UploadController {
    pub fn new(transport: Arc<Transport>, reporter: Arc<dyn ErrorReporter>) -> Self {
        let (state, _rx) = watch::channel(UploadState::default());
        Self {
            transport,
            reporter,
            in_flight: AtomicBool::new(false),
            state,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    /// True while a submitted file is uploading or being analyzed.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn session(&self) -> Option<UploadSession> {
        self.state.borrow().session.clone()
    }

    /// Overwrite the status line without touching anything else.
    pub fn set_status_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| s.status_text = text);
    }

    /// Validate and submit `file` for analysis.
    ///
    /// Validation failures set the error message and return without sending
    /// anything; the previous session is left in place. Accepted files replace
    /// the previous session wholesale. A submit while another is running is
    /// refused without touching state. No retry on failure.
    pub async fn submit(&self, file: &VideoFile) -> ClientResult<UploadSession> {
        let max_mb = self.transport.config().max_upload_mb;
        if let Err(e) = validate_video(file, max_mb) {
            metrics::record_rejection(Operation::Analyze.as_str());
            warn!(file = %file.file_name, mime = %file.mime_type, size = file.size, "Upload rejected: {}", e);
            let message = e.user_message(Operation::Analyze);
            self.state.send_modify(|s| s.error = Some(message));
            return Err(e);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(file = %file.file_name, "Upload skipped: analysis in flight");
            return Err(ClientError::validation(ALREADY_ANALYZING));
        }
        let _guard = InFlight(&self.in_flight);

        self.state.send_replace(UploadState {
            status: SessionStatus::Uploading,
            status_text: STATUS_UPLOADING.to_string(),
            session: None,
            error: None,
        });

        let span = info_span!("analyze_upload", file = %file.file_name, size = file.size);
        match self.analyze(file).instrument(span).await {
            Ok(session) => {
                info!(
                    session_id = %session.session_id,
                    segments = session.segments.len(),
                    "Analysis ready"
                );
                self.state.send_replace(UploadState {
                    status: SessionStatus::Ready,
                    status_text: STATUS_READY.to_string(),
                    session: Some(session.clone()),
                    error: None,
                });
                Ok(session)
            }
            Err(e) => {
                self.reporter.capture(HIGHLIGHT_FEATURE, Operation::Analyze, &e);
                let message = e.user_message(Operation::Analyze);
                self.state.send_replace(UploadState {
                    status: SessionStatus::Error,
                    status_text: String::new(),
                    session: None,
                    error: Some(message),
                });
                Err(e)
            }
        }
    }

    async fn analyze(&self, file: &VideoFile) -> ClientResult<UploadSession> {
        let bytes = file.read().await?;
        let part = Part::bytes(bytes)
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new().part("file", part);

        let url = self.transport.config().highlight_url("/analyze");
        let request = self
            .transport
            .authorize(self.transport.http().post(&url))
            .await
            .multipart(form);
        let response = self.transport.send(Operation::Analyze.as_str(), request).await?;

        // Cosmetic: the server sends no separate "analyzing" signal.
        self.state.send_modify(|s| {
            s.status = SessionStatus::Analyzing;
            s.status_text = STATUS_ANALYZING.to_string();
        });

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let payload = read_error_payload(response).await;
            let base = payload.message_with_tip("Failed to analyze video");
            let max_mb = self.transport.config().max_upload_mb;
            return Err(ClientError::server(
                status,
                friendly_message(&base, Some(status), max_mb),
            ));
        }

        let body: AnalyzeResponse = decode_json(response).await?;
        UploadSession::from_response(body).ok_or_else(|| {
            ClientError::invalid_response("The highlight engine did not return a session id.")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(mime: &str, size: usize) -> VideoFile {
        VideoFile::from_bytes("clip", mime, vec![0u8; size])
    }

    #[test]
    fn test_validate_rejects_non_video() {
        let err = validate_video(&file("image/png", 10), 300).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("Unsupported file type"));
    }

    #[test]
    fn test_validate_rejects_oversize() {
        let f = VideoFile {
            size: 2 * 1024 * 1024 + 1,
            ..file("video/mp4", 0)
        };
        let err = validate_video(&f, 2).unwrap_err();
        assert_eq!(err.to_string(), "File exceeds 2MB limit. Please upload a smaller clip.");
    }

    #[test]
    fn test_validate_huge_limit_does_not_overflow() {
        let f = VideoFile {
            size: u64::MAX,
            ..file("video/mp4", 0)
        };
        assert!(validate_video(&f, u64::MAX).is_ok());
        assert!(validate_video(&file("video/mp4", 10), u64::MAX / 2).is_ok());
    }

    #[test]
    fn test_validate_accepts_at_limit() {
        let f = VideoFile {
            size: 2 * 1024 * 1024,
            ..file("video/quicktime", 0)
        };
        assert!(validate_video(&f, 2).is_ok());
    }

    #[test]
    fn test_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.mp4");
        std::fs::write(&path, b"fake").unwrap();

        let f = VideoFile::from_path(&path).unwrap();
        assert_eq!(f.file_name, "match.mp4");
        assert_eq!(f.mime_type, "video/mp4");
        assert_eq!(f.size, 4);
    }

    #[tokio::test]
    async fn test_concurrent_submit_is_refused() {
        use crate::config::ClientConfig;
        use crate::storage::{LocalStore, TokenStore};
        use crate::telemetry::TracingReporter;
        use serde_json::json;
        use std::time::Duration;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/highlight/analyze"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(200))
                    .set_body_json(json!({"session_id": "abc", "segments": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            api_base_url: server.uri(),
            ..Default::default()
        };
        let tokens = TokenStore::new(LocalStore::new(dir.path().join("store.json")));
        let transport = Arc::new(Transport::new(config, tokens).unwrap());
        let controller = UploadController::new(transport, Arc::new(TracingReporter));

        let clip = file("video/mp4", 16);
        let (first, second) = tokio::join!(controller.submit(&clip), controller.submit(&clip));

        assert_eq!(first.unwrap().session_id, "abc");
        let err = second.unwrap_err();
        assert_eq!(err.to_string(), ALREADY_ANALYZING);
        assert_eq!(controller.status(), SessionStatus::Ready);
        assert!(controller.state().error.is_none());
        assert!(!controller.is_busy());
    }


    /// Base URL of a port nothing listens on.
    fn closed_base() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn controller(base: &str, dir: &std::path::Path) -> UploadController {
        use crate::config::ClientConfig;
        use crate::storage::{LocalStore, TokenStore};
        use crate::telemetry::TracingReporter;

        let config = ClientConfig {
            api_base_url: base.to_string(),
            ..Default::default()
        };
        let tokens = TokenStore::new(LocalStore::new(dir.join("store.json")));
        let transport = Arc::new(Transport::new(config, tokens).unwrap());
        UploadController::new(transport, Arc::new(TracingReporter))
    }

    #[tokio::test]
    async fn test_unreachable_engine() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&closed_base(), dir.path());

        let err = controller.submit(&file("video/mp4", 16)).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(controller.status(), SessionStatus::Error);
        assert_eq!(
            controller.state().error.as_deref(),
            Some("Unable to reach the highlight engine. Check your connection and try again.")
        );
        assert!(controller.session().is_none());
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&server.uri(), dir.path());
        let err = controller.submit(&file("video/mp4", 16)).await.unwrap_err();

        assert!(matches!(err, ClientError::InvalidResponse(_)));
        assert_eq!(controller.status(), SessionStatus::Error);
        assert!(controller.state().error.is_some());
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_null_segments_still_ready() {
        use serde_json::json;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"session_id": "abc", "segments": null})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&server.uri(), dir.path());
        let session = controller.submit(&file("video/mp4", 16)).await.unwrap();

        assert_eq!(session.session_id, "abc");
        assert!(session.segments.is_empty());
        assert_eq!(controller.status(), SessionStatus::Ready);
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = VideoFile::from_path("/definitely/not/here.mp4").unwrap_err();
        assert_eq!(err.to_string(), "Please select a video file.");
    }
}
