//! Highlight engine: upload, select, compile and download in one place.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use mveed_models::{
    CompileParams, ReelResult, ReelStyle, Segment, SessionStatus, SessionSummary, UploadSession,
};
use tracing::{info, warn};

use crate::download::{AssetDownloader, SaveTarget, SavedAsset};
use crate::error::{ClientError, ClientResult, Operation};
use crate::history;
use crate::reel::ReelCompiler;
use crate::selection::SegmentSelector;
use crate::storage::LAST_DOWNLOAD_KEY;
use crate::telemetry::ErrorReporter;
use crate::transport::Transport;
use crate::upload::{validate_video, UploadController, UploadState, VideoFile};

pub const STATUS_FETCHING: &str = "Fetching downloaded video…";
pub const STATUS_AUTO_FAILED: &str = "Automatic processing failed. Please upload manually.";

/// Downloadable outputs of a compiled reel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReelAsset {
    Video,
    Captions,
    Timeline,
}

impl ReelAsset {
    pub fn file_name(&self) -> &'static str {
        match self {
            ReelAsset::Video => "highlight_reel.mp4",
            ReelAsset::Captions => "captions.srt",
            ReelAsset::Timeline => "timeline.json",
        }
    }

    fn url<'a>(&self, reel: &'a ReelResult) -> Option<&'a str> {
        match self {
            ReelAsset::Video => Some(reel.download_url.as_str()),
            ReelAsset::Captions => reel.captions_url.as_deref(),
            ReelAsset::Timeline => reel.timeline_url.as_deref(),
        }
        .filter(|u| !u.is_empty())
    }
}

/// `{title}.mp4` with non-word runs collapsed to `_`, or a timestamped name.
pub fn remote_file_name(title: Option<&str>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => {
            let mut out = String::with_capacity(title.len());
            let mut in_run = false;
            for c in title.chars() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    out.push(c);
                    in_run = false;
                } else if !in_run {
                    out.push('_');
                    in_run = true;
                }
            }
            format!("{}.mp4", out)
        }
        None => format!("mediaveed_{}.mp4", Utc::now().timestamp_millis()),
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct HighlightEngine {
    transport: Arc<Transport>,
    upload: UploadController,
    compiler: ReelCompiler,
    downloader: AssetDownloader,
    selection: Mutex<SegmentSelector>,
    style: Mutex<ReelStyle>,
    download_error: Mutex<Option<String>>,
}

impl HighlightEngine {
    pub fn new(
        transport: Arc<Transport>,
        reporter: Arc<dyn ErrorReporter>,
        target: Arc<dyn SaveTarget>,
    ) -> Self {
        Self {
            upload: UploadController::new(transport.clone(), reporter.clone()),
            compiler: ReelCompiler::new(transport.clone(), reporter.clone()),
            downloader: AssetDownloader::new(transport.clone(), reporter, target),
            transport,
            selection: Mutex::new(SegmentSelector::new()),
            style: Mutex::new(ReelStyle::default()),
            download_error: Mutex::new(None),
        }
    }

    pub fn upload(&self) -> &UploadController {
        &self.upload
    }

    pub fn compiler(&self) -> &ReelCompiler {
        &self.compiler
    }

    // ----- analysis -----

    /// Validate and analyze `file`; on success every segment is selected.
    ///
    /// A rejected file, or a submit while another analysis runs, leaves the
    /// previous session, selection and reel alone.
    pub async fn submit(&self, file: &VideoFile) -> ClientResult<UploadSession> {
        let accepted = !self.upload.is_busy()
            && validate_video(file, self.transport.config().max_upload_mb).is_ok();
        if accepted {
            self.compiler.reset();
            lock(&self.selection).clear();
            *lock(&self.download_error) = None;
        }

        let result = self.upload.submit(file).await;
        match &result {
            Ok(session) => lock(&self.selection).select_all(session),
            Err(e) if !e.is_validation() => lock(&self.selection).clear(),
            Err(_) => {}
        }
        result
    }

    /// Fetch a previously downloaded video and analyze it.
    pub async fn analyze_remote(&self, url: &str, title: Option<&str>) -> ClientResult<UploadSession> {
        self.upload.set_status_text(STATUS_FETCHING);
        let file = match self.fetch_remote(url, title).await {
            Ok(file) => file,
            Err(e) => {
                warn!(url, "Automatic processing failed: {}", e);
                self.upload.set_status_text(STATUS_AUTO_FAILED);
                return Err(e);
            }
        };

        let result = self.submit(&file).await;
        if result.is_err() {
            self.upload.set_status_text(STATUS_AUTO_FAILED);
        }
        result
    }

    async fn fetch_remote(&self, url: &str, title: Option<&str>) -> ClientResult<VideoFile> {
        let response = self
            .transport
            .send(Operation::DownloadMedia.as_str(), self.transport.http().get(url))
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::server(
                response.status().as_u16(),
                "Unable to fetch downloaded video",
            ));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or("video/mp4")
            .to_string();
        let bytes = response.bytes().await?;
        Ok(VideoFile::from_bytes(remote_file_name(title), mime, bytes.to_vec()))
    }

    /// Analyze the last completed media download, consuming the record.
    ///
    /// Returns `Ok(None)` when nothing is remembered.
    pub async fn analyze_last_download(&self) -> ClientResult<Option<UploadSession>> {
        let store = self.transport.tokens().store();
        let record: Option<mveed_models::LastDownload> =
            store.get_json_async(LAST_DOWNLOAD_KEY).await?;
        let Some(record) = record else {
            return Ok(None);
        };
        store.remove_async(LAST_DOWNLOAD_KEY).await?;

        info!(title = %record.title, "Analyzing last download");
        let title = Some(record.title.as_str()).filter(|t| !t.is_empty());
        self.analyze_remote(&record.download_url, title).await.map(Some)
    }

    pub fn state(&self) -> UploadState {
        self.upload.state()
    }

    pub fn status(&self) -> SessionStatus {
        self.upload.status()
    }

    pub fn status_text(&self) -> String {
        self.upload.state().status_text
    }

    pub fn error(&self) -> Option<String> {
        self.upload.state().error
    }

    pub fn session_id(&self) -> Option<String> {
        self.upload.session().map(|s| s.session_id)
    }

    /// Segments with clip URLs resolved against the API base.
    pub fn normalized_segments(&self) -> Vec<Segment> {
        let config = self.transport.config();
        self.upload
            .session()
            .map(|s| s.segments)
            .unwrap_or_default()
            .into_iter()
            .map(|mut seg| {
                seg.clip_url = config.build_api_url(&seg.clip_url);
                seg
            })
            .collect()
    }

    pub fn total_segments(&self) -> usize {
        self.upload.session().map_or(0, |s| s.segments.len())
    }

    // ----- selection -----

    pub fn toggle(&self, segment_id: &str) -> bool {
        lock(&self.selection).toggle(segment_id)
    }

    pub fn is_selected(&self, segment_id: &str) -> bool {
        lock(&self.selection).contains(segment_id)
    }

    pub fn selected_ids(&self) -> Vec<String> {
        lock(&self.selection).ids().to_vec()
    }

    pub fn selected_count(&self) -> usize {
        lock(&self.selection).len()
    }

    /// True when the session is ready and at least one segment is picked.
    pub fn can_compile(&self) -> bool {
        let session_id = self.ready_session_id();
        lock(&self.selection).can_compile(session_id.as_deref())
    }

    fn ready_session_id(&self) -> Option<String> {
        if self.status() == SessionStatus::Ready {
            self.session_id()
        } else {
            None
        }
    }

    // ----- reel -----

    pub fn style(&self) -> ReelStyle {
        *lock(&self.style)
    }

    pub fn set_style(&self, style: ReelStyle) {
        *lock(&self.style) = style;
    }

    /// Compile the current selection. `Ok(None)` means nothing was sent.
    pub async fn compile(&self) -> ClientResult<Option<ReelResult>> {
        let session_id = self.ready_session_id();
        let selected = self.selected_ids();
        if session_id.is_some() && !selected.is_empty() {
            *lock(&self.download_error) = None;
        }

        let params = CompileParams::with_style(self.style());
        let reel = self
            .compiler
            .compile(session_id.as_deref(), &selected, params)
            .await?;
        Ok(reel.map(|r| self.normalize_reel(&r)))
    }

    fn normalize_reel(&self, reel: &ReelResult) -> ReelResult {
        let config = self.transport.config();
        reel.map_urls(|u| config.build_api_url(u))
    }

    /// Last compiled reel with URLs resolved against the API base.
    pub fn reel(&self) -> Option<ReelResult> {
        self.compiler.result().map(|r| self.normalize_reel(&r))
    }

    pub fn is_compiling(&self) -> bool {
        self.compiler.is_compiling()
    }

    /// Compile or download failure, whichever happened last.
    pub fn reel_error(&self) -> Option<String> {
        lock(&self.download_error)
            .clone()
            .or_else(|| self.compiler.state().error)
    }

    // ----- downloads -----

    /// Download `url` (resolved against the API base) as `file_name`.
    pub async fn download(&self, url: &str, file_name: &str) -> ClientResult<SavedAsset> {
        let full_url = self.transport.config().build_api_url(url);
        if full_url.is_empty() {
            return Err(ClientError::validation("No download URL provided"));
        }

        *lock(&self.download_error) = None;
        let result = self.downloader.download(&full_url, file_name).await;
        if let Err(e) = &result {
            *lock(&self.download_error) = Some(e.user_message(Operation::DownloadAsset));
        }
        result
    }

    /// Download one output of the current reel.
    pub async fn download_reel_asset(&self, asset: ReelAsset) -> ClientResult<Option<SavedAsset>> {
        let Some(reel) = self.compiler.result() else {
            return Ok(None);
        };
        let Some(url) = asset.url(&reel) else {
            return Ok(None);
        };
        self.download(url, asset.file_name()).await.map(Some)
    }

    // ----- history -----

    pub async fn recent_sessions(&self) -> ClientResult<Vec<SessionSummary>> {
        history::recent_sessions(&self.transport).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_name() {
        assert_eq!(remote_file_name(Some("My Goal! (HD)")), "My_Goal_HD_.mp4");
        assert_eq!(remote_file_name(Some("clip_01")), "clip_01.mp4");
        let generated = remote_file_name(None);
        assert!(generated.starts_with("mediaveed_") && generated.ends_with(".mp4"));
        assert!(remote_file_name(Some("  ")).starts_with("mediaveed_"));
    }

    #[test]
    fn test_reel_asset_urls() {
        let reel = ReelResult {
            download_url: "/r.mp4".into(),
            captions_url: Some(String::new()),
            timeline_url: Some("/t.json".into()),
        };
        assert_eq!(ReelAsset::Video.url(&reel), Some("/r.mp4"));
        assert_eq!(ReelAsset::Captions.url(&reel), None);
        assert_eq!(ReelAsset::Timeline.url(&reel), Some("/t.json"));
        assert_eq!(ReelAsset::Video.file_name(), "highlight_reel.mp4");
    }
}
