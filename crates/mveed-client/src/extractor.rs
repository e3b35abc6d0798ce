//! Platform extraction and media download through the extractor backend.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use mveed_models::{
    detect_platform, ErrorPayload, LastDownload, MediaKind, Platform, VideoMetadata,
};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};

use crate::download::{fetch_to_transient, save_and_revoke, SaveTarget};
use crate::error::{cap_message, ClientError, ClientResult, Operation};
use crate::metrics;
use crate::progress::{ProgressAnimation, ProgressConfig};
use crate::storage::LAST_DOWNLOAD_KEY;
use crate::transport::{decode_json, Transport};

pub const UNSUPPORTED_PLATFORM: &str =
    "Unsupported platform. Please use YouTube, TikTok, Instagram, or Twitter URLs.";

/// What to fetch from the media proxy.
#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub proxy_url: String,
    pub title: String,
    pub platform: Option<Platform>,
    pub original_url: Option<String>,
    pub kind: MediaKind,
}

impl MediaRequest {
    pub fn from_metadata(meta: &VideoMetadata, original_url: Option<String>, kind: MediaKind) -> Self {
        Self {
            proxy_url: meta.proxy_url.clone(),
            title: meta.title.clone(),
            platform: Some(meta.platform),
            original_url,
            kind,
        }
    }
}

/// A finished media download.
#[derive(Debug, Clone)]
pub struct MediaDownload {
    pub path: PathBuf,
    pub bytes: u64,
    pub record: LastDownload,
}

/// Turn a backend `proxy_url` into the URL to fetch.
///
/// `/api...` is joined onto `extractor_base`, `http...` is kept, anything else
/// is rejected. Audio requests switch or add the `kind` query parameter.
pub fn resolve_download_url(
    extractor_base: &str,
    proxy_url: &str,
    kind: MediaKind,
) -> ClientResult<String> {
    if proxy_url.is_empty() {
        return Err(ClientError::validation("No download URL provided"));
    }

    let mut url = if proxy_url.starts_with("/api") {
        format!("{}{}", extractor_base.trim_end_matches('/'), proxy_url)
    } else if proxy_url.starts_with("http") {
        proxy_url.to_string()
    } else {
        return Err(ClientError::validation("Invalid proxy URL format"));
    };

    if kind == MediaKind::Audio {
        if url.contains("kind=video") {
            url = url.replace("kind=video", "kind=audio");
        } else if !url.contains("kind=") {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str("kind=audio");
        }
    }

    // '#' belongs to the media URL being proxied, not to a fragment.
    let escaped = url.replace('#', "%23");
    url::Url::parse(&escaped)
        .map(|u| u.to_string())
        .map_err(|_| ClientError::validation("Invalid proxy URL format"))
}

/// Error text for a failed proxy download.
fn proxy_error_message(status: u16, bytes: Option<&[u8]>) -> String {
    let message = match bytes {
        None => format!("Server error ({}). Please try again.", status),
        Some(bytes) => match ErrorPayload::from_bytes(bytes).proxy_message() {
            Some(message) => message,
            None => String::from_utf8_lossy(bytes).chars().take(150).collect(),
        },
    };
    if message.trim().is_empty() {
        "Download failed. Please try again.".to_string()
    } else {
        cap_message(&message)
    }
}

pub struct ExtractorClient {
    transport: Arc<Transport>,
    target: Arc<dyn SaveTarget>,
    progress: watch::Sender<u8>,
    progress_config: ProgressConfig,
}

impl ExtractorClient {
    pub fn new(transport: Arc<Transport>, target: Arc<dyn SaveTarget>) -> Self {
        let (progress, _rx) = watch::channel(0);
        Self {
            transport,
            target,
            progress,
            progress_config: ProgressConfig::default(),
        }
    }

    pub fn with_progress_config(mut self, config: ProgressConfig) -> Self {
        self.progress_config = config;
        self
    }

    /// Cosmetic download progress, 0..=100.
    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    fn base(&self) -> &str {
        self.transport.config().extractor_base_url.trim_end_matches('/')
    }

    /// Fetch metadata for a supported platform URL.
    pub async fn extract(&self, url: &str) -> ClientResult<VideoMetadata> {
        let Some(platform) = detect_platform(url) else {
            metrics::record_rejection(Operation::Extract.as_str());
            return Err(ClientError::validation(UNSUPPORTED_PLATFORM));
        };

        let span = info_span!("extract", platform = %platform);
        self.extract_inner(url, platform).instrument(span).await
    }

    async fn extract_inner(&self, url: &str, platform: Platform) -> ClientResult<VideoMetadata> {
        info!(url, "Extracting");
        let endpoint = format!("{}/api/v1/{}/extract", self.base(), platform.as_str());
        let request = self.transport.http().post(&endpoint).json(&json!({ "url": url }));
        let response = self
            .transport
            .send(Operation::Extract.as_str(), request)
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let bytes = response.bytes().await.unwrap_or_default();
            let message = ErrorPayload::from_bytes(&bytes)
                .extraction_message()
                .unwrap_or_else(|| "Failed to extract video".to_string());
            return Err(ClientError::server(status, message));
        }

        let payload: Value = decode_json(response).await?;
        let meta = VideoMetadata::from_payload(&payload, platform)
            .map_err(|e| ClientError::invalid_response(e.to_string()))?;
        info!(title = %meta.title, author = %meta.author, "Extraction successful");
        Ok(meta)
    }

    /// Download video or audio through the media proxy and save it.
    ///
    /// Progress animates on [`subscribe_progress`](Self::subscribe_progress)
    /// while the request runs. On success the download is remembered under
    /// the last-download key. Server error messages are capped at 150
    /// characters.
    pub async fn download_media(&self, request: &MediaRequest) -> ClientResult<MediaDownload> {
        let animation = ProgressAnimation::start_on(self.progress.clone(), self.progress_config);
        let span = info_span!("download_media", kind = %request.kind, title = %request.title);
        let result = self.fetch_media(request).instrument(span).await;
        animation.finish(result.is_ok());
        result
    }

    async fn fetch_media(&self, request: &MediaRequest) -> ClientResult<MediaDownload> {
        let url = resolve_download_url(self.base(), &request.proxy_url, request.kind)?;
        info!(url = %url, "Starting media download");

        let response = self
            .transport
            .send(Operation::DownloadMedia.as_str(), self.transport.http().get(&url))
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let bytes = response.bytes().await.ok();
            return Err(ClientError::server(
                status,
                proxy_error_message(status, bytes.as_deref()),
            ));
        }

        let object = fetch_to_transient(response).await?;
        let file_name = request.kind.file_name(&request.title);
        let (path, bytes) = save_and_revoke(self.target.clone(), object, &file_name).await?;
        metrics::record_downloaded_bytes(Operation::DownloadMedia.as_str(), bytes);

        let record = LastDownload {
            title: request.title.clone(),
            platform: request.platform,
            original_url: request.original_url.clone(),
            download_url: url,
            kind: request.kind,
            completed_at: Utc::now().timestamp_millis(),
        };
        if let Err(e) = self
            .transport
            .tokens()
            .store()
            .set_json_async(LAST_DOWNLOAD_KEY, &record)
            .await
        {
            warn!("Failed to remember last download: {}", e);
        }

        info!(path = %path.display(), bytes, "Media download completed");
        Ok(MediaDownload {
            path,
            bytes,
            record,
        })
    }

    /// Most recent completed download, if remembered.
    pub fn last_download(&self) -> Option<LastDownload> {
        match self.transport.tokens().store().get_json(LAST_DOWNLOAD_KEY) {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to read last download: {}", e);
                None
            }
        }
    }
}
