//! Asset downloader.
//!
//! A fetched asset is streamed into a transient temp file, handed to a
//! [`SaveTarget`], and then revoked (deleted) whatever the target did.
//! Save targets are synchronous and always run on the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Response;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, info_span, Instrument};

use crate::blocking;
use crate::error::{friendly_message, ClientError, ClientResult, Operation};
use crate::metrics;
use crate::telemetry::{ErrorReporter, HIGHLIGHT_FEATURE};
use crate::transport::{read_error_payload, Transport};

/// Downloaded bytes that exist only until [`TransientObject::revoke`].
#[derive(Debug)]
pub struct TransientObject {
    file: NamedTempFile,
    size: u64,
    content_type: Option<String>,
}

impl TransientObject {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Delete the backing file.
    pub fn revoke(self) -> ClientResult<()> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        debug!(path = %path.display(), "Revoked transient object");
        Ok(())
    }
}

/// Stream a successful response body into a new transient object.
pub(crate) async fn fetch_to_transient(mut response: Response) -> ClientResult<TransientObject> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (file, handle) = blocking::run(|| {
        let file = NamedTempFile::new()?;
        let handle = file.reopen()?;
        Ok((file, handle))
    })
    .await?;

    let mut out = tokio::fs::File::from_std(handle);
    let mut size = 0u64;
    while let Some(chunk) = response.chunk().await? {
        out.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    out.flush().await?;
    out.sync_all().await?;

    Ok(TransientObject {
        file,
        size,
        content_type,
    })
}

/// Receives a downloaded object under a suggested file name.
pub trait SaveTarget: Send + Sync {
    /// Persist `object`; returns where it ended up.
    fn save(&self, object: &TransientObject, file_name: &str) -> ClientResult<PathBuf>;
}

/// Copies downloads into a directory, never overwriting an existing file.
#[derive(Debug, Clone)]
pub struct DirectorySaveTarget {
    dir: PathBuf,
}

impl DirectorySaveTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First free `name`, `name (1)`, `name (2)`, ... in the directory.
    fn free_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "download".to_string());
        let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

        (1..)
            .map(|n| match &ext {
                Some(ext) => self.dir.join(format!("{} ({}).{}", stem, n, ext)),
                None => self.dir.join(format!("{} ({})", stem, n)),
            })
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl SaveTarget for DirectorySaveTarget {
    fn save(&self, object: &TransientObject, file_name: &str) -> ClientResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let dest = self.free_path(&safe_file_name(file_name));
        std::fs::copy(object.path(), &dest)?;
        Ok(dest)
    }
}

/// Strip any directory components so the name cannot escape the target.
pub fn safe_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => "download".to_string(),
        name => name.to_string(),
    }
}

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAsset {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Hand `object` to `target`, then revoke it regardless of the outcome.
pub(crate) async fn save_and_revoke(
    target: Arc<dyn SaveTarget>,
    object: TransientObject,
    file_name: &str,
) -> ClientResult<(PathBuf, u64)> {
    let file_name = file_name.to_string();
    blocking::run(move || {
        let bytes = object.size();
        let saved = target.save(&object, &file_name);
        object.revoke()?;
        Ok((saved?, bytes))
    })
    .await
}

pub struct AssetDownloader {
    transport: Arc<Transport>,
    reporter: Arc<dyn ErrorReporter>,
    target: Arc<dyn SaveTarget>,
}

impl AssetDownloader {
    pub fn new(
        transport: Arc<Transport>,
        reporter: Arc<dyn ErrorReporter>,
        target: Arc<dyn SaveTarget>,
    ) -> Self {
        Self {
            transport,
            reporter,
            target,
        }
    }

    /// Fetch exactly `url` with backend credentials and save it as `file_name`.
    /// No retry.
    pub async fn download(&self, url: &str, file_name: &str) -> ClientResult<SavedAsset> {
        let span = info_span!("download_asset", url, file_name);
        let result = self.fetch_and_save(url, file_name).instrument(span).await;
        if let Err(e) = &result {
            self.reporter
                .capture(HIGHLIGHT_FEATURE, Operation::DownloadAsset, e);
        }
        result
    }

    async fn fetch_and_save(&self, url: &str, file_name: &str) -> ClientResult<SavedAsset> {
        let request = self.transport.authorize(self.transport.http().get(url)).await;
        let response = self
            .transport
            .send(Operation::DownloadAsset.as_str(), request)
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let payload = read_error_payload(response).await;
            let base = payload.message_with_tip("Failed to download file");
            return Err(ClientError::server(
                status,
                friendly_message(&base, Some(status), self.transport.config().max_upload_mb),
            ));
        }

        let object = fetch_to_transient(response).await?;
        let (path, bytes) = save_and_revoke(self.target.clone(), object, file_name).await?;
        metrics::record_downloaded_bytes(Operation::DownloadAsset.as_str(), bytes);
        info!(path = %path.display(), bytes, "Asset saved");

        Ok(SavedAsset {
            url: url.to_string(),
            path,
            bytes,
        })
    }
}
