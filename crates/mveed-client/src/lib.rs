//! Client for the MediaVeed backends.
//!
//! This crate talks to two services:
//! - the highlight engine (analyze uploads, compile reels, list sessions,
//!   auth, profile and auto-post)
//! - the extractor (platform metadata and proxied media downloads)
//!
//! Each user-facing flow is a small controller with its own observable state.
//! [`HighlightEngine`] ties the highlight controllers together.

pub mod account;
pub mod auth_watch;
pub mod autopost;
mod blocking;
pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod history;
pub mod metrics;
pub mod progress;
pub mod reel;
pub mod selection;
pub mod storage;
pub mod telemetry;
pub mod transport;
pub mod upload;

pub use account::AccountClient;
pub use auth_watch::{AuthEvent, AuthWatcher};
pub use autopost::AutoPostClient;
pub use config::ClientConfig;
pub use download::{AssetDownloader, DirectorySaveTarget, SaveTarget, SavedAsset, TransientObject};
pub use engine::{HighlightEngine, ReelAsset};
pub use error::{ClientError, ClientResult, Operation};
pub use extractor::{ExtractorClient, MediaDownload, MediaRequest};
pub use progress::{ProgressAnimation, ProgressConfig};
pub use reel::{ReelCompiler, ReelState};
pub use selection::SegmentSelector;
pub use storage::{LocalStore, TokenStore};
pub use telemetry::{ErrorReporter, EventTracker, RecordingTracker, TracingReporter, TracingTracker};
pub use transport::Transport;
pub use upload::{UploadController, UploadState, VideoFile};

use std::sync::Arc;

/// Everything a front end needs, built from one config.
pub struct MediaVeed {
    pub transport: Arc<Transport>,
    pub highlight: HighlightEngine,
    pub extractor: ExtractorClient,
    pub account: AccountClient,
    pub autopost: AutoPostClient,
}

impl MediaVeed {
    /// Wire the clients with tracing-backed telemetry and a directory save target.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let target: Arc<dyn SaveTarget> = Arc::new(DirectorySaveTarget::new(config.download_dir.clone()));
        let tokens = TokenStore::new(LocalStore::new(config.storage_path.clone()));
        let transport = Arc::new(Transport::new(config, tokens)?);
        let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingReporter);

        Ok(Self {
            highlight: HighlightEngine::new(transport.clone(), reporter, target.clone()),
            extractor: ExtractorClient::new(transport.clone(), target),
            account: AccountClient::new(transport.clone()),
            autopost: AutoPostClient::new(transport.clone()),
            transport,
        })
    }

    /// Watcher over the shared token store, reporting to `tracker`.
    pub fn auth_watcher(&self, tracker: Arc<dyn EventTracker>) -> AuthWatcher {
        AuthWatcher::new(self.transport.tokens().clone(), tracker)
    }
}
