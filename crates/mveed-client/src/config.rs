//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default highlight/auth backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8006";

/// Default extraction backend.
pub const DEFAULT_EXTRACTOR_URL: &str = "http://127.0.0.1:8005";

pub const DEFAULT_API_PREFIX: &str = "/api/v1/highlight";

pub const DEFAULT_MAX_UPLOAD_MB: u64 = 300;

/// Configuration shared by every client in this crate.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Highlight, auth, profile and auto-post backend
    pub api_base_url: String,
    /// Path prefix of the highlight endpoints
    pub api_prefix: String,
    /// Sent as `X-API-Key` when set
    pub api_key: Option<String>,
    /// Upload ceiling in megabytes
    pub max_upload_mb: u64,
    /// Platform extraction backend
    pub extractor_base_url: String,
    /// Local key/value store holding the bearer token and last download
    pub storage_path: PathBuf,
    /// Where downloaded assets are saved
    pub download_dir: PathBuf,
    /// Request timeout; `None` leaves requests unbounded
    pub request_timeout: Option<Duration>,
}

/// Megabytes to bytes, saturating at `u64::MAX`.
pub fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            api_key: None,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            extractor_base_url: DEFAULT_EXTRACTOR_URL.to_string(),
            storage_path: PathBuf::from(".mveed/storage.json"),
            download_dir: PathBuf::from("."),
            request_timeout: None,
        }
    }
}

/// First non-empty value among `keys`.
fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: first_env(&[
                "MVEED_HIGHLIGHT_API_URL",
                "MVEED_API_BASE_URL",
                "MVEED_API_URL",
            ])
            .unwrap_or(defaults.api_base_url),
            api_prefix: first_env(&["MVEED_HIGHLIGHT_API_PREFIX"]).unwrap_or(defaults.api_prefix),
            api_key: first_env(&[
                "MVEED_HIGHLIGHT_API_KEY",
                "MVEED_INTERNAL_API_KEY",
                "MVEED_API_KEY",
            ]),
            max_upload_mb: first_env(&["MVEED_HIGHLIGHT_MAX_UPLOAD_MB", "MVEED_MAX_UPLOAD_MB"])
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_upload_mb),
            extractor_base_url: first_env(&["MVEED_EXTRACTOR_URL"])
                .unwrap_or(defaults.extractor_base_url),
            storage_path: first_env(&["MVEED_STORAGE_PATH"])
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            download_dir: first_env(&["MVEED_DOWNLOAD_DIR"])
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            request_timeout: first_env(&["MVEED_REQUEST_TIMEOUT"])
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }

    /// Upload ceiling in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        mb_to_bytes(self.max_upload_mb)
    }

    /// Full URL of a highlight endpoint, e.g. `highlight_url("/analyze")`.
    pub fn highlight_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.api_base_url.trim_end_matches('/'),
            self.api_prefix,
            path
        )
    }

    /// Resolve a backend-relative URL against the API base.
    ///
    /// Empty stays empty and absolute `http(s)` URLs are returned as is.
    pub fn build_api_url(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        if path.starts_with("http") {
            return path.to_string();
        }
        let base = self.api_base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "MVEED_HIGHLIGHT_API_URL",
            "MVEED_API_BASE_URL",
            "MVEED_API_URL",
            "MVEED_HIGHLIGHT_API_PREFIX",
            "MVEED_HIGHLIGHT_API_KEY",
            "MVEED_INTERNAL_API_KEY",
            "MVEED_API_KEY",
            "MVEED_HIGHLIGHT_MAX_UPLOAD_MB",
            "MVEED_MAX_UPLOAD_MB",
            "MVEED_EXTRACTOR_URL",
            "MVEED_STORAGE_PATH",
            "MVEED_DOWNLOAD_DIR",
            "MVEED_REQUEST_TIMEOUT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8006");
        assert_eq!(config.api_prefix, "/api/v1/highlight");
        assert_eq!(config.max_upload_mb, 300);
        assert_eq!(config.max_upload_bytes(), 300 * 1024 * 1024);

        let huge = ClientConfig {
            max_upload_mb: u64::MAX,
            ..Default::default()
        };
        assert_eq!(huge.max_upload_bytes(), u64::MAX);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_fallback_chain() {
        clear_env();
        std::env::set_var("MVEED_API_URL", "http://third");
        std::env::set_var("MVEED_API_BASE_URL", "http://second");
        std::env::set_var("MVEED_INTERNAL_API_KEY", "k2");
        std::env::set_var("MVEED_MAX_UPLOAD_MB", "50");
        std::env::set_var("MVEED_REQUEST_TIMEOUT", "30");

        let config = ClientConfig::from_env();
        assert_eq!(config.api_base_url, "http://second");
        assert_eq!(config.api_key.as_deref(), Some("k2"));
        assert_eq!(config.max_upload_mb, 50);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_blank_values() {
        clear_env();
        std::env::set_var("MVEED_HIGHLIGHT_API_URL", "  ");
        std::env::set_var("MVEED_MAX_UPLOAD_MB", "lots");

        let config = ClientConfig::from_env();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.max_upload_mb, DEFAULT_MAX_UPLOAD_MB);

        clear_env();
    }

    #[test]
    fn test_build_api_url() {
        let config = ClientConfig {
            api_base_url: "http://api:8006/".into(),
            ..Default::default()
        };
        assert_eq!(config.build_api_url(""), "");
        assert_eq!(config.build_api_url("https://cdn/x.mp4"), "https://cdn/x.mp4");
        assert_eq!(config.build_api_url("/c/s1"), "http://api:8006/c/s1");
        assert_eq!(config.build_api_url("c/s1"), "http://api:8006/c/s1");
        assert_eq!(
            config.highlight_url("/analyze"),
            "http://api:8006/api/v1/highlight/analyze"
        );
    }
}
