//! Client metrics collection.
//!
//! - Request counters by operation and outcome
//! - Latency histograms
//! - Local validation rejections

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total backend requests by operation and outcome.
    pub const REQUESTS_TOTAL: &str = "mveed_client_requests_total";

    /// Uploads rejected before any request was sent.
    pub const VALIDATION_REJECTIONS_TOTAL: &str = "mveed_client_validation_rejections_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "mveed_client_latency_seconds";

    /// Bytes saved to disk by downloads.
    pub const DOWNLOADED_BYTES_TOTAL: &str = "mveed_client_downloaded_bytes_total";

    /// Reels compiled, with a histogram of segments per reel.
    pub const REELS_COMPILED_TOTAL: &str = "mveed_client_reels_compiled_total";
    pub const REEL_SEGMENTS: &str = "mveed_client_reel_segments";
}

/// Record metrics for a finished request.
pub fn record_request(operation: &str, success: bool, latency_ms: f64) {
    let outcome = if success { "success" } else { "error" };

    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a local validation rejection.
pub fn record_rejection(operation: &str) {
    counter!(
        names::VALIDATION_REJECTIONS_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_downloaded_bytes(operation: &str, bytes: u64) {
    counter!(
        names::DOWNLOADED_BYTES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(bytes);
}

/// Record a successful reel compile.
pub fn record_reel_compiled(segments: usize) {
    counter!(names::REELS_COMPILED_TOTAL).increment(1);
    histogram!(names::REEL_SEGMENTS).record(segments as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.contains("requests"));
        assert!(names::VALIDATION_REJECTIONS_TOTAL.contains("rejections"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("analyze_upload", true, 12.0);
        record_rejection("analyze_upload");
        record_downloaded_bytes("download_asset", 1024);
        record_reel_compiled(3);
    }
}
