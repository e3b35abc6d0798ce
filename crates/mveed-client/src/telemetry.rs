//! Error reporting and usage event hooks.
//!
//! Both are fire-and-forget: implementations must never influence control
//! flow. The defaults log through `tracing`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::error::{ClientError, Operation};

/// Feature tag attached to highlight engine reports.
pub const HIGHLIGHT_FEATURE: &str = "highlight-engine";

/// Receives failures for operator visibility.
pub trait ErrorReporter: Send + Sync {
    fn capture(&self, feature: &str, operation: Operation, error: &ClientError);
}

/// Receives product analytics events.
pub trait EventTracker: Send + Sync {
    fn track(&self, event: &str, params: &BTreeMap<String, String>);
}

/// Default reporter: one `error!` line per failure.
#[derive(Debug, Default, Clone)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn capture(&self, feature: &str, operation: Operation, err: &ClientError) {
        error!(
            feature = %feature,
            context = %operation.as_str(),
            status = ?err.http_status(),
            "Captured client error: {}", err
        );
    }
}

/// Default tracker: one `info!` line per event.
#[derive(Debug, Default, Clone)]
pub struct TracingTracker;

impl EventTracker for TracingTracker {
    fn track(&self, event: &str, params: &BTreeMap<String, String>) {
        info!(event = %event, params = ?params, "Tracked event");
    }
}

/// Tracker that keeps events in memory, for tests and the CLI summary.
#[derive(Debug, Default, Clone)]
pub struct RecordingTracker {
    events: Arc<Mutex<Vec<(String, BTreeMap<String, String>)>>>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Names of recorded events, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

impl EventTracker for RecordingTracker {
    fn track(&self, event: &str, params: &BTreeMap<String, String>) {
        if let Ok(mut events) = self.events.lock() {
            events.push((event.to_string(), params.clone()));
        }
    }
}

/// Build a params map from `(key, value)` pairs.
pub fn params<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_tracker() {
        let tracker = RecordingTracker::new();
        tracker.track("auth_event", &params([("action", "login".to_string())]));
        tracker.track("auth_event", &params([("action", "logout".to_string())]));

        let events = tracker.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].1.get("action").map(String::as_str), Some("login"));
        assert_eq!(tracker.event_names(), vec!["auth_event", "auth_event"]);
    }

    #[test]
    fn test_tracing_reporter_does_not_panic() {
        let reporter = TracingReporter;
        reporter.capture(
            HIGHLIGHT_FEATURE,
            Operation::Analyze,
            &ClientError::server(500, "boom"),
        );
    }
}
