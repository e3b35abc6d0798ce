//! Background watcher that reports sign-in state changes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::storage::TokenStore;
use crate::telemetry::{params, EventTracker};

pub const AUTH_EVENT: &str = "auth_event";

/// Default poll period.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SessionRestored,
    Login,
    Logout,
    TokenRefreshed,
}

impl AuthEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::SessionRestored => "session_restored",
            AuthEvent::Login => "login",
            AuthEvent::Logout => "logout",
            AuthEvent::TokenRefreshed => "token_refreshed",
        }
    }

    /// Event for a token transition, if any.
    pub fn classify(previous: Option<&str>, next: Option<&str>) -> Option<Self> {
        match (previous, next) {
            (None, Some(_)) => Some(AuthEvent::Login),
            (Some(_), None) => Some(AuthEvent::Logout),
            (Some(a), Some(b)) if a != b => Some(AuthEvent::TokenRefreshed),
            _ => None,
        }
    }
}

fn emit(tracker: &dyn EventTracker, event: AuthEvent) {
    debug!(action = event.as_str(), "Auth state changed");
    tracker.track(
        AUTH_EVENT,
        &params([
            ("action", event.as_str().to_string()),
            ("method", "jwt".to_string()),
        ]),
    );
}

pub struct AuthWatcher {
    tokens: TokenStore,
    tracker: Arc<dyn EventTracker>,
    period: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AuthWatcher {
    pub fn new(tokens: TokenStore, tracker: Arc<dyn EventTracker>) -> Self {
        Self {
            tokens,
            tracker,
            period: POLL_INTERVAL,
            handle: Mutex::new(None),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|h| h.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Start polling. A second call while running does nothing.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(&self) {
        let Ok(mut slot) = self.handle.lock() else {
            return;
        };
        if slot.is_some() {
            return;
        }

        let mut last = self.tokens.read_token();
        if last.is_some() {
            emit(self.tracker.as_ref(), AuthEvent::SessionRestored);
        }

        let tokens = self.tokens.clone();
        let tracker = self.tracker.clone();
        let period = self.period;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let next = tokens.read_token();
                if let Some(event) = AuthEvent::classify(last.as_deref(), next.as_deref()) {
                    emit(tracker.as_ref(), event);
                }
                last = next;
            }
        }));
    }

    /// Stop polling; a later `start` begins a fresh watch.
    pub fn stop(&self) {
        if let Ok(mut slot) = self.handle.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for AuthWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;
    use crate::telemetry::RecordingTracker;

    fn actions(tracker: &RecordingTracker) -> Vec<String> {
        tracker
            .events()
            .into_iter()
            .filter_map(|(_, p)| p.get("action").cloned())
            .collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(AuthEvent::classify(None, Some("a")), Some(AuthEvent::Login));
        assert_eq!(AuthEvent::classify(Some("a"), None), Some(AuthEvent::Logout));
        assert_eq!(AuthEvent::classify(Some("a"), Some("b")), Some(AuthEvent::TokenRefreshed));
        assert_eq!(AuthEvent::classify(Some("a"), Some("a")), None);
        assert_eq!(AuthEvent::classify(None, None), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_reports_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = TokenStore::new(LocalStore::new(dir.path().join("s.json")));
        tokens.persist_token("t1", false).unwrap();

        let tracker = RecordingTracker::new();
        let watcher = AuthWatcher::new(tokens.clone(), Arc::new(tracker.clone()));
        watcher.start();
        watcher.start();
        assert!(watcher.is_running());
        assert_eq!(actions(&tracker), vec!["session_restored"]);

        tokens.persist_token("t2", false).unwrap();
        tokio::time::sleep(Duration::from_millis(5100)).await;
        tokens.clear_token().unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        tokens.persist_token("t3", true).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(
            actions(&tracker),
            vec!["session_restored", "token_refreshed", "logout", "login"]
        );
        assert!(tracker.events().iter().all(|(name, _)| name == AUTH_EVENT));

        watcher.stop();
        assert!(!watcher.is_running());
        tokens.clear_token().unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(actions(&tracker).len(), 4);
    }
}
