//! Reel compiler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mveed_models::{CompileParams, CompileRequest, ReelResult};
use tokio::sync::watch;
use tracing::{debug, info, info_span, Instrument};

use crate::error::{friendly_message, ClientError, ClientResult, Operation};
use crate::metrics;
use crate::telemetry::{ErrorReporter, HIGHLIGHT_FEATURE};
use crate::transport::{decode_json, read_error_payload, Transport};

/// Observable state of the compiler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReelState {
    pub compiling: bool,
    pub result: Option<ReelResult>,
    pub error: Option<String>,
}

/// Clears the in-flight flag however the compile ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ReelCompiler {
    transport: Arc<Transport>,
    reporter: Arc<dyn ErrorReporter>,
    in_flight: AtomicBool,
    state: watch::Sender<ReelState>,
}

impl ReelCompiler {
    pub fn new(transport: Arc<Transport>, reporter: Arc<dyn ErrorReporter>) -> Self {
        let (state, _rx) = watch::channel(ReelState::default());
        Self {
            transport,
            reporter,
            in_flight: AtomicBool::new(false),
            state,
        }
    }

    pub fn state(&self) -> ReelState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReelState> {
        self.state.subscribe()
    }

    pub fn is_compiling(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn result(&self) -> Option<ReelResult> {
        self.state.borrow().result.clone()
    }

    /// Forget the previous result and error.
    pub fn reset(&self) {
        self.state.send_modify(|s| {
            s.result = None;
            s.error = None;
        });
    }

    /// Compile `selected_ids` of `session_id` into a reel.
    ///
    /// Returns `Ok(None)` without sending anything when the session id is
    /// missing, the selection is empty, or another compile is running.
    /// Every accepted call issues a fresh request and overwrites the stored
    /// result.
    pub async fn compile(
        &self,
        session_id: Option<&str>,
        selected_ids: &[String],
        params: CompileParams,
    ) -> ClientResult<Option<ReelResult>> {
        let Some(session_id) = session_id.filter(|id| !id.is_empty()) else {
            debug!("Compile skipped: no session");
            return Ok(None);
        };
        if selected_ids.is_empty() {
            debug!(session_id, "Compile skipped: empty selection");
            return Ok(None);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(session_id, "Compile skipped: already in flight");
            return Ok(None);
        }
        let _guard = InFlight(&self.in_flight);

        self.state.send_replace(ReelState {
            compiling: true,
            result: None,
            error: None,
        });

        let span = info_span!(
            "create_reel",
            session_id,
            selected = selected_ids.len(),
            style = %params.style
        );
        let outcome = self
            .request(session_id, selected_ids, params)
            .instrument(span)
            .await;

        match outcome {
            Ok(reel) => {
                info!(session_id, download_url = %reel.download_url, "Reel compiled");
                self.state.send_replace(ReelState {
                    compiling: false,
                    result: Some(reel.clone()),
                    error: None,
                });
                Ok(Some(reel))
            }
            Err(e) => {
                self.reporter
                    .capture(HIGHLIGHT_FEATURE, Operation::CompileReel, &e);
                let message = e.user_message(Operation::CompileReel);
                self.state.send_replace(ReelState {
                    compiling: false,
                    result: None,
                    error: Some(message),
                });
                Err(e)
            }
        }
    }

    async fn request(
        &self,
        session_id: &str,
        selected_ids: &[String],
        params: CompileParams,
    ) -> ClientResult<ReelResult> {
        let config = self.transport.config();
        let url = config.highlight_url(&format!("/reel/{}", urlencoding::encode(session_id)));
        let body = CompileRequest {
            selected_ids: selected_ids.to_vec(),
        };

        let request = self
            .transport
            .authorize(self.transport.http().post(&url))
            .await
            .query(&params)
            .json(&body);
        let response = self
            .transport
            .send(Operation::CompileReel.as_str(), request)
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let payload = read_error_payload(response).await;
            let base = payload.message_with_tip("Failed to create highlight reel");
            return Err(ClientError::server(
                status,
                friendly_message(&base, Some(status), config.max_upload_mb),
            ));
        }

        let reel: ReelResult = decode_json(response).await?;
        if reel.download_url.is_empty() {
            return Err(ClientError::invalid_response(
                "The highlight engine did not return a reel URL.",
            ));
        }
        metrics::record_reel_compiled(selected_ids.len());
        Ok(reel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::{LocalStore, TokenStore};
    use crate::telemetry::TracingReporter;
    use mveed_models::ReelStyle;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn compiler(base: &str, dir: &std::path::Path) -> ReelCompiler {
        let config = ClientConfig {
            api_base_url: base.to_string(),
            ..Default::default()
        };
        let tokens = TokenStore::new(LocalStore::new(dir.join("store.json")));
        let transport = Arc::new(Transport::new(config, tokens).unwrap());
        ReelCompiler::new(transport, Arc::new(TracingReporter))
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// Base URL of a port nothing listens on.
    fn closed_base() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unreachable_engine() {
        let dir = tempfile::tempdir().unwrap();
        let c = compiler(&closed_base(), dir.path());
        let err = c
            .compile(Some("abc"), &ids(&["s1"]), CompileParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Network(_)));
        let state = c.state();
        assert_eq!(
            state.error.as_deref(),
            Some("Unable to reach the highlight engine. Please try again shortly.")
        );
        assert!(state.result.is_none());
        assert!(!state.compiling);
        assert!(!c.is_compiling());
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let c = compiler(&server.uri(), dir.path());
        let err = c
            .compile(Some("abc"), &ids(&["s1"]), CompileParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidResponse(_)));
        assert!(c.state().error.is_some());
        assert!(c.result().is_none());
    }

    #[tokio::test]
    async fn test_compile_sends_selection_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/highlight/reel/abc"))
            .and(query_param("target_duration", "60"))
            .and(query_param("max_segments", "8"))
            .and(query_param("style", "story"))
            .and(body_json(json!({"selected_ids": ["s1", "s2"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "download_url": "/files/abc/reel.mp4",
                "captions_url": "/files/abc/reel.srt"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let c = compiler(&server.uri(), dir.path());
        let reel = c
            .compile(Some("abc"), &ids(&["s1", "s2"]), CompileParams::with_style(ReelStyle::Story))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reel.download_url, "/files/abc/reel.mp4");
        assert_eq!(c.result(), Some(reel));
        assert!(!c.is_compiling());
    }

    #[tokio::test]
    async fn test_compile_noop_without_session_or_selection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let c = compiler(&server.uri(), dir.path());
        let before = c.state();

        assert!(c.compile(None, &ids(&["s1"]), CompileParams::default()).await.unwrap().is_none());
        assert!(c.compile(Some("abc"), &[], CompileParams::default()).await.unwrap().is_none());
        assert_eq!(c.state(), before);
    }

    #[tokio::test]
    async fn test_compile_noop_while_in_flight() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let c = compiler(&server.uri(), dir.path());
        c.in_flight.store(true, Ordering::Release);

        let out = c.compile(Some("abc"), &ids(&["s1"]), CompileParams::default()).await.unwrap();
        assert!(out.is_none());
        assert!(c.is_compiling());
    }

    #[tokio::test]
    async fn test_repeat_compile_issues_new_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/highlight/reel/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"download_url": "/r.mp4"})))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let c = compiler(&server.uri(), dir.path());
        let sel = ids(&["s1"]);
        c.compile(Some("abc"), &sel, CompileParams::default()).await.unwrap();
        c.compile(Some("abc"), &sel, CompileParams::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_compile_failure_stores_friendly_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Session not found"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let c = compiler(&server.uri(), dir.path());
        let err = c
            .compile(Some("gone"), &ids(&["s1"]), CompileParams::default())
            .await
            .unwrap_err();

        assert_eq!(err.http_status(), Some(404));
        let state = c.state();
        assert!(state.result.is_none());
        assert_eq!(
            state.error.as_deref(),
            Some("We could not find that highlight session. Please re-upload your video.")
        );
        assert!(!c.is_compiling());
    }
}
