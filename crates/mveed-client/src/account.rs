//! Signup, login, logout and profile.

use std::sync::Arc;

use mveed_models::{AuthResponse, LoginRequest, Profile, SignupRequest};
use serde::Serialize;
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

use crate::error::{ClientError, ClientResult, Operation};
use crate::metrics;
use crate::transport::{decode_json, generic_error, Transport};

const ACCOUNT_FALLBACK: &str = "Unable to complete request.";
const PROFILE_FALLBACK: &str = "Unable to load profile.";

/// First validation message, in field name order.
pub(crate) fn first_validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

pub struct AccountClient {
    transport: Arc<Transport>,
}

impl AccountClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn signup(&self, request: &SignupRequest, remember: bool) -> ClientResult<AuthResponse> {
        self.authenticate("signup", request, remember).await
    }

    pub async fn login(&self, request: &LoginRequest, remember: bool) -> ClientResult<AuthResponse> {
        self.authenticate("login", request, remember).await
    }

    /// Validate, post to `/api/v1/auth/{action}` and cache the returned token.
    async fn authenticate<T: Serialize + Validate>(
        &self,
        action: &str,
        body: &T,
        remember: bool,
    ) -> ClientResult<AuthResponse> {
        if let Err(errors) = body.validate() {
            metrics::record_rejection(Operation::Account.as_str());
            return Err(ClientError::validation(first_validation_message(&errors)));
        }

        let url = self
            .transport
            .config()
            .build_api_url(&format!("/api/v1/auth/{}", action));
        let request = self.transport.http().post(&url).json(body);
        let response = self
            .transport
            .send(Operation::Account.as_str(), request)
            .await?;
        if !response.status().is_success() {
            return Err(generic_error(response, ACCOUNT_FALLBACK).await);
        }

        let auth: AuthResponse = decode_json(response).await?;
        match auth.token() {
            Some(token) => {
                self.transport
                    .tokens()
                    .persist_token_async(token, remember)
                    .await?;
                info!(action, remember, "Signed in");
            }
            None => warn!(action, "Auth response carried no token"),
        }
        Ok(auth)
    }

    pub async fn logout(&self) -> ClientResult<()> {
        self.transport.tokens().clear_token_async().await?;
        info!("Signed out");
        Ok(())
    }

    pub async fn is_signed_in(&self) -> bool {
        self.transport.tokens().current_token().await.is_some()
    }

    pub async fn profile(&self) -> ClientResult<Profile> {
        let url = self.transport.config().build_api_url("/api/v1/profile");
        let request = self.transport.authorize(self.transport.http().get(&url)).await;
        let response = self
            .transport
            .send(Operation::Account.as_str(), request)
            .await?;
        if !response.status().is_success() {
            return Err(generic_error(response, PROFILE_FALLBACK).await);
        }
        decode_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::{LocalStore, TokenStore};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str, dir: &std::path::Path) -> (AccountClient, Arc<Transport>) {
        let config = ClientConfig {
            api_base_url: base.to_string(),
            api_key: Some("k".into()),
            ..Default::default()
        };
        let tokens = TokenStore::new(LocalStore::new(dir.join("store.json")));
        let transport = Arc::new(Transport::new(config, tokens).unwrap());
        (AccountClient::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_invalid_login_is_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (c, _) = client(&server.uri(), dir.path());
        let err = c
            .login(
                &LoginRequest {
                    email: "not-an-email".into(),
                    password: "pw".into(),
                },
                false,
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Enter a valid email address");
    }

    #[tokio::test]
    async fn test_login_persists_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .and(body_json(json!({"email": "a@b.co", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "jwt-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (c, t) = client(&server.uri(), dir.path());
        let auth = c
            .login(
                &LoginRequest {
                    email: "a@b.co".into(),
                    password: "pw".into(),
                },
                true,
            )
            .await
            .unwrap();

        assert_eq!(auth.token(), Some("jwt-9"));
        assert_eq!(t.tokens().read_token().as_deref(), Some("jwt-9"));
        assert!(c.is_signed_in().await);

        c.logout().await.unwrap();
        assert!(!c.is_signed_in().await);
    }

    #[tokio::test]
    async fn test_login_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (c, _) = client(&server.uri(), dir.path());
        let err = c
            .login(
                &LoginRequest {
                    email: "a@b.co".into(),
                    password: "pw".into(),
                },
                false,
            )
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(401));
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_profile_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/profile"))
            .and(header("X-API-Key", "k"))
            .and(header("Authorization", "Bearer jwt-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"email": "a@b.co", "plan": "pro", "credits": 3})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (c, t) = client(&server.uri(), dir.path());
        t.tokens().persist_token("jwt-1", false).unwrap();

        let profile = c.profile().await.unwrap();
        assert_eq!(profile.plan.as_deref(), Some("pro"));
        assert_eq!(profile.extra.get("credits"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_profile_fallback_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (c, _) = client(&server.uri(), dir.path());
        let err = c.profile().await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to load profile.");
    }
}
