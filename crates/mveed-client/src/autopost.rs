//! Auto-post scheduling endpoints.

use std::sync::Arc;

use mveed_models::{AutoPostJob, AutoPostRequest, AutoPostStatus};
use serde_json::Value;
use tracing::info;

use crate::error::{ClientResult, Operation};
use crate::transport::{decode_json, generic_error, Transport};

const FALLBACK: &str = "Unable to complete request.";

pub struct AutoPostClient {
    transport: Arc<Transport>,
}

impl AutoPostClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    async fn call(&self, request: reqwest::RequestBuilder) -> ClientResult<reqwest::Response> {
        let request = self.transport.authorize(request).await;
        let response = self
            .transport
            .send(Operation::AutoPost.as_str(), request)
            .await?;
        if !response.status().is_success() {
            return Err(generic_error(response, FALLBACK).await);
        }
        Ok(response)
    }

    pub async fn request(&self, body: &AutoPostRequest) -> ClientResult<AutoPostJob> {
        let url = self.transport.config().build_api_url("/api/v1/autopost/request");
        let response = self.call(self.transport.http().post(&url).json(body)).await?;
        let job: AutoPostJob = decode_json(response).await?;
        info!(session_id = %body.session_id, job_id = ?job.id, "Auto-post requested");
        Ok(job)
    }

    /// Jobs for the signed-in user. Accepts a bare array or `{ "jobs": [...] }`.
    pub async fn jobs(&self) -> ClientResult<Vec<AutoPostJob>> {
        let url = self.transport.config().build_api_url("/api/v1/autopost/jobs");
        let response = self.call(self.transport.http().get(&url)).await?;
        let body: Value = decode_json(response).await?;
        let list = match body {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("jobs") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(list
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    pub async fn status(&self) -> ClientResult<AutoPostStatus> {
        let url = self.transport.config().build_api_url("/api/v1/autopost/status");
        let response = self.call(self.transport.http().get(&url)).await?;
        decode_json(response).await
    }
}
