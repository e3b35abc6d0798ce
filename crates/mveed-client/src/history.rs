//! Recent highlight sessions.

use mveed_models::SessionSummary;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult, Operation};
use crate::transport::{decode_json, Transport};

pub const RECENT_LIMIT: u32 = 100;

/// `GET {prefix}/sessions?limit=100`.
///
/// A body that is not an array reads as no sessions; entries that do not
/// parse are skipped.
pub async fn recent_sessions(transport: &Transport) -> ClientResult<Vec<SessionSummary>> {
    let url = transport.config().highlight_url("/sessions");
    let request = transport
        .authorize(transport.http().get(&url))
        .await
        .query(&[("limit", RECENT_LIMIT)]);
    let response = transport
        .send(Operation::ListSessions.as_str(), request)
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::server(
            status.as_u16(),
            format!("Failed to load sessions ({})", status.as_u16()),
        ));
    }

    let body: Value = decode_json(response).await?;
    let Value::Array(items) = body else {
        warn!("Sessions response was not a list");
        return Ok(Vec::new());
    };

    let total = items.len();
    let sessions: Vec<SessionSummary> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    debug!(total, parsed = sessions.len(), "Loaded recent sessions");
    Ok(sessions)
}
