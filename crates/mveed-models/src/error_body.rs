//! Error payloads returned by the backends.
//!
//! Bodies look like `{ "detail": "text" }` or
//! `{ "detail": { "error": "...", "message": "...", "tip": "..." } }`, but older
//! endpoints put those fields at the top level, so every reader falls back to
//! the whole payload when `detail` is absent.

use serde_json::Value;

/// Parsed (or unparseable) error body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorPayload {
    body: Option<Value>,
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

impl ErrorPayload {
    pub fn new(body: Option<Value>) -> Self {
        Self { body }
    }

    /// Parse raw response bytes, treating invalid JSON as an empty payload.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            body: serde_json::from_slice(bytes).ok(),
        }
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// `detail` when present, otherwise the payload itself.
    pub fn detail(&self) -> Option<&Value> {
        let body = self.body.as_ref()?;
        match body.get("detail") {
            Some(Value::Null) | None => Some(body),
            Some(detail) => Some(detail),
        }
    }

    /// Message from `detail` as a string, `detail.error`, or `detail.message`.
    pub fn message(&self) -> Option<String> {
        let detail = self.detail()?;
        if let Some(s) = detail.as_str() {
            return Some(s.to_string());
        }
        str_field(detail, "error")
            .or_else(|| str_field(detail, "message"))
            .map(str::to_string)
    }

    /// `detail.tip`, if the backend attached one.
    pub fn tip(&self) -> Option<&str> {
        self.detail().and_then(|d| str_field(d, "tip"))
    }

    /// Message with the tip appended, or `fallback` when nothing usable is present.
    pub fn message_with_tip(&self, fallback: &str) -> String {
        let base = self.message().unwrap_or_else(|| fallback.to_string());
        match self.tip() {
            Some(tip) if base.is_empty() => tip.to_string(),
            Some(tip) => format!("{} — {}", base, tip),
            None => base,
        }
    }

    /// Extraction endpoints report `error.message`, else a `detail` string.
    pub fn extraction_message(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        body.get("error")
            .and_then(|e| str_field(e, "message"))
            .or_else(|| str_field(body, "detail"))
            .map(str::to_string)
    }

    /// Description used by the media proxy download path.
    ///
    /// Returns `None` when there is no JSON body at all.
    pub fn proxy_message(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        let detail = match body.get("detail") {
            Some(Value::Null) | None => None,
            Some(detail) => Some(detail),
        };

        let message = match detail {
            Some(Value::String(s)) => s.clone(),
            Some(detail) => {
                if let Some(error) = str_field(detail, "error") {
                    if let Some(tip) = str_field(detail, "tip") {
                        format!("{} (Tip: {})", error, tip)
                    } else if let Some(message) = str_field(detail, "message") {
                        format!("{} - {}", error, message)
                    } else {
                        error.to_string()
                    }
                } else if let Some(message) = str_field(detail, "message") {
                    message.to_string()
                } else {
                    detail.to_string()
                }
            }
            None => match str_field(body, "error") {
                Some(error) => error.to_string(),
                None => body.to_string(),
            },
        };
        Some(message)
    }
}
