//! Error types for the Service Layer client.
//!
//! # Design
//! Transport faults, HTTP-level failures and body decoding failures are kept
//! apart so callers can tell "the request never completed" from "the server
//! said no". Every non-success status lands in `ServiceError`, which carries
//! the HTTP status plus the vendor code and message pulled out of the
//! `{"error":{"code":..,"message":{"value":..}}}` envelope.

use serde_json::Value;
use thiserror::Error;

use crate::response::Response;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the client, queries and the request adapter.
#[derive(Debug, Error)]
pub enum Error {
    /// Network or IO fault while sending, or a response the transport could
    /// not deliver in a readable form.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a status the operation does not accept.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A body expected to be JSON (or a count) could not be decoded.
    #[error("failed to parse response body: {0}")]
    Parse(String),

    /// The request payload could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(String),

    /// A 200 response whose content type is neither JSON nor plain text.
    #[error("unexpected content type: {}", .0.as_deref().unwrap_or("<none>"))]
    UnexpectedContentType(Option<String>),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A non-success response from the Service Layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP {status}: {message}")]
pub struct ServiceError {
    pub status: u16,
    /// Vendor error code, when the body carried one.
    pub code: Option<i64>,
    pub message: String,
}

impl ServiceError {
    /// Build the error from a failed response.
    ///
    /// HTML bodies are used verbatim as the message. JSON bodies are searched
    /// for the vendor envelope; when the envelope is missing or the body does
    /// not decode, the raw body is used instead.
    pub fn from_response(response: &Response) -> Self {
        let status = response.status();
        match response.content_type() {
            Some("application/json") => {
                let parsed = response.json().ok();
                let error = parsed.as_ref().and_then(|v| v.get("error"));
                let message = error
                    .and_then(|e| e.pointer("/message/value"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| response.body().to_string());
                let code = error.and_then(|e| e.get("code")).and_then(vendor_code);
                Self {
                    status,
                    code,
                    message,
                }
            }
            _ => Self {
                status,
                code: None,
                message: response.body().to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Vendor codes arrive as numbers on most endpoints and as numeric strings
/// on a few.
fn vendor_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
