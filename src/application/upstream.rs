//! Seam between the proxy pipeline and the HTTP client that reaches upstream.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::domain::UpstreamRequest;

/// Why a single upstream attempt failed.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Connection, TLS, DNS, or body read failure.
    #[error("upstream transport error: {message}")]
    Transport { message: String },
    #[error("upstream request timed out")]
    Timeout,
    /// Upstream answered with a non-2xx status.
    #[error("upstream responded with status {status}")]
    Status { status: u16, body: Bytes },
}

impl UpstreamError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Best-effort detail for the caller: upstream's own error body when there is one
    /// (as JSON if it parses, verbatim text otherwise), the failure message otherwise.
    pub fn detail(&self) -> Value {
        match self {
            Self::Status { body, .. } if !body.is_empty() => serde_json::from_slice(body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned())),
            other => Value::String(other.to_string()),
        }
    }
}

/// Issues one GET against upstream and returns the raw body of a 2xx response.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get(&self, request: &UpstreamRequest) -> Result<Bytes, UpstreamError>;
}
