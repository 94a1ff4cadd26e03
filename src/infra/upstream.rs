//! `reqwest`-backed [`Upstream`] implementation.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};

use crate::application::upstream::{Upstream, UpstreamError};
use crate::domain::UpstreamRequest;

use super::error::InfraError;

/// Shared HTTP client with a fixed per-call timeout and identifying `User-Agent`.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: Client,
}

impl ReqwestUpstream {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn default_user_agent() -> &'static str {
        concat!("spaceproxy/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl Upstream for ReqwestUpstream {
    async fn get(&self, request: &UpstreamRequest) -> Result<Bytes, UpstreamError> {
        let response = self
            .client
            .get(request.full_url())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.bytes().await.map_err(classify)?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

/// Map a client error without leaking the request URL, which carries the credential.
fn classify(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        return UpstreamError::Timeout;
    }

    let err = err.without_url();
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(inner) = current {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        current = inner.source();
    }
    UpstreamError::transport(message)
}
