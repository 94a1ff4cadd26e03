//! Cache-aside proxy pipeline.
//!
//! For one [`UpstreamRequest`] the stages run in order: cache lookup, retried upstream
//! fetch, cache store. Rate limiting happens before this, in the router. Two concurrent
//! misses on the same key both go upstream; there is no request coalescing.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::cache::ResponseStore;
use crate::domain::{CachePolicy, RetryMode, UpstreamRequest};

use super::retry::RetryPolicy;
use super::upstream::{Upstream, UpstreamError};

/// Upstream could not be reached successfully within the retry budget.
#[derive(Debug, Error)]
#[error("{operation} failed")]
pub struct ProxyError {
    pub operation: &'static str,
    #[source]
    pub source: UpstreamError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Upstream,
}

impl FetchSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "hit",
            Self::Upstream => "miss",
        }
    }
}

/// Body returned to the caller together with where it came from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub body: Bytes,
    pub source: FetchSource,
}

#[derive(Clone)]
pub struct ProxyService {
    upstream: Arc<dyn Upstream>,
    cache: Arc<ResponseStore>,
    retry: RetryPolicy,
}

impl ProxyService {
    pub fn new(upstream: Arc<dyn Upstream>, cache: Arc<ResponseStore>, retry: RetryPolicy) -> Self {
        Self {
            upstream,
            cache,
            retry,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseStore> {
        &self.cache
    }

    #[instrument(
        skip_all,
        fields(operation = request.operation, key = request.cache.as_ref().map(|c| c.key.as_str()))
    )]
    pub async fn fetch(&self, request: &UpstreamRequest) -> Result<Fetched, ProxyError> {
        if let Some(body) = self.lookup(request.cache.as_ref()) {
            return Ok(Fetched {
                body,
                source: FetchSource::Cache,
            });
        }

        let body = self.fetch_upstream(request).await?;
        self.store(request.cache.as_ref(), &body);

        Ok(Fetched {
            body,
            source: FetchSource::Upstream,
        })
    }

    fn lookup(&self, policy: Option<&CachePolicy>) -> Option<Bytes> {
        let policy = policy?;
        let body = self.cache.get(&policy.key)?;
        debug!(target = "spaceproxy::proxy", cache = "hit", "serving cached body");
        Some(body)
    }

    async fn fetch_upstream(&self, request: &UpstreamRequest) -> Result<Bytes, ProxyError> {
        let policy = match request.retry {
            RetryMode::Policy => self.retry,
            RetryMode::Disabled => RetryPolicy::none(),
        };

        debug!(
            target = "spaceproxy::proxy",
            url = %request.redacted_url(),
            attempts = policy.attempts(),
            "fetching from upstream"
        );

        let upstream = &self.upstream;
        policy
            .run(request.operation, |_| upstream.get(request))
            .await
            .map_err(|source| ProxyError {
                operation: request.operation,
                source,
            })
    }

    fn store(&self, policy: Option<&CachePolicy>, body: &Bytes) {
        if let Some(policy) = policy {
            self.cache
                .insert(policy.key.clone(), body.clone(), Some(policy.ttl));
        }
    }
}
