//! Upstream request description shared by the resource builders and the proxy pipeline.

use std::time::Duration;

use url::Url;

use crate::cache::CacheKey;

pub const API_KEY_PARAM: &str = "api_key";

/// Base locations and credential for every upstream the proxy talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// `api.nasa.gov`-style gateway (NeoWs, InSight, EPIC metadata, DONKI, Mars photos).
    pub api_base: Url,
    /// Image & Video Library search host.
    pub images_base: Url,
    /// EPIC imagery archive used by the image URL builder.
    pub epic_archive_base: Url,
    pub api_key: String,
}

impl Endpoints {
    /// Resolve `segments` below `base`, percent-encoding each segment.
    pub(crate) fn resolve(base: &Url, segments: &[&str]) -> Url {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn api(&self, segments: &[&str]) -> Url {
        Self::resolve(&self.api_base, segments)
    }

    pub(crate) fn images(&self, segments: &[&str]) -> Url {
        Self::resolve(&self.images_base, segments)
    }

    pub(crate) fn epic_archive(&self, segments: &[&str]) -> Url {
        Self::resolve(&self.epic_archive_base, segments)
    }
}

/// How long a successful response stays servable from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub key: CacheKey,
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn new(key: CacheKey, ttl: Duration) -> Self {
        Self { key, ttl }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// Use the configured retry policy.
    Policy,
    /// A single attempt, no backoff.
    Disabled,
}

/// A fully-resolved GET against an upstream resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Human label used in error envelopes, e.g. `"NEO feed"`.
    pub operation: &'static str,
    pub url: Url,
    pub params: Vec<(String, String)>,
    pub cache: Option<CachePolicy>,
    pub retry: RetryMode,
}

impl UpstreamRequest {
    pub fn new(operation: &'static str, url: Url) -> Self {
        Self {
            operation,
            url,
            params: Vec::new(),
            cache: None,
            retry: RetryMode::Policy,
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.push((name.to_string(), value.into()));
        self
    }

    pub fn param_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn cached(mut self, policy: CachePolicy) -> Self {
        self.cache = Some(policy);
        self
    }

    pub fn single_attempt(mut self) -> Self {
        self.retry = RetryMode::Disabled;
        self
    }

    /// The target URL with all query parameters appended.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.params {
                pairs.append_pair(name, value);
            }
        }
        url
    }

    /// Like [`Self::full_url`] but with the credential masked, for logs and diagnostics.
    pub fn redacted_url(&self) -> String {
        let mut url = self.url.clone();
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.params {
                if name == API_KEY_PARAM {
                    pairs.append_pair(name, "***");
                } else {
                    pairs.append_pair(name, value);
                }
            }
        }
        url.to_string()
    }
}

/// Treat absent and empty query values the same way.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}
