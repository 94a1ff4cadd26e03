//! Caching, rate-limited proxy for the NASA open data APIs.
//!
//! The crate is split the usual way: `domain` holds the pure request builders for each
//! upstream resource, `application` runs the cache-aside and retry pipeline over an
//! [`application::upstream::Upstream`] seam, `cache` is the TTL store, and `infra` wires
//! the HTTP surface, the `reqwest` client and telemetry together.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
