//! Application services: the cache-aside proxy pipeline and its retry policy.

pub mod error;
pub mod proxy;
pub mod retry;
pub mod upstream;

pub use proxy::{FetchSource, Fetched, ProxyError, ProxyService};
pub use retry::RetryPolicy;
pub use upstream::{Upstream, UpstreamError};
