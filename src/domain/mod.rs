//! Pure request construction for every upstream resource.

pub mod epic;
pub mod error;
pub mod gibs;
pub mod request;
pub mod resources;

pub use error::RequestError;
pub use request::{CachePolicy, Endpoints, RetryMode, UpstreamRequest};
