//! Infrastructure adapters: HTTP surface, upstream client, telemetry.

pub mod error;
pub mod http;
pub mod telemetry;
pub mod upstream;
