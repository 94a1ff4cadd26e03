use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::config::CorsSettings;

const ANY_ORIGIN: &str = "*";

/// Build the CORS layer.
///
/// Permissive mode echoes every origin back. Strict mode only answers for the configured
/// list, where a `*` entry opens it to any origin.
pub fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request());

    if !settings.strict {
        return base.allow_origin(AllowOrigin::mirror_request());
    }

    if settings.allowed_origins.iter().any(|o| o == ANY_ORIGIN) {
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    target = "spaceproxy::http::cors",
                    origin = %origin,
                    "skipping origin that is not a valid header value"
                );
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}
