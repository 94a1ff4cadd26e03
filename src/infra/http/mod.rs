//! HTTP surface: routes, error envelope, and the middleware stack around them.

pub mod cors;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod state;

pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use state::HttpState;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use self::middleware::{log_responses, rate_limit, set_request_context};

/// Assemble the router.
///
/// Requests pass, outermost first: request id, CORS, response logging, panic recovery,
/// rate limiting, then the route handler. Rate limiting therefore runs before any cache
/// lookup or upstream call, including for unknown paths.
pub fn build_router(state: HttpState, cors: CorsLayer) -> Router {
    let limiter = state.rate_limiter.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/neo", get(handlers::neo_feed))
        .route("/api/neo/{id}", get(handlers::neo_lookup))
        .route("/api/insight", get(handlers::insight_weather))
        .route("/api/imagesearch", get(handlers::image_search))
        .route("/api/epic/image-url", get(handlers::epic_image_url))
        .route("/api/epic/{collection}", get(handlers::epic_metadata))
        .route("/api/donki/{kind}", get(handlers::donki))
        .route("/api/mars", get(handlers::mars_photos))
        .route("/api/gibs/layers", get(handlers::gibs_layers))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(from_fn_with_state(limiter, rate_limit))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(from_fn(log_responses))
        .layer(cors)
        .layer(from_fn(set_request_context))
}
