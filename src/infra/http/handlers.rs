use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::Fetched;
use crate::domain::epic::{self, EpicImageQuery, EpicImageUrl};
use crate::domain::gibs::{self, GibsCatalogue};
use crate::domain::resources::{
    self, DonkiQuery, EpicQuery, ImageSearchQuery, MarsQuery, NeoFeedQuery,
};
use crate::domain::UpstreamRequest;

use super::error::ApiError;
use super::state::HttpState;

const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub ok: bool,
    pub message: &'static str,
}

pub async fn root() -> Json<Liveness> {
    Json(Liveness {
        ok: true,
        message: "NASA proxy running",
    })
}

pub async fn neo_feed(
    State(state): State<HttpState>,
    query: Result<Query<NeoFeedQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = extract(query)?;
    forward(&state, resources::neo_feed(&state.endpoints, &query)).await
}

pub async fn neo_lookup(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    forward(&state, resources::neo_lookup(&state.endpoints, &id)).await
}

pub async fn insight_weather(State(state): State<HttpState>) -> Result<Response, ApiError> {
    forward(&state, resources::insight_weather(&state.endpoints)).await
}

pub async fn image_search(
    State(state): State<HttpState>,
    query: Result<Query<ImageSearchQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = extract(query)?;
    forward(&state, resources::image_search(&state.endpoints, &query)).await
}

pub async fn epic_image_url(
    State(state): State<HttpState>,
    query: Result<Query<EpicImageQuery>, QueryRejection>,
) -> Result<Json<EpicImageUrl>, ApiError> {
    let query = extract(query)?;
    epic::image_url(&state.endpoints, &query)
        .map(Json)
        .map_err(ApiError::bad_request)
}

pub async fn epic_metadata(
    State(state): State<HttpState>,
    Path(collection): Path<String>,
    query: Result<Query<EpicQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = extract(query)?;
    let request = resources::epic_metadata(&state.endpoints, &collection, &query)
        .map_err(ApiError::bad_request)?;
    forward(&state, request).await
}

pub async fn donki(
    State(state): State<HttpState>,
    Path(kind): Path<String>,
    query: Result<Query<DonkiQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = extract(query)?;
    let request =
        resources::donki(&state.endpoints, &kind, &query).map_err(ApiError::bad_request)?;
    forward(&state, request).await
}

pub async fn mars_photos(
    State(state): State<HttpState>,
    query: Result<Query<MarsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = extract(query)?;
    let request =
        resources::mars_photos(&state.endpoints, &query).map_err(ApiError::bad_request)?;
    forward(&state, request).await
}

pub async fn gibs_layers() -> Json<GibsCatalogue> {
    Json(gibs::catalogue())
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path())
}

fn extract<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(inner)| inner)
        .map_err(|rejection| ApiError::malformed_query(rejection.body_text()))
}

async fn forward(state: &HttpState, request: UpstreamRequest) -> Result<Response, ApiError> {
    let fetched = state
        .proxy
        .fetch(&request)
        .await
        .map_err(ApiError::upstream)?;
    Ok(json_body(fetched))
}

/// Upstream bytes go out untouched, so a cache hit is byte-identical to the first miss.
fn json_body(fetched: Fetched) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (
                CACHE_STATUS_HEADER,
                HeaderValue::from_static(fetched.source.as_str()),
            ),
        ],
        fetched.body,
    )
        .into_response()
}
