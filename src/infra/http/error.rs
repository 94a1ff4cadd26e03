//! JSON error envelope: `{ "error": string, "detail"?: string | object }`.

use std::any::Any;
use std::borrow::Cow;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::application::{ProxyError, UpstreamError};
use crate::application::error::ErrorReport;
use crate::domain::RequestError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
    report: ErrorReport,
    retry_after: Option<u64>,
}

impl ApiError {
    fn new(
        status: StatusCode,
        error: impl Into<Cow<'static, str>>,
        detail: Option<Value>,
        report: ErrorReport,
    ) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                detail,
            },
            report,
            retry_after: None,
        }
    }

    /// Upstream stayed unreachable or kept failing through every retry.
    pub fn upstream(err: ProxyError) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let mut report = ErrorReport::from_error("infra::http::upstream", status, &err);
        let detail = err.source.detail();
        if matches!(&err.source, UpstreamError::Status { body, .. } if !body.is_empty()) {
            report.messages.push(format!("upstream body: {detail}"));
        }
        Self::new(status, err.to_string(), Some(detail), report)
    }

    pub fn bad_request(err: RequestError) -> Self {
        let status = StatusCode::BAD_REQUEST;
        let report = ErrorReport::from_error("infra::http::request", status, &err);
        Self::new(status, err.to_string(), None, report)
    }

    pub fn malformed_query(message: String) -> Self {
        let status = StatusCode::BAD_REQUEST;
        let report = ErrorReport::from_message("infra::http::query", status, message.clone());
        Self::new(status, "invalid query string", Some(Value::String(message)), report)
    }

    pub fn not_found(path: &str) -> Self {
        let status = StatusCode::NOT_FOUND;
        let report =
            ErrorReport::from_message("infra::http::fallback", status, format!("no route for {path}"));
        Self::new(status, "not found", None, report)
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        let status = StatusCode::TOO_MANY_REQUESTS;
        let report = ErrorReport::from_message(
            "infra::http::rate_limit",
            status,
            format!("rate_limited: retry_after={retry_after}"),
        );
        let mut error = Self::new(
            status,
            "Too many requests, please try again later.",
            None,
            report,
        );
        error.retry_after = Some(retry_after);
        error
    }

    /// Fallback for a handler that panicked.
    pub fn server_error(detail: Option<String>) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let report = ErrorReport::from_message(
            "infra::http::panic",
            status,
            detail.clone().unwrap_or_else(|| "handler panicked".to_string()),
        );
        Self::new(status, "server error", detail.map(Value::String), report)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(retry_after) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        self.report.attach(&mut response);
        response
    }
}

/// `CatchPanicLayer` hook: render the panic payload as the generic 500 envelope.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<&str>() {
        Some((*message).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    };
    ApiError::server_error(detail).into_response()
}
