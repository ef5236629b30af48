//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`ds_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on service calls.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::middleware::request_id::RequestId;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: ds_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: ds_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match &self.inner {
            ds_core::Error::NotFound { .. } => "not_found",
            ds_core::Error::Validation(_) => "validation_error",
            ds_core::Error::ExtractionFailed => "extraction_failed",
            ds_core::Error::Config(_) => "config_error",
            ds_core::Error::Registry(_) => "registry_error",
            ds_core::Error::Io { .. } => "io_error",
            ds_core::Error::Tool { .. } => "tool_error",
            ds_core::Error::Internal(_) => "internal_error",
        }
    }
}

impl From<ds_core::Error> for AppError {
    fn from(e: ds_core::Error) -> Self {
        Self::new(e)
    }
}

/// Attach the current request's id to a failed result.
pub trait WithRequestId<T> {
    fn for_request(self, id: &RequestId) -> Result<T, AppError>;
}

impl<T> WithRequestId<T> for ds_core::Result<T> {
    fn for_request(self, id: &RequestId) -> Result<T, AppError> {
        self.map_err(|e| AppError::new(e).with_request_id(id.0.clone()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.code(),
            "request_id": self.request_id,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn not_found_produces_404() {
        let err = AppError::new(ds_core::Error::not_found("device", "abc"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn extraction_failure_produces_400() {
        let err = AppError::new(ds_core::Error::ExtractionFailed);
        assert_eq!(err.code(), "extraction_failed");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn tool_error_produces_502() {
        let err = AppError::new(ds_core::Error::tool("ffmpeg", "crashed"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn body_carries_request_id() {
        let result: ds_core::Result<()> = Err(ds_core::Error::Validation("bad id".into()));
        let err = result
            .for_request(&RequestId("req-123".into()))
            .unwrap_err();
        let response = err.into_response();

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "validation_error");
        assert_eq!(body["request_id"], "req-123");
        assert_eq!(body["error"], "Validation error: bad id");
    }
}
