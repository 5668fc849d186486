//! Mapping of pipeline errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ticketflow_core::PipelineError;
use tracing::error;

/// A pipeline error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
            // Internal details stay in the logs.
            return (status, status.canonical_reason().unwrap_or("Error").to_string())
                .into_response();
        }

        (status, self.0.to_string()).into_response()
    }
}

/// Plain-text error response.
pub fn reject(status: StatusCode, message: impl Into<String>) -> Response {
    (status, message.into()).into_response()
}
