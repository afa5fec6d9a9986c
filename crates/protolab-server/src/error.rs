use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use protolab_harness::HarnessError;
use protolab_merge::MergeError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The request body is not JSON. Rejected before reaching the engine.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The request body is well-formed but nests deeper than the JSON
    /// parser accepts.
    #[error("payload depth exceeded: body nests deeper than {limit} levels")]
    PayloadTooDeep { limit: usize },

    /// The shared harness stayed busy past the request deadline.
    #[error("request timed out after {0} ms waiting for the harness")]
    Timeout(u64),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("harness error: {0}")]
    Harness(#[from] HarnessError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooDeep { .. } | Self::Merge(MergeError::DepthExceeded { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Merge(_)
            | Self::Harness(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
