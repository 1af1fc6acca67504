//! HTTP mapping of control-plane errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use control_plane::ControlError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub errors: Vec<ErrorItem>,
}

#[derive(Debug, Serialize)]
pub struct ErrorItem {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Control(e) => match e {
                ControlError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ControlError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                ControlError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                e if e.is_transient() => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }

        let body = ErrorBody {
            errors: vec![ErrorItem {
                code,
                message: self.to_string(),
            }],
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ControlError) -> StatusCode {
        ApiError::from(err).status().0
    }

    #[test]
    fn control_errors_map_to_http_statuses() {
        assert_eq!(status_of(ControlError::NotFound("job".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ControlError::Conflict("row".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(ControlError::InvalidInput("cron".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(ControlError::Redis("connection refused".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ControlError::InvariantViolation("task without execution".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_of(ControlError::NoJobRemoved), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bad_request_is_400() {
        let (status, code) = ApiError::BadRequest("unknown action".into()).status();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "BAD_REQUEST");
    }
}
