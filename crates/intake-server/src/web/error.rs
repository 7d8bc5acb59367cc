//! JSON error responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use intake_core::IntakeError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub transient: bool,
}

/// Error returned by API handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    transient: bool,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            transient: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            transient: false,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
            transient: false,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
            transient: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(err: &IntakeError) -> StatusCode {
    if err.is_timeout() {
        return StatusCode::GATEWAY_TIMEOUT;
    }
    match err {
        IntakeError::InvalidInput(_) | IntakeError::EmptyTranscript | IntakeError::Json(_) => {
            StatusCode::BAD_REQUEST
        }
        IntakeError::UnknownTeam(_) | IntakeError::TemplateNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        IntakeError::Llm(_) | IntakeError::MalformedResponse { .. } | IntakeError::Transcription(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        Self {
            status: status_for(&err),
            transient: err.is_transient(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), error = %self.message, "Request failed");
        }
        let body = ErrorBody {
            error: self.message,
            transient: self.transient,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::LLMError;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let timeout = ApiError::from(IntakeError::from(LLMError::Timeout(Duration::from_secs(30))));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(timeout.transient);

        let unknown = ApiError::from(IntakeError::UnknownTeam("marketing".into()));
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert!(!unknown.transient);

        let malformed = ApiError::from(IntakeError::malformed("classify", "no json"));
        assert_eq!(malformed.status(), StatusCode::BAD_GATEWAY);

        let config = ApiError::from(IntakeError::Config("no key".into()));
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
