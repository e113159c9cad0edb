use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::practice::PracticeError;

/// Error body returned by every HTTP route: a stable code plus a short message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Practice(PracticeError),
    BadRequest { code: &'static str, message: String },
    NotFound { code: &'static str, message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Practice(err) => match err {
                PracticeError::SongNotFound(_) | PracticeError::SessionNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                PracticeError::EmptySong(_) => StatusCode::UNPROCESSABLE_ENTITY,
                PracticeError::OutOfRange { .. } | PracticeError::ProtocolViolation { .. } => {
                    StatusCode::CONFLICT
                }
                PracticeError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Practice(PracticeError::InvalidConfig(_)) => ErrorBody {
                code: "INVALID_CONFIG".into(),
                message: "service is misconfigured".into(),
            },
            ApiError::Practice(err) => ErrorBody {
                code: err.code().into(),
                message: err.to_string(),
            },
            ApiError::BadRequest { code, message } | ApiError::NotFound { code, message } => {
                ErrorBody {
                    code: (*code).into(),
                    message: message.clone(),
                }
            }
        }
    }
}

impl From<PracticeError> for ApiError {
    fn from(err: PracticeError) -> Self {
        ApiError::Practice(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(target: "transport", error = ?self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
