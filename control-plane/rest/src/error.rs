//! Translates the engine's internal [`SvcError`] into the wire-facing
//! `{error: string}` JSON body and HTTP status (§7), the same split the
//! teacher keeps between `SvcError` and its own `ReplyError`.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use stor_port::{ErrorCategory, SvcError};
use std::fmt;

#[derive(Debug)]
pub struct ApiError(pub SvcError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SvcError> for ApiError {
    fn from(err: SvcError) -> Self {
        ApiError(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0.category() {
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Conflict
            | ErrorCategory::InvalidArgument
            | ErrorCategory::CapacityExceeded
            | ErrorCategory::Precondition => StatusCode::BAD_REQUEST,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.0.category() == ErrorCategory::Internal {
            tracing::error!(error = %self.0, "internal error");
        } else if !matches!(self.0.category(), ErrorCategory::NotFound) {
            tracing::warn!(error = %self.0, "request rejected");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.0.to_string() }))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
