use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventhub_core::errors::{DatabaseError, Error as CoreError, UpstreamError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    code: u16,
    error: String,
}

fn core_status(err: &CoreError) -> StatusCode {
    if err.is_not_found() {
        return StatusCode::NOT_FOUND;
    }
    match err {
        CoreError::Validation(_) | CoreError::Wallet(_) => StatusCode::BAD_REQUEST,
        CoreError::Ticket(_)
        | CoreError::Upstream(UpstreamError::AlreadyRedeemed)
        | CoreError::Upstream(UpstreamError::NotRedeemed)
        | CoreError::Database(DatabaseError::UniqueViolation(_)) => StatusCode::CONFLICT,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => core_status(e),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Core(CoreError::Upstream(UpstreamError::Http { message, .. })) => {
                message.clone()
            }
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }
        let body = Json(ErrorBody {
            status: "error",
            code: status.as_u16(),
            error: message,
        });
        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
