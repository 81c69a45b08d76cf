use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::util::error::{CurationError, ErrorKind, classify_error};

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Handler error carrying any `anyhow` failure; the status comes from its kind.
#[derive(Debug)]
pub(crate) struct ApiError(anyhow::Error);

impl ApiError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self(CurationError::Validation(message.into()).into())
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Self(error.into())
    }
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Invalid => StatusCode::BAD_REQUEST,
        ErrorKind::Retryable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(classify_error(&self.0));
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %format!("{:#}", self.0), "request failed");
            return error_response(status, "internal error");
        }
        // only the domain error is shown, not the context chain
        let message = self
            .0
            .downcast_ref::<CurationError>()
            .map_or_else(|| self.0.to_string(), ToString::to_string);
        error_response(status, message)
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use uuid::Uuid;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        let id = Uuid::new_v4();
        let not_found = Err::<(), _>(CurationError::rule_not_found(id))
            .context("failed to execute rule")
            .expect_err("error");
        let response = ApiError::from(not_found).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::invalid("content_ids must not be empty").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_errors_are_internal() {
        let response = ApiError::from(anyhow::anyhow!("db exploded")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
