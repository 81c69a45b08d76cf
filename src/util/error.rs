//! Domain errors and classification of `anyhow` errors for callers.
use anyhow::Error;
use sqlx::Error as SqlxError;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the curation core itself. They travel inside
/// `anyhow::Error` and are recovered with [`classify_error`].
#[derive(Debug, Error)]
pub enum CurationError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("{entity} {id} is not owned by the caller")]
    Forbidden { entity: &'static str, id: Uuid },
    #[error("validation failed: {0}")]
    Validation(String),
}

impl CurationError {
    pub(crate) fn content_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "content",
            id,
        }
    }

    pub(crate) fn rule_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "rule", id }
    }

    pub(crate) fn template_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "template",
            id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Invalid,
    /// Transient store or network failure.
    Retryable,
    Fatal,
}

#[must_use]
pub fn classify_error(error: &Error) -> ErrorKind {
    if let Some(curation_err) = error.downcast_ref::<CurationError>() {
        return match curation_err {
            CurationError::NotFound { .. } => ErrorKind::NotFound,
            CurationError::Forbidden { .. } => ErrorKind::Forbidden,
            CurationError::Validation(_) => ErrorKind::Invalid,
        };
    }

    if let Some(reqwest_err) = error.downcast_ref::<reqwest::Error>() {
        if reqwest_err.is_timeout() || reqwest_err.is_connect() {
            return ErrorKind::Retryable;
        }
    }

    if let Some(sqlx_err) = error.downcast_ref::<SqlxError>() {
        match sqlx_err {
            SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
                return ErrorKind::Retryable;
            }
            SqlxError::RowNotFound => return ErrorKind::NotFound,
            SqlxError::Configuration(_) => return ErrorKind::Fatal,
            _ => {}
        }
    }

    ErrorKind::Fatal
}

#[must_use]
pub fn is_not_found(error: &Error) -> bool {
    matches!(classify_error(error), ErrorKind::NotFound)
}
