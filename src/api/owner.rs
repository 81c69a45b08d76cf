use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::error::error_response;

pub(crate) const OWNER_HEADER: &str = "x-owner-id";

/// Caller identity, set by the upstream gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OwnerId(pub(crate) Uuid);

pub(crate) struct OwnerRejection(&'static str);

impl IntoResponse for OwnerRejection {
    fn into_response(self) -> Response {
        error_response(StatusCode::UNAUTHORIZED, self.0)
    }
}

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = OwnerRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or(OwnerRejection("missing x-owner-id header"))?
            .to_str()
            .map_err(|_| OwnerRejection("x-owner-id header is not valid ASCII"))?;
        Uuid::parse_str(raw.trim())
            .map(OwnerId)
            .map_err(|_| OwnerRejection("x-owner-id header is not a UUID"))
    }
}
