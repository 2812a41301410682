//! Caller identity.
//!
//! Authentication happens upstream; the gateway in front of this service
//! forwards the verified user id in the `x-user-id` header.

use super::error::ApiError;
use crate::domain::ids::UserId;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub const CALLER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| ApiError::unauthenticated(format!("missing {CALLER_HEADER} header")))?
            .to_str()
            .map_err(|_| ApiError::unauthenticated(format!("invalid {CALLER_HEADER} header")))?;
        let id = raw
            .parse()
            .map_err(|_| ApiError::unauthenticated(format!("invalid {CALLER_HEADER} header")))?;
        Ok(Caller(id))
    }
}
