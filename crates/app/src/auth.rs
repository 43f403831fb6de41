//! Caller identity forwarded by the upstream authentication layer.
//!
//! Sign-in happens in front of this service. The proxy passes the verified
//! user in `x-user-id`, `x-user-email` and `x-user-name`; a request without
//! `x-user-id` is anonymous.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use edu_core::model::{Identity, UserId};
use services::ServiceError;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn identity_from(headers: &HeaderMap) -> Option<Identity> {
    let user_id = header(headers, USER_ID_HEADER)?;
    Some(Identity {
        user_id: UserId::new(user_id),
        email: header(headers, USER_EMAIL_HEADER),
        name: header(headers, USER_NAME_HEADER),
    })
}

/// A signed-in caller; rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for RequireIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from(&parts.headers)
            .map(RequireIdentity)
            .ok_or(AppError::Service(ServiceError::Unauthenticated))
    }
}

/// The caller if signed in.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(identity_from(&parts.headers)))
    }
}
