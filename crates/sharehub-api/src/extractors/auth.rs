//! `AuthUser` and `MaybeAuthUser` extractors: pull the bearer JWT from the
//! Authorization header and resolve it to a [`Principal`].

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use sharehub_auth::Principal;
use sharehub_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated user. Rejects the request without a valid bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The user ID from the token subject.
    pub user_id: Uuid,
}

impl AuthUser {
    /// The user as a principal.
    pub fn principal(&self) -> Principal {
        Principal::User(self.user_id)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_principal(parts, state)? {
            Principal::User(user_id) => Ok(Self { user_id }),
            Principal::Anonymous => {
                Err(AppError::unauthorized("Missing Authorization header").into())
            }
        }
    }
}

/// The caller's principal, anonymous when no Authorization header is sent.
///
/// A header that is present but invalid is still rejected, so a client
/// with an expired token learns about it instead of silently losing access.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Principal);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(bearer_principal(parts, state)?))
    }
}

fn bearer_principal(parts: &Parts, state: &AppState) -> Result<Principal, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(Principal::Anonymous);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

    let claims = state.jwt_decoder.decode(token.trim())?;
    Ok(Principal::User(claims.user_id()))
}
