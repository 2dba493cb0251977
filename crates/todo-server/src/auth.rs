//! Caller identity from the session provider's headers
//!
//! The session provider in front of the server authenticates the user and
//! forwards who they are in plain headers. Requests without a user id are
//! rejected with 401.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use todo_core::store::http::{
    SESSION_ID_HEADER, USER_ID_HEADER, USER_NAME_HEADER, USER_ROLES_HEADER,
};
use todo_core::{Identity, Role};

use crate::error::ApiError;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build the caller's identity. The display name falls back to the id and
/// unknown role names are ignored.
pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let id = header(headers, USER_ID_HEADER)?;
    let name = header(headers, USER_NAME_HEADER).unwrap_or(id);

    let roles = header(headers, USER_ROLES_HEADER)
        .into_iter()
        .flat_map(|roles| roles.split(','))
        .filter_map(|role| Role::parse(role.trim()));

    Some(roles.fold(Identity::new(id, name), Identity::with_role))
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers)
            .map(CurrentUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Key of the caller's fallback board: the session id header when present,
/// else the user id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey(pub String);

impl<S> FromRequestParts<S> for SessionKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        let key = header(&parts.headers, SESSION_ID_HEADER)
            .map(str::to_string)
            .unwrap_or(user.id);
        Ok(SessionKey(key))
    }
}
