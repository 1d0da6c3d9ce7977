//! Bearer-token guard for the admin routes.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::state::AppState;
use crate::error::{Error, Result};

/// Token of the session that made the request, set by [`require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

/// Extract the token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Reject requests without a live session.
///
/// # Errors
///
/// Returns [`Error::Unauthorized`] when the token is missing, unknown or
/// expired.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(request.headers())
        .map(str::to_string)
        .ok_or(Error::Unauthorized)?;

    if !state.sessions().validate(&token)? {
        debug!("Rejected admin request with unknown or expired token");
        return Err(Error::Unauthorized);
    }

    request.extensions_mut().insert(SessionToken(token));
    Ok(next.run(request).await)
}
