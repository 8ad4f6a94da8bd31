//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes: the access gate that
//! resolves the session cookie to a caller identity and role.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use portal_core::ports::PortError;
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Pulls the session id out of a Cookie header value.
pub fn session_id_from_cookies(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|c| {
        c.trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

/// Middleware that validates the session cookie and extracts the caller.
///
/// If valid, inserts the resolved `Caller` (id + role) into request
/// extensions for handlers to use. If invalid, missing, or expired,
/// answers 401 through the uniform envelope.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Port(PortError::Unauthorized))?;

    let session_id = session_id_from_cookies(cookie_header)
        .ok_or(ApiError::Port(PortError::Unauthorized))?;

    let caller = state.identities.resolve_session(session_id).await?;

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_found_among_other_cookies() {
        assert_eq!(
            session_id_from_cookies("theme=dark; session=abc123; lang=en"),
            Some("abc123")
        );
        assert_eq!(session_id_from_cookies("theme=dark"), None);
        // A cookie whose name merely starts with ours does not match.
        assert_eq!(session_id_from_cookies("session_hint=x"), None);
    }
}
