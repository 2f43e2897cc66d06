//! Bearer-token guard for the back office routes.

use super::AppState;
use crate::{
    core::auth::{CurrentUser, JwtService},
    errors::Error,
};
use axum::{
    extract::{Request, State},
    http::{Method, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

/// Admits only requests carrying a valid admin token.
///
/// The authenticated [`CurrentUser`] is inserted into the request extensions.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(JwtService::extract_from_header);
    let Some(token) = token else {
        warn!(uri = ?req.uri(), "Missing bearer token");
        return Err(Error::Unauthorized);
    };

    let claims = state.jwt.validate_token(token).map_err(|e| {
        warn!(error = %e, uri = ?req.uri(), "Rejected access token");
        Error::Unauthorized
    })?;
    let user = CurrentUser::try_from(claims)?;

    if !user.is_admin() {
        warn!(user_id = user.id, uri = ?req.uri(), "Admin route refused");
        return Err(Error::Forbidden);
    }

    debug!(user_id = user.id, name = %user.name, "Admin authenticated");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
