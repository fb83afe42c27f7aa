use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::AppError,
    utils::{cookies::SESSION_COOKIE_NAME, jwt},
};

/// Validates the session cookie and makes its claims available to the
/// handler via request extensions.
pub async fn session_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let claims = jwt::verify_session(&state.auth, &token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
