use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::Result,
    models::{AuthResponse, VerifyEmailRequest},
    utils::{cookies, jwt, validation},
};

/// Consumes the code, marks the account verified, and signs the user in.
pub async fn verify_email(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    validation::validate_email(&payload.email)?;
    validation::validate_code(&payload.code)?;

    let user = state.flow.verify_email(&payload.email, &payload.code).await?;

    let token = jwt::sign_session(&state.auth, &user)?;
    let jar = jar.add(cookies::session_cookie(token, state.auth.secure_cookies));

    Ok((
        jar,
        Json(AuthResponse {
            ok: true,
            user: user.into(),
        }),
    ))
}
