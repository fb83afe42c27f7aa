use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Value, json};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{AuthResponse, LoginRequest},
    utils::{cookies, jwt, validation},
};

pub async fn login_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    validation::validate_email(&payload.email)?;
    if payload.password.is_empty() {
        return Err(AppError::BadRequest("Invalid payload".to_string()));
    }

    let user = state.flow.login(&payload.email, &payload.password).await?;

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

pub async fn logout_user(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    let jar = jar.add(cookies::clear_session_cookie(state.auth.secure_cookies));
    (jar, Json(json!({ "ok": true })))
}
