use axum::{Extension, Json, extract::State};

use crate::{AppState, error::Result, models::AuthResponse, utils::jwt::SessionClaims};

pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<AuthResponse>> {
    let user = state.flow.current_user(&claims.email).await?;

    Ok(Json(AuthResponse {
        ok: true,
        user: user.into(),
    }))
}
