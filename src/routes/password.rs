use axum::{Json, extract::State};

use crate::{
    AppState,
    error::Result,
    models::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest},
    services::auth_flow::GENERIC_CODE_MESSAGE,
    utils::validation,
};

/// Always answers with the same generic message so the endpoint cannot be
/// used to probe for registered emails.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    validation::validate_email(&payload.email)?;

    state.flow.forgot_password(&payload.email).await?;

    Ok(Json(MessageResponse {
        ok: true,
        message: GENERIC_CODE_MESSAGE.to_string(),
    }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    validation::validate_email(&payload.email)?;
    validation::validate_code(&payload.code)?;
    validation::validate_password(&payload.password)?;

    state
        .flow
        .reset_password(&payload.email, &payload.code, &payload.password)
        .await?;

    Ok(Json(MessageResponse {
        ok: true,
        message: "Your password has been reset. You can now sign in with your new password."
            .to_string(),
    }))
}
