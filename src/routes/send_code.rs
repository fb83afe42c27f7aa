use axum::{Json, extract::State};

use crate::{
    AppState,
    error::Result,
    models::{CodePurpose, MessageResponse, SendCodeRequest},
    services::auth_flow::GENERIC_CODE_MESSAGE,
    utils::validation,
};

pub async fn send_verification_code(
    State(state): State<AppState>,
    Json(payload): Json<SendCodeRequest>,
) -> Result<Json<MessageResponse>> {
    validation::validate_email(&payload.email)?;

    state.flow.send_code(&payload.email, payload.purpose).await?;

    let message = match payload.purpose {
        // Never confirms whether the account exists.
        CodePurpose::PasswordReset => GENERIC_CODE_MESSAGE.to_string(),
        CodePurpose::EmailVerification => {
            "Verification code sent. Check your email.".to_string()
        }
    };

    Ok(Json(MessageResponse { ok: true, message }))
}
