use axum::{Json, extract::State};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{RegisterRequest, RegisterResponse},
    utils::validation,
};

pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    validate_registration(&payload)?;

    let user = state
        .flow
        .register(&payload.email, &payload.password, payload.name.as_deref())
        .await?;

    Ok(Json(RegisterResponse {
        ok: true,
        needs_verification: true,
        email: user.email,
        message: "Account created. Check your email for the verification code.".to_string(),
    }))
}

fn validate_registration(payload: &RegisterRequest) -> Result<()> {
    validation::validate_email(&payload.email)?;
    validation::validate_password(&payload.password)?;

    if let Some(name) = &payload.name {
        if name.trim().is_empty() || name.len() > 100 {
            return Err(AppError::BadRequest("Invalid name".to_string()));
        }
    }

    Ok(())
}
