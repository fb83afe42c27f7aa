mod health;
mod login;
mod me;
mod password;
mod register;
mod send_code;
mod verify_email;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/api/auth/register", post(register::register_user))
        .route("/api/auth/login", post(login::login_user))
        .route("/api/auth/logout", post(login::logout_user))
        .route("/api/auth/send-code", post(send_code::send_verification_code))
        .route("/api/auth/verify-email", post(verify_email::verify_email))
        .route("/api/auth/forgot-password", post(password::forgot_password))
        .route("/api/auth/reset-password", post(password::reset_password))
        .route(
            "/api/auth/me",
            get(me::current_user).route_layer(middleware::from_fn_with_state(
                state,
                crate::middleware::session_auth,
            )),
        )
}
