use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use crate::{
    config::{AppConfig, AuthConfig},
    database,
    error::Result,
    routes,
    services::{
        auth_flow::{AdminPolicy, AuthFlow},
        email_service::SesSender,
    },
    stores::{PgCodeStore, PgCredentialStore},
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub flow: AuthFlow,
    pub auth: AuthConfig,
}

pub async fn build(config: &AppConfig) -> Result<Router> {
    let pool = database::create_pool(&config.database).await?;
    let ses_client = crate::config::load_ses_client().await?;

    let flow = AuthFlow::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgCodeStore::new(pool.clone())),
        Arc::new(SesSender::new(ses_client, &config.mail)),
        AdminPolicy::new(config.auth.admin_emails.clone()),
    );

    let state = AppState {
        db: pool,
        flow,
        auth: config.auth.clone(),
    };

    let allowed_origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|_| {
                crate::error::AppError::ConfigError(format!("Invalid CORS origin: {}", origin))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_origin(allowed_origins)
        .allow_credentials(true);

    let app = routes::create_router(state.clone())
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(cors)
        .with_state(state);

    Ok(app)
}
