pub mod auth_flow;
pub mod email_service;
