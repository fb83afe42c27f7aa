pub mod code_queries;
pub mod user_queries;
