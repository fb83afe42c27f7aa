pub mod cookies;
pub mod jwt;
pub mod password;
pub mod validation;
