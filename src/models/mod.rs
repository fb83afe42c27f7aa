mod user;
mod verification;

pub use user::*;
pub use verification::*;
