pub mod error;
pub mod middleware;

pub use error::AuthError;
pub use middleware::{API_KEY_HEADER, ApiKey};
