pub mod cache;
pub mod env;
