pub mod crud;
pub mod errors;
pub mod user;
