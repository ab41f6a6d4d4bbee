pub mod access;
pub mod errors;
pub mod models;
pub mod ports;
pub mod resource;
pub mod service;
pub mod session;
