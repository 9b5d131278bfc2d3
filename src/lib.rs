pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod model;
pub mod notify;
pub mod services;
pub mod storage;
pub mod types;

pub use app::{app, AppState};
