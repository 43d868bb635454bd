//! Mind map HTTP server library: router, handlers and service wiring.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;


pub use app::{build_state, router};
pub use config::{Config, ConfigError};
pub use state::AppState;
