//! # convo-common
//!
//! Shared utilities for the conversation server: configuration, the
//! application error type, JWT authentication, and tracing setup.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

pub use auth::{Claims, JwtService};
pub use config::{
    AppConfig, AppSettings, ChatConfig, DatabaseConfig, Environment, JwtConfig, PresenceConfig,
    ServerConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{init_tracing, try_init_tracing, TracingConfig};
