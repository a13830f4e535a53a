//! Configuration loading

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ChatConfig, ConfigError, DatabaseConfig, Environment, JwtConfig,
    PresenceConfig, ServerConfig,
};
