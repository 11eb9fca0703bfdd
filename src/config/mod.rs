/// Application configuration loaded from `config.toml` and the environment
pub mod app;

/// Database URL resolution and table creation
pub mod database;

pub use app::{AppConfig, load_config, load_default_config};
