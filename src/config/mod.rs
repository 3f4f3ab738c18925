/// Database configuration and connection management
pub mod database;

/// Economy defaults and bot options loaded from config.toml
pub mod economy;

pub use economy::{AppConfig, BotConfig, EconomyDefaults, load_config, load_or_default};
