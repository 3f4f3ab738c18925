//! Application configuration loading from config.toml
//!
//! The `[economy]` table holds the settings every guild starts with until an
//! admin saves its own; the `[bot]` table holds process-level options. Every
//! key is optional and falls back to the built-in default.

use crate::{
    core::settings::validate_settings,
    entities::{RoundingPolicy, guild_settings},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default guild economy settings
    pub economy: EconomyDefaults,
    /// Bot process options
    pub bot: BotConfig,
}

/// Bot process options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Seconds between voice-presence sweeps
    pub voice_sweep_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            voice_sweep_secs: 60,
        }
    }
}

/// Economy settings used for guilds without a persisted settings row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EconomyDefaults {
    /// Display name of the activity currency
    pub topy_name: String,
    /// Display name of the premium currency
    pub ruby_name: String,
    /// Minimum message length for a chat reward
    pub text_min_length: i32,
    /// Seconds between chat rewards
    pub text_cooldown_secs: i64,
    /// Lower bound of the chat reward roll
    pub text_min_reward: i64,
    /// Upper bound of the chat reward roll
    pub text_max_reward: i64,
    /// Chat reward cap per guild-local day
    pub text_daily_cap: i64,
    /// Seconds between voice rewards
    pub voice_cooldown_secs: i64,
    /// Lower bound of the voice reward roll
    pub voice_min_reward: i64,
    /// Upper bound of the voice reward roll
    pub voice_max_reward: i64,
    /// Voice reward cap per guild-local day
    pub voice_daily_cap: i64,
    /// Whether hot time is enabled
    pub hot_time_enabled: bool,
    /// Hot time start, minutes after local midnight
    pub hot_time_start_minute: i32,
    /// Hot time end (exclusive), minutes after local midnight
    pub hot_time_end_minute: i32,
    /// Multiplier during hot time
    pub hot_time_multiplier: f64,
    /// Rounding policy after multipliers
    pub rounding: RoundingPolicy,
    /// Guild timezone offset from UTC in minutes
    pub utc_offset_minutes: i32,
    /// Transfer fee in basis points
    pub transfer_fee_bps: i64,
}

impl Default for EconomyDefaults {
    fn default() -> Self {
        Self {
            topy_name: "Topy".to_string(),
            ruby_name: "Ruby".to_string(),
            text_min_length: 15,
            text_cooldown_secs: 30,
            text_min_reward: 1,
            text_max_reward: 5,
            text_daily_cap: 300,
            voice_cooldown_secs: 60,
            voice_min_reward: 2,
            voice_max_reward: 4,
            voice_daily_cap: 500,
            hot_time_enabled: false,
            hot_time_start_minute: 20 * 60,
            hot_time_end_minute: 23 * 60,
            hot_time_multiplier: 2.0,
            rounding: RoundingPolicy::Floor,
            utc_offset_minutes: 9 * 60,
            transfer_fee_bps: 500,
        }
    }
}

impl EconomyDefaults {
    /// Applies the same checks admin settings changes go through.
    pub fn validate(&self) -> Result<()> {
        validate_settings(&self.to_settings("defaults", Utc::now())).map_err(|e| match e {
            Error::Config { message } => Error::Config {
                message: format!("Invalid [economy] defaults: {message}"),
            },
            other => other,
        })
    }

    /// Builds an unsaved settings model for `guild_id` from these defaults.
    #[must_use]
    pub fn to_settings(&self, guild_id: &str, now: DateTime<Utc>) -> guild_settings::Model {
        guild_settings::Model {
            guild_id: guild_id.to_string(),
            topy_name: self.topy_name.clone(),
            ruby_name: self.ruby_name.clone(),
            text_min_length: self.text_min_length,
            text_cooldown_secs: self.text_cooldown_secs,
            text_min_reward: self.text_min_reward,
            text_max_reward: self.text_max_reward,
            text_daily_cap: self.text_daily_cap,
            voice_cooldown_secs: self.voice_cooldown_secs,
            voice_min_reward: self.voice_min_reward,
            voice_max_reward: self.voice_max_reward,
            voice_daily_cap: self.voice_daily_cap,
            hot_time_enabled: self.hot_time_enabled,
            hot_time_start_minute: self.hot_time_start_minute,
            hot_time_end_minute: self.hot_time_end_minute,
            hot_time_multiplier: self.hot_time_multiplier,
            rounding: self.rounding,
            utc_offset_minutes: self.utc_offset_minutes,
            transfer_fee_bps: self.transfer_fee_bps,
            updated_at: now,
        }
    }
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid or a value has the wrong type
/// - The `[economy]` defaults fail settings validation
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {}", path_ref.display());
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })?;
    config.economy.validate()?;
    Ok(config)
}

/// Loads config.toml from `path`, or the built-in defaults if the file does not exist.
///
/// A file that exists but cannot be parsed is still an error.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        load_config(path_ref)
    } else {
        warn!(
            "No config file at {}; using built-in economy defaults",
            path_ref.display()
        );
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            [economy]
            topy_name = "Coins"
            text_daily_cap = 50
            rounding = "ceil"
            hot_time_multiplier = 1.5

            [bot]
            voice_sweep_secs = 30
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.economy.topy_name, "Coins");
        assert_eq!(config.economy.text_daily_cap, 50);
        assert_eq!(config.economy.rounding, RoundingPolicy::Ceil);
        assert_eq!(config.economy.hot_time_multiplier, 1.5);
        // Unspecified keys keep their defaults
        assert_eq!(config.economy.ruby_name, "Ruby");
        assert_eq!(config.economy.text_min_length, 15);
        assert_eq!(config.bot.voice_sweep_secs, 30);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.economy, EconomyDefaults::default());
        assert_eq!(config.bot.voice_sweep_secs, 60);
    }

    #[test]
    fn test_invalid_rounding_is_rejected() {
        let result: std::result::Result<AppConfig, _> =
            toml::from_str("[economy]\nrounding = \"sideways\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = load_or_default("definitely/not/here/config.toml").unwrap();
        assert_eq!(config.economy, EconomyDefaults::default());
    }

    #[test]
    fn test_load_config_missing_file_is_error() {
        let result = load_config("definitely/not/here/config.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_builtin_defaults_are_valid() {
        assert!(EconomyDefaults::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_defaults_are_rejected() {
        let config: AppConfig =
            toml::from_str("[economy]\ntext_cooldown_secs = 9223372036854775807\n").unwrap();
        let result = config.economy.validate();
        assert!(matches!(
            result,
            Err(Error::Config { message }) if message.contains("[economy]")
        ));
    }

    #[test]
    fn test_to_settings_copies_defaults() {
        let defaults = EconomyDefaults::default();
        let now = Utc::now();
        let settings = defaults.to_settings("guild-1", now);
        assert_eq!(settings.guild_id, "guild-1");
        assert_eq!(settings.text_cooldown_secs, defaults.text_cooldown_secs);
        assert_eq!(settings.rounding, RoundingPolicy::Floor);
        assert_eq!(settings.updated_at, now);
    }
}
