//! Guild settings entity - per-guild economy configuration.
//!
//! Guilds without a row use the defaults from `config.toml`.

use super::sea_orm_active_enums::RoundingPolicy;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guild settings database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guild_settings")]
pub struct Model {
    /// Discord guild ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: String,
    /// Display name of the activity currency
    pub topy_name: String,
    /// Display name of the premium currency
    pub ruby_name: String,
    /// Minimum message length (characters) for a chat reward
    pub text_min_length: i32,
    /// Seconds between chat rewards for one wallet
    pub text_cooldown_secs: i64,
    /// Lower bound of the chat reward roll
    pub text_min_reward: i64,
    /// Upper bound of the chat reward roll
    pub text_max_reward: i64,
    /// Maximum chat rewards per guild-local day
    pub text_daily_cap: i64,
    /// Seconds between voice rewards for one wallet
    pub voice_cooldown_secs: i64,
    /// Lower bound of the voice reward roll
    pub voice_min_reward: i64,
    /// Upper bound of the voice reward roll
    pub voice_max_reward: i64,
    /// Maximum voice rewards per guild-local day
    pub voice_daily_cap: i64,
    /// Whether the hot-time window is active at all
    pub hot_time_enabled: bool,
    /// Window start, minutes after guild-local midnight
    pub hot_time_start_minute: i32,
    /// Window end (exclusive), minutes after guild-local midnight
    pub hot_time_end_minute: i32,
    /// Multiplier applied inside the window
    pub hot_time_multiplier: f64,
    /// Rounding applied after multipliers
    pub rounding: RoundingPolicy,
    /// Guild timezone as an offset from UTC
    pub utc_offset_minutes: i32,
    /// Transfer fee in basis points of the transferred amount
    pub transfer_fee_bps: i64,
    /// When the settings were last modified
    pub updated_at: DateTimeUtc,
}

/// Settings have no relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
