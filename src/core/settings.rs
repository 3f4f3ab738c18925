//! Guild settings business logic - per-guild configuration and reward multipliers.
//!
//! Settings are read-mostly. A guild without a persisted row uses the defaults
//! from config.toml; the first admin change persists a full row.

use crate::{
    config::EconomyDefaults,
    entities::{
        GuildSettings, MultiplierTarget, RewardMultiplier, RoundingPolicy, guild_settings,
        reward_multiplier,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use tracing::debug;

const MINUTES_PER_DAY: i32 = 24 * 60;
const MAX_OFFSET_MINUTES: i32 = 14 * 60;
/// Longest allowed reward cooldown (one week).
pub const MAX_COOLDOWN_SECS: i64 = 7 * 24 * 60 * 60;

/// Finds the persisted settings row for a guild, if any.
pub async fn find_settings<C>(db: &C, guild_id: &str) -> Result<Option<guild_settings::Model>>
where
    C: ConnectionTrait,
{
    GuildSettings::find_by_id(guild_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the guild's settings, or `defaults` applied to the guild when none are saved.
pub async fn get_settings<C>(
    db: &C,
    guild_id: &str,
    defaults: &EconomyDefaults,
    now: DateTime<Utc>,
) -> Result<guild_settings::Model>
where
    C: ConnectionTrait,
{
    if let Some(settings) = find_settings(db, guild_id).await? {
        return Ok(settings);
    }
    debug!("No settings saved for guild {guild_id}; using defaults");
    Ok(defaults.to_settings(guild_id, now))
}

/// A partial settings update from an admin command. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    /// Display name of the activity currency
    pub topy_name: Option<String>,
    /// Display name of the premium currency
    pub ruby_name: Option<String>,
    /// Minimum message length for chat rewards
    pub text_min_length: Option<i32>,
    /// Chat reward cooldown in seconds
    pub text_cooldown_secs: Option<i64>,
    /// Chat reward roll lower bound
    pub text_min_reward: Option<i64>,
    /// Chat reward roll upper bound
    pub text_max_reward: Option<i64>,
    /// Chat reward daily cap
    pub text_daily_cap: Option<i64>,
    /// Voice reward cooldown in seconds
    pub voice_cooldown_secs: Option<i64>,
    /// Voice reward roll lower bound
    pub voice_min_reward: Option<i64>,
    /// Voice reward roll upper bound
    pub voice_max_reward: Option<i64>,
    /// Voice reward daily cap
    pub voice_daily_cap: Option<i64>,
    /// Hot time on/off
    pub hot_time_enabled: Option<bool>,
    /// Hot time start minute
    pub hot_time_start_minute: Option<i32>,
    /// Hot time end minute
    pub hot_time_end_minute: Option<i32>,
    /// Hot time multiplier
    pub hot_time_multiplier: Option<f64>,
    /// Rounding policy
    pub rounding: Option<RoundingPolicy>,
    /// Guild timezone offset from UTC in minutes
    pub utc_offset_minutes: Option<i32>,
    /// Transfer fee in basis points
    pub transfer_fee_bps: Option<i64>,
}

macro_rules! patch_fields {
    ($patch:ident, $model:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $model.$field = value;
            }
        )+
    };
}

impl SettingsPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Writes every provided field into `model`.
    pub fn apply_to(self, model: &mut guild_settings::Model) {
        patch_fields!(
            self,
            model,
            topy_name,
            ruby_name,
            text_min_length,
            text_cooldown_secs,
            text_min_reward,
            text_max_reward,
            text_daily_cap,
            voice_cooldown_secs,
            voice_min_reward,
            voice_max_reward,
            voice_daily_cap,
            hot_time_enabled,
            hot_time_start_minute,
            hot_time_end_minute,
            hot_time_multiplier,
            rounding,
            utc_offset_minutes,
            transfer_fee_bps,
        );
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
    }
}

fn validate_range(label: &str, min: i64, max: i64) -> Result<()> {
    if min < 0 {
        return Err(invalid(format!("{label} minimum reward cannot be negative")));
    }
    if min > max {
        return Err(invalid(format!(
            "{label} minimum reward ({min}) is larger than the maximum ({max})"
        )));
    }
    Ok(())
}

/// Validates a multiplier value (finite and not negative).
pub fn validate_multiplier(multiplier: f64) -> Result<()> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(invalid(format!(
            "Multiplier must be a non-negative number, got {multiplier}"
        )));
    }
    Ok(())
}

/// Checks that a full settings row is internally consistent.
pub fn validate_settings(settings: &guild_settings::Model) -> Result<()> {
    if settings.topy_name.trim().is_empty() || settings.ruby_name.trim().is_empty() {
        return Err(invalid("Currency names cannot be empty"));
    }
    if settings.text_min_length < 0 {
        return Err(invalid("Minimum message length cannot be negative"));
    }
    for cooldown in [settings.text_cooldown_secs, settings.voice_cooldown_secs] {
        if !(0..=MAX_COOLDOWN_SECS).contains(&cooldown) {
            return Err(invalid(format!(
                "Cooldown {cooldown}s is outside 0..={MAX_COOLDOWN_SECS} seconds"
            )));
        }
    }
    validate_range("Text", settings.text_min_reward, settings.text_max_reward)?;
    validate_range("Voice", settings.voice_min_reward, settings.voice_max_reward)?;
    if settings.text_daily_cap < 0 || settings.voice_daily_cap < 0 {
        return Err(invalid("Daily caps cannot be negative"));
    }
    for minute in [settings.hot_time_start_minute, settings.hot_time_end_minute] {
        if !(0..MINUTES_PER_DAY).contains(&minute) {
            return Err(invalid(format!(
                "Hot time minute {minute} is outside 0..{MINUTES_PER_DAY}"
            )));
        }
    }
    validate_multiplier(settings.hot_time_multiplier)?;
    if settings.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
        return Err(invalid(format!(
            "UTC offset {} minutes is out of range",
            settings.utc_offset_minutes
        )));
    }
    if !(0..=10_000).contains(&settings.transfer_fee_bps) {
        return Err(invalid("Transfer fee must be between 0 and 10000 basis points"));
    }
    Ok(())
}

/// Applies `patch` to the guild's current settings (or the defaults) and saves the result.
pub async fn update_settings<C>(
    db: &C,
    guild_id: &str,
    defaults: &EconomyDefaults,
    patch: SettingsPatch,
    now: DateTime<Utc>,
) -> Result<guild_settings::Model>
where
    C: ConnectionTrait,
{
    let existing = find_settings(db, guild_id).await?;
    let exists = existing.is_some();
    let mut settings = existing.unwrap_or_else(|| defaults.to_settings(guild_id, now));

    patch.apply_to(&mut settings);
    settings.updated_at = now;
    validate_settings(&settings)?;

    let active: guild_settings::ActiveModel = settings.into();
    let active = active.reset_all();
    let saved = if exists {
        active.update(db).await?
    } else {
        active.insert(db).await?
    };
    Ok(saved)
}

/// Sets (inserts or replaces) the multiplier for a channel or role.
pub async fn set_multiplier<C>(
    db: &C,
    guild_id: &str,
    target_kind: MultiplierTarget,
    target_id: &str,
    multiplier: f64,
) -> Result<reward_multiplier::Model>
where
    C: ConnectionTrait,
{
    validate_multiplier(multiplier)?;

    let existing = RewardMultiplier::find()
        .filter(reward_multiplier::Column::GuildId.eq(guild_id))
        .filter(reward_multiplier::Column::TargetKind.eq(target_kind))
        .filter(reward_multiplier::Column::TargetId.eq(target_id))
        .one(db)
        .await?;

    if let Some(row) = existing {
        let mut active: reward_multiplier::ActiveModel = row.into();
        active.multiplier = Set(multiplier);
        return active.update(db).await.map_err(Into::into);
    }

    reward_multiplier::ActiveModel {
        guild_id: Set(guild_id.to_string()),
        target_kind: Set(target_kind),
        target_id: Set(target_id.to_string()),
        multiplier: Set(multiplier),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Removes the multiplier for a channel or role. Returns whether one existed.
pub async fn remove_multiplier<C>(
    db: &C,
    guild_id: &str,
    target_kind: MultiplierTarget,
    target_id: &str,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = RewardMultiplier::delete_many()
        .filter(reward_multiplier::Column::GuildId.eq(guild_id))
        .filter(reward_multiplier::Column::TargetKind.eq(target_kind))
        .filter(reward_multiplier::Column::TargetId.eq(target_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Lists every multiplier configured for a guild, channels first.
pub async fn list_multipliers<C>(db: &C, guild_id: &str) -> Result<Vec<reward_multiplier::Model>>
where
    C: ConnectionTrait,
{
    RewardMultiplier::find()
        .filter(reward_multiplier::Column::GuildId.eq(guild_id))
        .order_by_asc(reward_multiplier::Column::TargetKind)
        .order_by_asc(reward_multiplier::Column::TargetId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Multipliers relevant to one activity: the channel's (if set) and those of the member's roles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityMultipliers {
    /// Multiplier configured for the channel
    pub channel: Option<f64>,
    /// Multipliers configured for any of the member's roles
    pub roles: Vec<f64>,
}

/// Looks up the multipliers that apply to a member acting in a channel.
pub async fn resolve_multipliers<C>(
    db: &C,
    guild_id: &str,
    channel_id: &str,
    role_ids: &[String],
) -> Result<ActivityMultipliers>
where
    C: ConnectionTrait,
{
    let mut targets = Condition::any().add(
        Condition::all()
            .add(reward_multiplier::Column::TargetKind.eq(MultiplierTarget::Channel))
            .add(reward_multiplier::Column::TargetId.eq(channel_id)),
    );
    if !role_ids.is_empty() {
        targets = targets.add(
            Condition::all()
                .add(reward_multiplier::Column::TargetKind.eq(MultiplierTarget::Role))
                .add(reward_multiplier::Column::TargetId.is_in(role_ids.iter().cloned())),
        );
    }

    let rows = RewardMultiplier::find()
        .filter(reward_multiplier::Column::GuildId.eq(guild_id))
        .filter(targets)
        .all(db)
        .await?;

    let mut resolved = ActivityMultipliers::default();
    for row in rows {
        match row.target_kind {
            MultiplierTarget::Channel => resolved.channel = Some(row.multiplier),
            MultiplierTarget::Role => resolved.roles.push(row.multiplier),
        }
    }
    Ok(resolved)
}
