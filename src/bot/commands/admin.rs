//! Admin economy commands - `/economy <subcommand>`.
//!
//! Every subcommand requires the Manage Server permission. Settings changes go
//! through [`crate::core::SettingsPatch`] so omitted options keep their current
//! value; invalid combinations are rejected by the service and reported back.

use crate::entities::{MultiplierTarget, RoundingPolicy, guild_settings};
use std::fmt::Write;

/// Rounding picker for slash command options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum RoundingChoice {
    /// Round down
    #[name = "floor"]
    Floor,
    /// Round half away from zero
    #[name = "round"]
    Round,
    /// Round up
    #[name = "ceil"]
    Ceil,
}

impl From<RoundingChoice> for RoundingPolicy {
    fn from(choice: RoundingChoice) -> Self {
        match choice {
            RoundingChoice::Floor => Self::Floor,
            RoundingChoice::Round => Self::Round,
            RoundingChoice::Ceil => Self::Ceil,
        }
    }
}

/// Parses a `HH:MM` time of day into minutes after midnight.
#[must_use]
pub fn parse_time_of_day(input: &str) -> Option<i32> {
    let (hours, minutes) = input.trim().split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    ((0..24).contains(&hours) && (0..60).contains(&minutes)).then_some(hours * 60 + minutes)
}

/// Formats minutes after midnight as `HH:MM`.
#[must_use]
pub fn format_minute(minute: i32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Picks the multiplier target from the two optional command arguments. Exactly one must be set.
#[must_use]
pub fn pick_target(
    channel_id: Option<String>,
    role_id: Option<String>,
) -> Option<(MultiplierTarget, String)> {
    match (channel_id, role_id) {
        (Some(channel), None) => Some((MultiplierTarget::Channel, channel)),
        (None, Some(role)) => Some((MultiplierTarget::Role, role)),
        _ => None,
    }
}

/// Discord mention for a multiplier target.
#[must_use]
pub fn target_mention(kind: MultiplierTarget, id: &str) -> String {
    match kind {
        MultiplierTarget::Channel => format!("<#{id}>"),
        MultiplierTarget::Role => format!("<@&{id}>"),
    }
}

/// Renders guild settings for `/economy settings`.
pub fn describe_settings(settings: &guild_settings::Model) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(
        out,
        "**Currencies:** {} (activity), {} (premium)",
        settings.topy_name, settings.ruby_name
    )?;
    writeln!(
        out,
        "**Chat rewards:** {}-{} per message of {}+ characters, every {}s, daily cap {}",
        settings.text_min_reward,
        settings.text_max_reward,
        settings.text_min_length,
        settings.text_cooldown_secs,
        settings.text_daily_cap
    )?;
    writeln!(
        out,
        "**Voice rewards:** {}-{} every {}s, daily cap {}",
        settings.voice_min_reward,
        settings.voice_max_reward,
        settings.voice_cooldown_secs,
        settings.voice_daily_cap
    )?;
    writeln!(
        out,
        "**Hot time:** {} {}-{} ×{}",
        if settings.hot_time_enabled { "on" } else { "off" },
        format_minute(settings.hot_time_start_minute),
        format_minute(settings.hot_time_end_minute),
        settings.hot_time_multiplier
    )?;
    writeln!(
        out,
        "**Rounding:** {:?} · **UTC offset:** {} min · **Transfer fee:** {} bps",
        settings.rounding, settings.utc_offset_minutes, settings.transfer_fee_bps
    )?;
    Ok(out)
}

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::{RoundingChoice, describe_settings, parse_time_of_day, pick_target, target_mention};
    use crate::{
        bot::{
            BotData,
            commands::{CurrencyChoice, currency_name},
        },
        core::{SettingsPatch, currency::ACTIVITY_CURRENCY},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;
    use tracing::info;

    /// Saves a settings patch and reports the result.
    async fn save_patch(
        ctx: poise::Context<'_, BotData, Error>,
        guild_id: &str,
        patch: SettingsPatch,
    ) -> Result<()> {
        if patch.is_empty() {
            ctx.say("ℹ️ Nothing to change. Pass at least one option.")
                .await?;
            return Ok(());
        }
        match ctx.data().currency.update_settings(guild_id, patch).await {
            Ok(saved) => {
                info!(admin = %ctx.author().id, "Economy settings changed");
                ctx.say(format!("✅ Settings updated.\n{}", describe_settings(&saved)?))
                    .await?;
            }
            Err(Error::Config { message }) => {
                ctx.say(format!("❌ {message}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Economy administration.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        default_member_permissions = "MANAGE_GUILD",
        required_permissions = "MANAGE_GUILD",
        subcommands(
            "adjust",
            "settings",
            "general",
            "text_reward",
            "voice_reward",
            "hot_time",
            "multiplier_set",
            "multiplier_remove",
            "multipliers"
        ),
        subcommand_required
    )]
    #[allow(clippy::unused_async)]
    pub async fn economy(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Adds (positive) or removes (negative) currency from a member.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn adjust(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to adjust"] user: serenity::User,
        #[description = "Amount to add (negative to remove)"] amount: i64,
        #[description = "Currency (default: activity currency)"] currency: Option<CurrencyChoice>,
        #[description = "Reason shown in the member's history"] note: Option<String>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let guild_id = guild_id.to_string();
        let currency = currency.map_or(ACTIVITY_CURRENCY, Into::into);
        let service = &ctx.data().currency;

        let settings = service.get_settings(&guild_id).await?;
        let name = currency_name(&settings, currency);

        let result = service
            .admin_adjust(
                &guild_id,
                &user.id.to_string(),
                currency,
                amount,
                note.as_deref(),
            )
            .await;

        match result {
            Ok(wallet) => {
                info!(admin = %ctx.author().id, target = %user.id, amount, "Admin adjusted balance");
                ctx.say(format!(
                    "✅ Adjusted <@{}> by **{amount:+}** {name}. New balance: **{}** {name}",
                    user.id, wallet.balance
                ))
                .await?;
            }
            Err(Error::InsufficientFunds { current, .. }) => {
                ctx.say(format!(
                    "❌ <@{}> only has {current} {name}; balances can't go below zero.",
                    user.id
                ))
                .await?;
            }
            Err(Error::InvalidAmount { .. }) => {
                ctx.say("❌ Amount must not be zero.").await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Shows the current economy settings.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn settings(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let settings = ctx.data().currency.get_settings(&guild_id.to_string()).await?;
        ctx.say(format!("⚙️ **Economy settings**\n{}", describe_settings(&settings)?))
            .await?;
        Ok(())
    }

    /// Changes currency names, timezone, rounding and transfer fee.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn general(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Display name of the activity currency"] topy_name: Option<String>,
        #[description = "Display name of the premium currency"] ruby_name: Option<String>,
        #[description = "Server timezone offset from UTC in minutes (e.g. 540)"]
        utc_offset_minutes: Option<i32>,
        #[description = "How multiplied rewards are rounded"] rounding: Option<RoundingChoice>,
        #[description = "Transfer fee in basis points (100 = 1%)"] transfer_fee_bps: Option<i64>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let patch = SettingsPatch {
            topy_name,
            ruby_name,
            utc_offset_minutes,
            rounding: rounding.map(Into::into),
            transfer_fee_bps,
            ..Default::default()
        };
        save_patch(ctx, &guild_id.to_string(), patch).await
    }

    /// Changes chat reward rules.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn text_reward(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Minimum message length in characters"] min_length: Option<i32>,
        #[description = "Seconds between rewards"] cooldown_secs: Option<i64>,
        #[description = "Smallest reward"] min_reward: Option<i64>,
        #[description = "Largest reward"] max_reward: Option<i64>,
        #[description = "Daily cap (0 disables chat rewards)"] daily_cap: Option<i64>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let patch = SettingsPatch {
            text_min_length: min_length,
            text_cooldown_secs: cooldown_secs,
            text_min_reward: min_reward,
            text_max_reward: max_reward,
            text_daily_cap: daily_cap,
            ..Default::default()
        };
        save_patch(ctx, &guild_id.to_string(), patch).await
    }

    /// Changes voice reward rules.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn voice_reward(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Seconds between rewards"] cooldown_secs: Option<i64>,
        #[description = "Smallest reward"] min_reward: Option<i64>,
        #[description = "Largest reward"] max_reward: Option<i64>,
        #[description = "Daily cap (0 disables voice rewards)"] daily_cap: Option<i64>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let patch = SettingsPatch {
            voice_cooldown_secs: cooldown_secs,
            voice_min_reward: min_reward,
            voice_max_reward: max_reward,
            voice_daily_cap: daily_cap,
            ..Default::default()
        };
        save_patch(ctx, &guild_id.to_string(), patch).await
    }

    /// Configures the hot-time window (server local time).
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn hot_time(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Turn hot time on or off"] enabled: Option<bool>,
        #[description = "Start time, HH:MM"] start: Option<String>,
        #[description = "End time, HH:MM (exclusive)"] end: Option<String>,
        #[description = "Reward multiplier during hot time"] multiplier: Option<f64>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };

        let mut parsed = [None, None];
        for (slot, input) in parsed.iter_mut().zip([&start, &end]) {
            if let Some(input) = input {
                let Some(minute) = parse_time_of_day(input) else {
                    ctx.say(format!("❌ `{input}` is not a valid time. Use HH:MM, e.g. 20:00."))
                        .await?;
                    return Ok(());
                };
                *slot = Some(minute);
            }
        }
        let [start_minute, end_minute] = parsed;

        let patch = SettingsPatch {
            hot_time_enabled: enabled,
            hot_time_start_minute: start_minute,
            hot_time_end_minute: end_minute,
            hot_time_multiplier: multiplier,
            ..Default::default()
        };
        save_patch(ctx, &guild_id.to_string(), patch).await
    }

    /// Sets a reward multiplier on a channel or a role.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn multiplier_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Multiplier (e.g. 1.5)"] multiplier: f64,
        #[description = "Channel to boost"] channel: Option<serenity::Channel>,
        #[description = "Role to boost"] role: Option<serenity::Role>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let Some((kind, target_id)) = pick_target(
            channel.map(|c| c.id().to_string()),
            role.map(|r| r.id.to_string()),
        ) else {
            ctx.say("❌ Pick exactly one channel or one role.").await?;
            return Ok(());
        };

        match ctx
            .data()
            .currency
            .set_multiplier(&guild_id.to_string(), kind, &target_id, multiplier)
            .await
        {
            Ok(saved) => {
                ctx.say(format!(
                    "✅ Rewards in {} are now multiplied by ×{}.",
                    target_mention(kind, &target_id),
                    saved.multiplier
                ))
                .await?;
            }
            Err(Error::Config { message }) => {
                ctx.say(format!("❌ {message}")).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Removes the reward multiplier from a channel or a role.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn multiplier_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Channel to reset"] channel: Option<serenity::Channel>,
        #[description = "Role to reset"] role: Option<serenity::Role>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let Some((kind, target_id)) = pick_target(
            channel.map(|c| c.id().to_string()),
            role.map(|r| r.id.to_string()),
        ) else {
            ctx.say("❌ Pick exactly one channel or one role.").await?;
            return Ok(());
        };

        let removed = ctx
            .data()
            .currency
            .remove_multiplier(&guild_id.to_string(), kind, &target_id)
            .await?;
        let mention = target_mention(kind, &target_id);
        if removed {
            ctx.say(format!("✅ Removed the multiplier from {mention}."))
                .await?;
        } else {
            ctx.say(format!("ℹ️ {mention} has no multiplier."))
                .await?;
        }
        Ok(())
    }

    /// Lists all channel and role multipliers.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn multipliers(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let multipliers = ctx
            .data()
            .currency
            .list_multipliers(&guild_id.to_string())
            .await?;

        if multipliers.is_empty() {
            ctx.say("📂 No multipliers set. Add one with `/economy multiplier_set`.")
                .await?;
            return Ok(());
        }

        let mut response = String::from("📈 **Reward multipliers:**\n");
        for entry in &multipliers {
            writeln!(
                response,
                "• {} ({}) ×{}",
                target_mention(entry.target_kind, &entry.target_id),
                entry.target_kind,
                entry.multiplier
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
