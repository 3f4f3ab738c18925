//! Member wallet commands - balances, leaderboard, history and transfers.
//!
//! Replies use the guild's configured currency names. Business rule violations
//! (insufficient funds, self transfers) are answered in the channel; anything
//! else propagates to the framework error handler.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{CurrencyChoice, currency_name},
        },
        core::{currency::ACTIVITY_CURRENCY, reward::{self, RewardKind}},
        entities::CurrencyType,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Leaderboard entries per page.
    const PAGE_SIZE: u64 = 10;
    /// Default number of history entries.
    const DEFAULT_HISTORY: u32 = 10;

    /// Shows a member's balances in both currencies.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn wallet(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to look up (default: you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let guild_id = guild_id.to_string();
        let target = user.as_ref().unwrap_or_else(|| ctx.author());
        let service = &ctx.data().currency;

        let settings = service.get_settings(&guild_id).await?;
        let wallets = service.get_wallets(&guild_id, &target.id.to_string()).await?;

        let today = service.local_today(&settings);
        let topy = wallets.get(CurrencyType::Topy);
        let chat_today = reward::effective_daily_earned(topy, RewardKind::Text, today);
        let voice_today = reward::effective_daily_earned(topy, RewardKind::Voice, today);
        let total_earned = topy.map_or(0, |w| w.total_earned);

        let embed = serenity::CreateEmbed::default()
            .title(format!("👛 Wallet of {}", target.name))
            .field(
                settings.topy_name.as_str(),
                format!("**{}**", wallets.balance(CurrencyType::Topy)),
                true,
            )
            .field(
                settings.ruby_name.as_str(),
                format!("**{}**", wallets.balance(CurrencyType::Ruby)),
                true,
            )
            .field(
                "Earned today",
                format!(
                    "chat {chat_today}/{} · voice {voice_today}/{}",
                    settings.text_daily_cap, settings.voice_daily_cap
                ),
                false,
            )
            .field("Earned all-time", total_earned.to_string(), false)
            .color(0x00F1_C40F);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows the richest members of the server.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn leaderboard(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Currency to rank by (default: activity currency)"] currency: Option<
            CurrencyChoice,
        >,
        #[description = "Page number (default: 1)"]
        #[min = 1]
        page: Option<u32>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let guild_id = guild_id.to_string();
        let currency = currency.map_or(ACTIVITY_CURRENCY, Into::into);
        let service = &ctx.data().currency;

        let settings = service.get_settings(&guild_id).await?;
        let name = currency_name(&settings, currency);

        let total = service.count_wallets(&guild_id, currency).await?;
        if total == 0 {
            ctx.say(format!("📊 Nobody holds any {name} yet."))
                .await?;
            return Ok(());
        }

        let pages = total.div_ceil(PAGE_SIZE);
        let page = u64::from(page.unwrap_or(1)).clamp(1, pages);
        let first_rank = (page - 1) * PAGE_SIZE;
        let entries = service
            .get_leaderboard(&guild_id, currency, PAGE_SIZE, first_rank)
            .await?;

        let mut description = String::new();
        for (rank, entry) in (first_rank + 1..).zip(&entries) {
            let medal = match rank {
                1 => "🥇",
                2 => "🥈",
                3 => "🥉",
                _ => "▫️",
            };
            writeln!(
                description,
                "{medal} `#{rank}` <@{}> - **{}** {name}",
                entry.user_id, entry.balance
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("🏆 {name} Leaderboard"))
            .description(description)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Page {page}/{pages} · {total} members"
            )))
            .color(0x00F1_C40F);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows your most recent balance changes.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Currency (default: activity currency)"] currency: Option<CurrencyChoice>,
        #[description = "Number of entries (default: 10)"]
        #[min = 1]
        #[max = 25]
        limit: Option<u32>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let guild_id = guild_id.to_string();
        let currency = currency.map_or(ACTIVITY_CURRENCY, Into::into);
        let limit = limit.unwrap_or(DEFAULT_HISTORY).clamp(1, 25);
        let service = &ctx.data().currency;

        let settings = service.get_settings(&guild_id).await?;
        let name = currency_name(&settings, currency);
        let entries = service
            .history(
                &guild_id,
                &ctx.author().id.to_string(),
                currency,
                u64::from(limit),
            )
            .await?;

        if entries.is_empty() {
            ctx.say(format!("📜 You have no {name} history yet."))
                .await?;
            return Ok(());
        }

        let mut response = format!("📜 **Recent {name} activity:**\n");
        for entry in &entries {
            write!(
                response,
                "• `{:+}` {} → {} <t:{}:R>",
                entry.amount,
                entry.kind.label(),
                entry.balance_after,
                entry.created_at.timestamp()
            )?;
            if let Some(related) = &entry.related_user_id {
                write!(response, " (<@{related}>)")?;
            }
            if let Some(note) = &entry.note {
                write!(response, " - {note}")?;
            }
            response.push('\n');
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Sends currency to another member. The guild's transfer fee is added on top.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn transfer(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to send to"] user: serenity::User,
        #[description = "Amount to send"]
        #[min = 1]
        amount: i64,
        #[description = "Currency (default: activity currency)"] currency: Option<CurrencyChoice>,
    ) -> Result<()> {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let guild_id = guild_id.to_string();
        let currency = currency.map_or(ACTIVITY_CURRENCY, Into::into);

        if user.bot {
            ctx.say("❌ Bots can't hold currency.").await?;
            return Ok(());
        }

        let service = &ctx.data().currency;
        let settings = service.get_settings(&guild_id).await?;
        let name = currency_name(&settings, currency);

        let result = service
            .transfer(
                &guild_id,
                &ctx.author().id.to_string(),
                &user.id.to_string(),
                currency,
                amount,
            )
            .await;

        match result {
            Ok(receipt) => {
                ctx.say(format!(
                    "✅ Sent **{}** {name} to <@{}> (fee: {}).\n💰 Your balance: **{}** {name}",
                    receipt.amount, user.id, receipt.fee, receipt.sender_balance
                ))
                .await?;
            }
            Err(Error::InsufficientFunds { current, required }) => {
                ctx.say(format!(
                    "❌ Insufficient funds: you have {current} {name}, but this transfer needs {required} including the fee."
                ))
                .await?;
            }
            Err(Error::SelfTransfer) => {
                ctx.say("❌ You can't send currency to yourself.").await?;
            }
            Err(Error::InvalidAmount { .. }) => {
                ctx.say("❌ Amount must be a positive number.").await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
