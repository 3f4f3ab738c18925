//! Bot layer - Discord-specific interface and command handlers
//!
//! This module wires the currency service into poise: slash commands, the
//! chat message handler, and the voice presence sweep.

/// Discord command implementations (wallet, admin, general)
pub mod commands;
/// Discord event handlers (messages, voice sweep)
pub mod handlers;

use crate::{
    config::BotConfig,
    core::CurrencyService,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::{env, sync::Arc, time::Duration};
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
pub struct BotData {
    /// The economy service every command and handler goes through
    pub currency: Arc<CurrencyService>,
}

impl BotData {
    /// Creates a new `BotData` around the shared service.
    #[must_use]
    pub const fn new(currency: Arc<CurrencyService>) -> Self {
        Self { currency }
    }
}

pub use commands::*;
pub use handlers::*;

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error}", ctx.command().qualified_name);
            let reply = poise::CreateReply::default()
                .content("❌ Something went wrong. Please try again later.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Registers commands in `DEV_GUILD_ID` when set (instant updates), otherwise globally.
async fn register_commands(
    ctx: &serenity::Context,
    commands: &[poise::Command<BotData, Error>],
) -> Result<()> {
    if let Some(guild_id) = env::var("DEV_GUILD_ID")
        .ok()
        .and_then(|id| id.parse::<u64>().ok())
    {
        let guild_id = serenity::GuildId::new(guild_id);
        poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
        info!("Registered commands in guild {guild_id}");
    } else {
        poise::builtins::register_globally(ctx, commands).await?;
        info!("Registered commands globally");
    }
    Ok(())
}

/// Connects to Discord and runs until the gateway shuts down.
#[instrument(skip(token, currency))]
pub async fn run_bot(token: &str, currency: Arc<CurrencyService>, bot_config: BotConfig) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::events::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                register_commands(ctx, &framework.options().commands).await?;

                let period = Duration::from_secs(bot_config.voice_sweep_secs.max(1));
                tokio::spawn(handlers::voice::run_voice_sweep(
                    ctx.clone(),
                    Arc::clone(&currency),
                    period,
                ));

                Ok(BotData::new(currency))
            })
        })
        .build();

    // Message content is needed for length checks, voice states for the sweep
    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e}"))?;

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}
