//! General Discord commands - ping and help.
//! These commands don't touch the database.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Guild Economy Help**\n\
        Members earn the activity currency by chatting and by spending time in voice channels.\n\n\
        **Member Commands**\n\
        • `/wallet [user]` - Shows both currency balances and today's earnings.\n\
        • `/leaderboard [currency] [page]` - Shows the richest members.\n\
        • `/history [currency] [limit]` - Shows your recent balance changes.\n\
        • `/transfer <user> <amount> [currency]` - Sends currency to another member (a fee applies).\n\n\
        **Admin Commands** (Manage Server)\n\
        • `/economy adjust <user> <amount> [currency] [note]` - Adds or removes currency.\n\
        • `/economy settings` - Shows the current economy settings.\n\
        • `/economy general|text_reward|voice_reward|hot_time` - Changes reward settings.\n\
        • `/economy multiplier_set|multiplier_remove|multipliers` - Manages channel and role multipliers.\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
