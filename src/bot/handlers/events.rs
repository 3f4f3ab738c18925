//! Gateway event handler - turns guild chat messages into text rewards.

use crate::{
    bot::BotData,
    core::{Activity, CurrencyService, GrantOutcome},
    errors::Error,
};
use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

/// The parts of a chat message that matter for rewards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Guild the message was sent in; `None` for direct messages
    pub guild_id: Option<String>,
    /// Author's user ID
    pub user_id: String,
    /// Whether the author is a bot
    pub author_is_bot: bool,
    /// Channel the message was sent in
    pub channel_id: String,
    /// Author's role IDs
    pub role_ids: Vec<String>,
    /// Message length in characters
    pub length: usize,
}

impl ChatMessage {
    /// Extracts reward-relevant fields from a serenity message.
    #[must_use]
    pub fn from_message(message: &serenity::Message) -> Self {
        Self {
            guild_id: message.guild_id.map(|id| id.to_string()),
            user_id: message.author.id.to_string(),
            author_is_bot: message.author.bot,
            channel_id: message.channel_id.to_string(),
            role_ids: message
                .member
                .as_ref()
                .map(|member| member.roles.iter().map(ToString::to_string).collect())
                .unwrap_or_default(),
            length: message.content.chars().count(),
        }
    }
}

/// Attempts a text reward for `message`.
///
/// Returns `None` when the message cannot earn anything (DMs, bots) or when the
/// grant failed; failures are logged here and not propagated.
pub async fn reward_message(service: &CurrencyService, message: &ChatMessage) -> Option<GrantOutcome> {
    if message.author_is_bot {
        return None;
    }
    let guild_id = message.guild_id.as_deref()?;

    let activity = Activity {
        guild_id,
        user_id: &message.user_id,
        channel_id: &message.channel_id,
        role_ids: &message.role_ids,
    };
    match service.grant_text_currency(&activity, message.length).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(
                guild = guild_id,
                user = %message.user_id,
                "Dropping text reward after error: {e}"
            );
            None
        }
    }
}

/// Poise event handler entry point.
pub async fn event_handler(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        let message = ChatMessage::from_message(new_message);
        if let Some(outcome) = reward_message(&data.currency, &message).await {
            debug!(?outcome, "Processed chat message");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::test_utils::*;

    fn message(guild_id: Option<&str>, author_is_bot: bool, length: usize) -> ChatMessage {
        ChatMessage {
            guild_id: guild_id.map(str::to_string),
            user_id: "alice".to_string(),
            author_is_bot,
            channel_id: "chat".to_string(),
            role_ids: Vec::new(),
            length,
        }
    }

    #[tokio::test]
    async fn test_guild_message_is_rewarded() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;
        let outcome = reward_message(&service, &message(Some("guild"), false, 30)).await;
        assert!(outcome.is_some_and(|o| o.is_granted()));
        Ok(())
    }

    #[tokio::test]
    async fn test_bots_and_direct_messages_are_ignored() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;

        assert!(reward_message(&service, &message(Some("guild"), true, 30)).await.is_none());
        assert!(reward_message(&service, &message(None, false, 30)).await.is_none());
        assert!(service.get_wallets("guild", "alice").await?.topy.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_database_failure_is_swallowed() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;
        service.close().await?;

        let outcome = reward_message(&service, &message(Some("guild"), false, 30)).await;
        assert!(outcome.is_none());
        Ok(())
    }
}
