//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Admin economy commands (`/economy ...`)
pub mod admin;

/// General utility commands
pub mod general;

/// Member wallet commands
pub mod wallet;

use crate::{
    bot::BotData,
    entities::{CurrencyType, guild_settings},
    errors::Error,
};

// Export commands
pub use admin::*;
pub use general::*;
pub use wallet::*;

/// Currency picker shown in slash command options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum CurrencyChoice {
    /// Activity currency
    #[name = "Topy"]
    Topy,
    /// Premium currency
    #[name = "Ruby"]
    Ruby,
}

impl From<CurrencyChoice> for CurrencyType {
    fn from(choice: CurrencyChoice) -> Self {
        match choice {
            CurrencyChoice::Topy => Self::Topy,
            CurrencyChoice::Ruby => Self::Ruby,
        }
    }
}

/// The guild's display name for a currency.
#[must_use]
pub fn currency_name(settings: &guild_settings::Model, currency: CurrencyType) -> &str {
    match currency {
        CurrencyType::Topy => &settings.topy_name,
        CurrencyType::Ruby => &settings.ruby_name,
    }
}

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        general::ping(),
        general::help(),
        wallet::wallet(),
        wallet::leaderboard(),
        wallet::history(),
        wallet::transfer(),
        admin::economy(),
    ]
}
