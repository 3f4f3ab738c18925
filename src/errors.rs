//! Unified error types for the economy service and the Discord bot.
//!
//! "Not eligible for a reward" is deliberately absent here: it is a normal
//! outcome (see [`crate::core::currency::GrantOutcome`]), not a failure.

use crate::entities::CurrencyType;
use thiserror::Error;

/// Errors produced by the economy service, its storage layer, and the bot.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration (config.toml, admin settings input).
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Any failure reported by the database layer.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// An amount that is zero, negative where it must be positive, or overflowing.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: i64,
    },

    /// A debit would take a wallet below zero.
    #[error("Insufficient funds: balance is {current}, but {required} is required")]
    InsufficientFunds {
        /// Balance available in the wallet
        current: i64,
        /// Amount the operation needed
        required: i64,
    },

    /// Sender and recipient of a transfer are the same user.
    #[error("Cannot transfer currency to yourself")]
    SelfTransfer,

    /// The wallet row changed between read and write (another process won the race).
    #[error("Wallet {currency} for user {user_id} in guild {guild_id} was modified concurrently")]
    WalletConflict {
        /// Guild owning the wallet
        guild_id: String,
        /// User owning the wallet
        user_id: String,
        /// Currency of the wallet
        currency: CurrencyType,
    },

    /// I/O failure (reading config.toml).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Formatting failure while building a reply.
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error.
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
