//! Closed enumerations stored as strings in the database.
//!
//! Currency, ledger kind, rounding policy and multiplier target are all
//! persisted by their lowercase string value so rows stay readable from the
//! `sqlite3` shell and from other tools sharing the database.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two guild currencies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CurrencyType {
    /// Activity currency, earned by chatting and voice presence
    #[sea_orm(string_value = "topy")]
    Topy,
    /// Premium currency, moved by admins and transfers
    #[sea_orm(string_value = "ruby")]
    Ruby,
}

impl CurrencyType {
    /// Lowercase identifier as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Topy => "topy",
            Self::Ruby => "ruby",
        }
    }
}

impl fmt::Display for CurrencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Reward for a chat message
    #[sea_orm(string_value = "earn_text")]
    EarnText,
    /// Reward for voice presence
    #[sea_orm(string_value = "earn_voice")]
    EarnVoice,
    /// Incoming leg of a transfer
    #[sea_orm(string_value = "transfer_in")]
    TransferIn,
    /// Outgoing leg of a transfer
    #[sea_orm(string_value = "transfer_out")]
    TransferOut,
    /// Marketplace purchase
    #[sea_orm(string_value = "shop_purchase")]
    ShopPurchase,
    /// Treasury tax
    #[sea_orm(string_value = "tax")]
    Tax,
    /// Transfer fee
    #[sea_orm(string_value = "fee")]
    Fee,
    /// Admin credit
    #[sea_orm(string_value = "admin_add")]
    AdminAdd,
    /// Admin debit
    #[sea_orm(string_value = "admin_remove")]
    AdminRemove,
    /// Mini-game stake
    #[sea_orm(string_value = "game_entry")]
    GameEntry,
    /// Mini-game payout
    #[sea_orm(string_value = "game_reward")]
    GameReward,
    /// Mini-game stake returned
    #[sea_orm(string_value = "game_refund")]
    GameRefund,
    /// Moved into the guild vault
    #[sea_orm(string_value = "vault_deposit")]
    VaultDeposit,
    /// Moved out of the guild vault
    #[sea_orm(string_value = "vault_withdraw")]
    VaultWithdraw,
}

impl TransactionKind {
    /// Short label used in history listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::EarnText => "chat reward",
            Self::EarnVoice => "voice reward",
            Self::TransferIn => "transfer received",
            Self::TransferOut => "transfer sent",
            Self::ShopPurchase => "shop purchase",
            Self::Tax => "tax",
            Self::Fee => "fee",
            Self::AdminAdd => "admin credit",
            Self::AdminRemove => "admin debit",
            Self::GameEntry => "game entry",
            Self::GameReward => "game reward",
            Self::GameRefund => "game refund",
            Self::VaultDeposit => "vault deposit",
            Self::VaultWithdraw => "vault withdrawal",
        }
    }
}

/// How a multiplied reward is turned back into an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round toward negative infinity
    #[sea_orm(string_value = "floor")]
    Floor,
    /// Round half away from zero
    #[sea_orm(string_value = "round")]
    Round,
    /// Round toward positive infinity
    #[sea_orm(string_value = "ceil")]
    Ceil,
}

/// What a reward multiplier is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MultiplierTarget {
    /// A text or voice channel
    #[sea_orm(string_value = "channel")]
    Channel,
    /// A guild role
    #[sea_orm(string_value = "role")]
    Role,
}

impl fmt::Display for MultiplierTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel => f.write_str("channel"),
            Self::Role => f.write_str("role"),
        }
    }
}
