//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod guild_settings;
pub mod reward_multiplier;
pub mod sea_orm_active_enums;
pub mod transaction;
pub mod wallet;

// Re-export specific types to avoid conflicts
pub use guild_settings::{
    Column as GuildSettingsColumn, Entity as GuildSettings, Model as GuildSettingsModel,
};
pub use reward_multiplier::{
    Column as RewardMultiplierColumn, Entity as RewardMultiplier, Model as RewardMultiplierModel,
};
pub use sea_orm_active_enums::{CurrencyType, MultiplierTarget, RoundingPolicy, TransactionKind};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use wallet::{Column as WalletColumn, Entity as Wallet, Model as WalletModel};
