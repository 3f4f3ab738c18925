//! Wallet entity - one balance per (guild, user, currency).
//!
//! Chat and voice rewards keep separate cooldown timestamps and daily
//! counters. Both counters only count for the guild-local date stored in
//! `daily_earned_date`; a stale date means both have reset.

use super::sea_orm_active_enums::CurrencyType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    /// Unique identifier for the wallet
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord guild ID
    pub guild_id: String,
    /// Discord user ID
    pub user_id: String,
    /// Which currency this wallet holds
    pub currency: CurrencyType,
    /// Current balance, never negative
    pub balance: i64,
    /// Lifetime sum of rewards granted
    pub total_earned: i64,
    /// Chat rewards granted on `daily_earned_date`
    pub text_daily_earned: i64,
    /// Voice rewards granted on `daily_earned_date`
    pub voice_daily_earned: i64,
    /// Guild-local date both daily counters belong to
    pub daily_earned_date: Date,
    /// When the last chat reward was granted
    pub last_text_grant_at: Option<DateTimeUtc>,
    /// When the last voice reward was granted
    pub last_voice_grant_at: Option<DateTimeUtc>,
    /// Bumped on every write, used for optimistic concurrency checks
    pub version: i64,
    /// When the wallet was first credited
    pub created_at: DateTimeUtc,
    /// When the wallet was last modified
    pub updated_at: DateTimeUtc,
}

/// Wallets have no foreign-key relations; ledger rows reference them by key.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
