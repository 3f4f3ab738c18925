//! Transaction entity - the append-only ledger.
//!
//! Every balance mutation writes exactly one row here. Rows are never updated
//! or deleted, so summing `amount` for a wallet reproduces its balance.
use super::sea_orm_active_enums::{CurrencyType, TransactionKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Discord guild ID
    pub guild_id: String,
    /// Discord user ID whose wallet changed
    pub user_id: String,
    /// Currency of the affected wallet
    pub currency: CurrencyType,
    /// What caused the mutation
    pub kind: TransactionKind,
    /// Signed change applied to the balance
    pub amount: i64,
    /// Wallet balance right after this entry was applied
    pub balance_after: i64,
    /// Counterparty for transfers and fees
    pub related_user_id: Option<String>,
    /// Free-form note (admin adjustments)
    pub note: Option<String>,
    /// When the entry was written
    pub created_at: DateTimeUtc,
}

/// Ledger rows have no foreign-key relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
