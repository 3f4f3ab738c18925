//! Ledger business logic - appending and reading balance history.
//!
//! The ledger is append-only: this module only inserts and selects. The
//! `transactions` table is never updated or deleted from.

use crate::{
    core::locks::WalletKey,
    entities::{CurrencyType, Transaction, TransactionKind, transaction},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};

/// A ledger row about to be written.
#[derive(Debug, Clone)]
pub struct NewEntry<'a> {
    /// Wallet the entry belongs to
    pub key: &'a WalletKey,
    /// What caused the mutation
    pub kind: TransactionKind,
    /// Signed change to the balance
    pub amount: i64,
    /// Balance after the change
    pub balance_after: i64,
    /// Counterparty, for transfers and fees
    pub related_user_id: Option<&'a str>,
    /// Optional free-form note
    pub note: Option<&'a str>,
    /// Timestamp of the mutation
    pub at: DateTime<Utc>,
}

/// Appends one entry to the ledger. Call inside the transaction that changed the balance.
pub async fn append_entry<C>(db: &C, entry: NewEntry<'_>) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    transaction::ActiveModel {
        guild_id: Set(entry.key.guild_id.clone()),
        user_id: Set(entry.key.user_id.clone()),
        currency: Set(entry.key.currency),
        kind: Set(entry.kind),
        amount: Set(entry.amount),
        balance_after: Set(entry.balance_after),
        related_user_id: Set(entry.related_user_id.map(str::to_string)),
        note: Set(entry.note.map(str::to_string)),
        created_at: Set(entry.at),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Most recent ledger entries for a wallet, newest first.
pub async fn history<C>(
    db: &C,
    guild_id: &str,
    user_id: &str,
    currency: CurrencyType,
    limit: u64,
) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::GuildId.eq(guild_id))
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::Currency.eq(currency))
        .order_by_desc(transaction::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of every ledger amount for a wallet. Equals the wallet balance when the ledger is consistent.
pub async fn ledger_balance<C>(
    db: &C,
    guild_id: &str,
    user_id: &str,
    currency: CurrencyType,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    let sum: Option<Option<i64>> = Transaction::find()
        .select_only()
        .column_as(transaction::Column::Amount.sum(), "total")
        .filter(transaction::Column::GuildId.eq(guild_id))
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::Currency.eq(currency))
        .into_tuple()
        .one(db)
        .await?;
    Ok(sum.flatten().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_append_and_history_order() -> Result<()> {
        let db = setup_test_db().await?;
        let key = WalletKey::new("guild", "alice", CurrencyType::Topy);
        let now = Utc::now();

        for (amount, balance_after) in [(5, 5), (3, 8), (-2, 6)] {
            append_entry(
                &db,
                NewEntry {
                    key: &key,
                    kind: TransactionKind::AdminAdd,
                    amount,
                    balance_after,
                    related_user_id: None,
                    note: Some("seed"),
                    at: now,
                },
            )
            .await?;
        }

        let entries = history(&db, "guild", "alice", CurrencyType::Topy, 2).await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, -2);
        assert_eq!(entries[0].balance_after, 6);
        assert_eq!(entries[1].amount, 3);
        assert_eq!(entries[0].note.as_deref(), Some("seed"));

        assert_eq!(
            ledger_balance(&db, "guild", "alice", CurrencyType::Topy).await?,
            6
        );
        // Other wallets are separate
        assert_eq!(
            ledger_balance(&db, "guild", "alice", CurrencyType::Ruby).await?,
            0
        );
        assert!(history(&db, "guild", "bob", CurrencyType::Topy, 10).await?.is_empty());

        Ok(())
    }
}
