//! Wallet business logic - balance reads and the atomic credit/debit primitives.
//!
//! Every write here runs on the caller's connection, which is expected to be an
//! open database transaction: the balance update and its ledger row must commit
//! together. Updates are guarded by the wallet's `version` column, so a row that
//! changed since it was read fails with [`Error::WalletConflict`] instead of
//! being overwritten.

use crate::{
    core::{
        ledger::{self, NewEntry},
        locks::WalletKey,
        reward::RewardKind,
    },
    entities::{CurrencyType, TransactionKind, Wallet, transaction, wallet},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};

/// Both wallets of one member. Either may not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletPair {
    /// Activity currency wallet
    pub topy: Option<wallet::Model>,
    /// Premium currency wallet
    pub ruby: Option<wallet::Model>,
}

impl WalletPair {
    /// The wallet for `currency`, if it exists.
    #[must_use]
    pub const fn get(&self, currency: CurrencyType) -> Option<&wallet::Model> {
        match currency {
            CurrencyType::Topy => self.topy.as_ref(),
            CurrencyType::Ruby => self.ruby.as_ref(),
        }
    }

    /// Balance for `currency`; a missing wallet holds zero.
    #[must_use]
    pub fn balance(&self, currency: CurrencyType) -> i64 {
        self.get(currency).map_or(0, |w| w.balance)
    }
}

/// Result of a write: the wallet after the change and the ledger row recording it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletChange {
    /// Wallet state after the write
    pub wallet: wallet::Model,
    /// Ledger entry appended for the write
    pub entry: transaction::Model,
}

/// Finds a wallet by key.
pub async fn find_wallet<C>(db: &C, key: &WalletKey) -> Result<Option<wallet::Model>>
where
    C: ConnectionTrait,
{
    Wallet::find()
        .filter(wallet::Column::GuildId.eq(key.guild_id.as_str()))
        .filter(wallet::Column::UserId.eq(key.user_id.as_str()))
        .filter(wallet::Column::Currency.eq(key.currency))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads both currency wallets of a member.
pub async fn get_wallets<C>(db: &C, guild_id: &str, user_id: &str) -> Result<WalletPair>
where
    C: ConnectionTrait,
{
    let rows = Wallet::find()
        .filter(wallet::Column::GuildId.eq(guild_id))
        .filter(wallet::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    let mut pair = WalletPair::default();
    for row in rows {
        match row.currency {
            CurrencyType::Topy => pair.topy = Some(row),
            CurrencyType::Ruby => pair.ruby = Some(row),
        }
    }
    Ok(pair)
}

/// One page of a guild's wallets for `currency`, richest first.
///
/// Ties are broken by user ID so consecutive pages never overlap or skip.
pub async fn get_leaderboard<C>(
    db: &C,
    guild_id: &str,
    currency: CurrencyType,
    limit: u64,
    offset: u64,
) -> Result<Vec<wallet::Model>>
where
    C: ConnectionTrait,
{
    Wallet::find()
        .filter(wallet::Column::GuildId.eq(guild_id))
        .filter(wallet::Column::Currency.eq(currency))
        .order_by_desc(wallet::Column::Balance)
        .order_by_asc(wallet::Column::UserId)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of wallets a guild has for `currency`.
pub async fn count_wallets<C>(db: &C, guild_id: &str, currency: CurrencyType) -> Result<u64>
where
    C: ConnectionTrait,
{
    Wallet::find()
        .filter(wallet::Column::GuildId.eq(guild_id))
        .filter(wallet::Column::Currency.eq(currency))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Fields of an activity grant that the wallet row stores.
#[derive(Debug, Clone, Copy)]
pub struct GrantWrite {
    /// Amount credited
    pub amount: i64,
    /// Today's earnings of this reward kind after the grant
    pub daily_earned: i64,
    /// Guild-local date the daily earnings belong to
    pub today: NaiveDate,
    /// Time of the grant
    pub now: DateTime<Utc>,
    /// Which cooldown and daily counter the grant updates
    pub kind: RewardKind,
}

fn conflict(key: &WalletKey) -> Error {
    Error::WalletConflict {
        guild_id: key.guild_id.clone(),
        user_id: key.user_id.clone(),
        currency: key.currency,
    }
}

async fn reload<C>(db: &C, key: &WalletKey, id: i64) -> Result<wallet::Model>
where
    C: ConnectionTrait,
{
    Wallet::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| conflict(key))
}

/// Credits an activity reward, updating that kind's cooldown and daily counter, and appends its ledger row.
///
/// `existing` must be the wallet as read inside the same transaction. When the
/// grant starts a new day, the other kind's daily counter is reset as well.
pub async fn record_grant<C>(
    db: &C,
    key: &WalletKey,
    existing: Option<&wallet::Model>,
    grant: GrantWrite,
) -> Result<WalletChange>
where
    C: ConnectionTrait,
{
    if grant.amount <= 0 {
        return Err(Error::InvalidAmount {
            amount: grant.amount,
        });
    }

    let (counter, other_counter, last_grant) = match grant.kind {
        RewardKind::Text => (
            wallet::Column::TextDailyEarned,
            wallet::Column::VoiceDailyEarned,
            wallet::Column::LastTextGrantAt,
        ),
        RewardKind::Voice => (
            wallet::Column::VoiceDailyEarned,
            wallet::Column::TextDailyEarned,
            wallet::Column::LastVoiceGrantAt,
        ),
    };

    let wallet = match existing {
        None => {
            let mut model = wallet::ActiveModel {
                guild_id: Set(key.guild_id.clone()),
                user_id: Set(key.user_id.clone()),
                currency: Set(key.currency),
                balance: Set(grant.amount),
                total_earned: Set(grant.amount),
                text_daily_earned: Set(0),
                voice_daily_earned: Set(0),
                daily_earned_date: Set(grant.today),
                last_text_grant_at: Set(None),
                last_voice_grant_at: Set(None),
                version: Set(1),
                created_at: Set(grant.now),
                updated_at: Set(grant.now),
                ..Default::default()
            };
            match grant.kind {
                RewardKind::Text => {
                    model.text_daily_earned = Set(grant.daily_earned);
                    model.last_text_grant_at = Set(Some(grant.now));
                }
                RewardKind::Voice => {
                    model.voice_daily_earned = Set(grant.daily_earned);
                    model.last_voice_grant_at = Set(Some(grant.now));
                }
            }
            model.insert(db).await?
        }
        Some(current) => {
            let mut update = Wallet::update_many()
                .col_expr(
                    wallet::Column::Balance,
                    Expr::col(wallet::Column::Balance).add(grant.amount),
                )
                .col_expr(
                    wallet::Column::TotalEarned,
                    Expr::col(wallet::Column::TotalEarned).add(grant.amount),
                )
                .col_expr(counter, Expr::value(grant.daily_earned))
                .col_expr(wallet::Column::DailyEarnedDate, Expr::value(grant.today))
                .col_expr(last_grant, Expr::value(Some(grant.now)));
            if current.daily_earned_date != grant.today {
                update = update.col_expr(other_counter, Expr::value(0_i64));
            }
            let result = update
                .col_expr(wallet::Column::Version, Expr::value(current.version + 1))
                .col_expr(wallet::Column::UpdatedAt, Expr::value(grant.now))
                .filter(wallet::Column::Id.eq(current.id))
                .filter(wallet::Column::Version.eq(current.version))
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                return Err(conflict(key));
            }
            reload(db, key, current.id).await?
        }
    };

    let entry = ledger::append_entry(
        db,
        NewEntry {
            key,
            kind: grant.kind.transaction_kind(),
            amount: grant.amount,
            balance_after: wallet.balance,
            related_user_id: None,
            note: None,
            at: grant.now,
        },
    )
    .await?;

    Ok(WalletChange { wallet, entry })
}

/// A balance change that is not an activity reward (transfers, fees, admin adjustments).
#[derive(Debug, Clone, Copy)]
pub struct BalanceDelta<'a> {
    /// Signed change; must not be zero
    pub amount: i64,
    /// Ledger kind
    pub kind: TransactionKind,
    /// Counterparty
    pub related_user_id: Option<&'a str>,
    /// Optional note
    pub note: Option<&'a str>,
    /// Time of the change
    pub now: DateTime<Utc>,
}

/// Applies a signed change to a wallet and appends its ledger row.
///
/// Credits create the wallet if needed. Debits fail with
/// [`Error::InsufficientFunds`] when the balance would go below zero.
pub async fn apply_delta<C>(db: &C, key: &WalletKey, delta: BalanceDelta<'_>) -> Result<WalletChange>
where
    C: ConnectionTrait,
{
    if delta.amount == 0 {
        return Err(Error::InvalidAmount { amount: 0 });
    }

    let existing = find_wallet(db, key).await?;
    let current_balance = existing.as_ref().map_or(0, |w| w.balance);
    let new_balance = current_balance
        .checked_add(delta.amount)
        .ok_or(Error::InvalidAmount {
            amount: delta.amount,
        })?;
    if new_balance < 0 {
        return Err(Error::InsufficientFunds {
            current: current_balance,
            required: delta.amount.saturating_neg(),
        });
    }

    let wallet = match existing {
        None => {
            wallet::ActiveModel {
                guild_id: Set(key.guild_id.clone()),
                user_id: Set(key.user_id.clone()),
                currency: Set(key.currency),
                balance: Set(new_balance),
                total_earned: Set(0),
                text_daily_earned: Set(0),
                voice_daily_earned: Set(0),
                daily_earned_date: Set(delta.now.date_naive()),
                last_text_grant_at: Set(None),
                last_voice_grant_at: Set(None),
                version: Set(1),
                created_at: Set(delta.now),
                updated_at: Set(delta.now),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
        Some(current) => {
            let result = Wallet::update_many()
                .col_expr(
                    wallet::Column::Balance,
                    Expr::col(wallet::Column::Balance).add(delta.amount),
                )
                .col_expr(wallet::Column::Version, Expr::value(current.version + 1))
                .col_expr(wallet::Column::UpdatedAt, Expr::value(delta.now))
                .filter(wallet::Column::Id.eq(current.id))
                .filter(wallet::Column::Version.eq(current.version))
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                return Err(conflict(key));
            }
            reload(db, key, current.id).await?
        }
    };

    let entry = ledger::append_entry(
        db,
        NewEntry {
            key,
            kind: delta.kind,
            amount: delta.amount,
            balance_after: wallet.balance,
            related_user_id: delta.related_user_id,
            note: delta.note,
            at: delta.now,
        },
    )
    .await?;

    Ok(WalletChange { wallet, entry })
}
