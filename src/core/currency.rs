//! Currency service - activity rewards, transfers and admin adjustments.
//!
//! The service owns the injected database connection, the economy defaults,
//! a clock and the per-wallet lock registry. Every operation that changes a
//! balance follows the same sequence:
//!
//! 1. read configuration (settings, multipliers) on the shared connection
//! 2. take the wallet lock(s)
//! 3. open a database transaction and read the wallet(s) through it
//! 4. decide, write balance and ledger rows, commit
//!
//! Configuration is read before the lock so a task never waits for a wallet
//! lock while holding a pooled connection. Dropping an uncommitted transaction
//! rolls it back, so an early return or error leaves nothing half-written.

use crate::{
    config::EconomyDefaults,
    core::{
        clock::{Clock, SystemClock},
        ledger,
        locks::{WalletKey, WalletLocks},
        reward::{self, Ineligible, RewardKind, RewardRule},
        settings::{self, SettingsPatch},
        wallet::{self, BalanceDelta, GrantWrite, WalletPair},
    },
    entities::{
        CurrencyType, MultiplierTarget, TransactionKind, WalletModel, guild_settings,
        reward_multiplier, transaction,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Activity rewards are always paid in the activity currency.
pub const ACTIVITY_CURRENCY: CurrencyType = CurrencyType::Topy;

/// Who did what, where. Supplied by message events and the voice sweep.
#[derive(Debug, Clone, Copy)]
pub struct Activity<'a> {
    /// Discord guild ID
    pub guild_id: &'a str,
    /// Discord user ID
    pub user_id: &'a str,
    /// Channel the activity happened in
    pub channel_id: &'a str,
    /// The member's role IDs
    pub role_ids: &'a [String],
}

/// Result of a grant attempt. Not being eligible is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// A reward was credited
    Granted {
        /// Amount credited
        amount: i64,
        /// Wallet balance after the credit
        balance: i64,
        /// Today's earnings of this reward kind after the credit
        daily_earned: i64,
    },
    /// No reward was due
    NotEligible(Ineligible),
}

impl GrantOutcome {
    /// Whether a reward was credited.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    /// The credited amount, if any.
    #[must_use]
    pub const fn amount(&self) -> Option<i64> {
        match self {
            Self::Granted { amount, .. } => Some(*amount),
            Self::NotEligible(_) => None,
        }
    }
}

/// Summary of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Amount the recipient received
    pub amount: i64,
    /// Fee the sender paid on top
    pub fee: i64,
    /// Sender balance afterwards
    pub sender_balance: i64,
    /// Recipient balance afterwards
    pub recipient_balance: i64,
}

/// The economy service. Construct once at startup and share behind an `Arc`.
#[derive(Debug)]
pub struct CurrencyService {
    db: DatabaseConnection,
    defaults: EconomyDefaults,
    clock: Arc<dyn Clock>,
    locks: WalletLocks,
}

impl CurrencyService {
    /// Creates a service over an open connection, using the system clock.
    #[must_use]
    pub fn new(db: DatabaseConnection, defaults: EconomyDefaults) -> Self {
        Self {
            db,
            defaults,
            clock: Arc::new(SystemClock),
            locks: WalletLocks::new(),
        }
    }

    /// Replaces the clock (used by tests to control time).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The underlying database connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Closes the connection pool. Later operations on this service fail with a database error.
    pub async fn close(&self) -> Result<()> {
        info!("Closing currency service database connection");
        self.db.close_by_ref().await.map_err(Into::into)
    }

    /// The current guild-local date under `settings`, read from the service clock.
    #[must_use]
    pub fn local_today(&self, settings: &guild_settings::Model) -> NaiveDate {
        reward::local_date(self.clock.now(), reward::guild_offset(settings))
    }

    /// Grants a chat reward for a message of `message_length` characters.
    #[instrument(skip(self, activity), fields(guild = activity.guild_id, user = activity.user_id))]
    pub async fn grant_text_currency(
        &self,
        activity: &Activity<'_>,
        message_length: usize,
    ) -> Result<GrantOutcome> {
        self.grant(activity, RewardKind::Text, Some(message_length))
            .await
    }

    /// Grants a voice-presence reward for one sweep tick.
    #[instrument(skip(self, activity), fields(guild = activity.guild_id, user = activity.user_id))]
    pub async fn grant_voice_currency(&self, activity: &Activity<'_>) -> Result<GrantOutcome> {
        self.grant(activity, RewardKind::Voice, None).await
    }

    async fn grant(
        &self,
        activity: &Activity<'_>,
        kind: RewardKind,
        message_length: Option<usize>,
    ) -> Result<GrantOutcome> {
        let now = self.clock.now();
        let cfg = self.get_settings(activity.guild_id).await?;
        let rule = RewardRule::for_kind(&cfg, kind);

        if let Some(length) = message_length {
            if let Err(reason) = reward::check_message_length(&rule, length) {
                debug!(?reason, "Message not eligible for a reward");
                return Ok(GrantOutcome::NotEligible(reason));
            }
        }

        let multipliers = settings::resolve_multipliers(
            &self.db,
            activity.guild_id,
            activity.channel_id,
            activity.role_ids,
        )
        .await?;
        let hot_time = reward::is_hot_time(&cfg, now).then_some(cfg.hot_time_multiplier);
        let multiplier = reward::combined_multiplier(multipliers.channel, &multipliers.roles, hot_time);
        let base = reward::roll_base(&mut rand::thread_rng(), rule.min_reward, rule.max_reward);
        let today = reward::local_date(now, reward::guild_offset(&cfg));

        let key = WalletKey::new(activity.guild_id, activity.user_id, ACTIVITY_CURRENCY);
        let _guard = self.locks.lock(&key).await;
        let txn = self.db.begin().await?;

        let existing = wallet::find_wallet(&txn, &key).await?;
        let daily_earned = match reward::check_wallet(&rule, existing.as_ref(), now, today) {
            Ok(daily_earned) => daily_earned,
            Err(reason) => {
                debug!(?reason, "Wallet not eligible for a reward");
                return Ok(GrantOutcome::NotEligible(reason));
            }
        };

        let amount = reward::clamp_to_cap(
            reward::apply_multiplier(base, multiplier, cfg.rounding),
            daily_earned,
            rule.daily_cap,
        );
        if amount <= 0 {
            debug!(base, multiplier, "Reward reduced to zero");
            return Ok(GrantOutcome::NotEligible(Ineligible::ZeroReward));
        }

        let change = wallet::record_grant(
            &txn,
            &key,
            existing.as_ref(),
            GrantWrite {
                amount,
                daily_earned: daily_earned + amount,
                today,
                now,
                kind,
            },
        )
        .await?;
        txn.commit().await?;

        let daily_earned = reward::effective_daily_earned(Some(&change.wallet), kind, today);
        info!(
            amount,
            multiplier,
            balance = change.wallet.balance,
            daily_earned,
            "Granted {:?} reward",
            kind
        );
        Ok(GrantOutcome::Granted {
            amount,
            balance: change.wallet.balance,
            daily_earned,
        })
    }

    /// Both currency wallets of a member.
    pub async fn get_wallets(&self, guild_id: &str, user_id: &str) -> Result<WalletPair> {
        wallet::get_wallets(&self.db, guild_id, user_id).await
    }

    /// One leaderboard page: richest first, ties by user ID.
    pub async fn get_leaderboard(
        &self,
        guild_id: &str,
        currency: CurrencyType,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<WalletModel>> {
        wallet::get_leaderboard(&self.db, guild_id, currency, limit, offset).await
    }

    /// Number of ranked wallets for a currency.
    pub async fn count_wallets(&self, guild_id: &str, currency: CurrencyType) -> Result<u64> {
        wallet::count_wallets(&self.db, guild_id, currency).await
    }

    /// The guild's settings, or the configured defaults when none are saved.
    pub async fn get_settings(&self, guild_id: &str) -> Result<guild_settings::Model> {
        settings::get_settings(&self.db, guild_id, &self.defaults, self.clock.now()).await
    }

    /// Applies an admin settings change.
    #[instrument(skip(self, patch))]
    pub async fn update_settings(
        &self,
        guild_id: &str,
        patch: SettingsPatch,
    ) -> Result<guild_settings::Model> {
        let saved =
            settings::update_settings(&self.db, guild_id, &self.defaults, patch, self.clock.now())
                .await?;
        info!("Updated economy settings");
        Ok(saved)
    }

    /// Sets the reward multiplier for a channel or role.
    #[instrument(skip(self))]
    pub async fn set_multiplier(
        &self,
        guild_id: &str,
        target_kind: MultiplierTarget,
        target_id: &str,
        multiplier: f64,
    ) -> Result<reward_multiplier::Model> {
        let saved =
            settings::set_multiplier(&self.db, guild_id, target_kind, target_id, multiplier)
                .await?;
        info!("Set reward multiplier");
        Ok(saved)
    }

    /// Removes the reward multiplier for a channel or role.
    pub async fn remove_multiplier(
        &self,
        guild_id: &str,
        target_kind: MultiplierTarget,
        target_id: &str,
    ) -> Result<bool> {
        settings::remove_multiplier(&self.db, guild_id, target_kind, target_id).await
    }

    /// All reward multipliers of a guild.
    pub async fn list_multipliers(&self, guild_id: &str) -> Result<Vec<reward_multiplier::Model>> {
        settings::list_multipliers(&self.db, guild_id).await
    }

    /// Recent ledger entries for a wallet, newest first.
    pub async fn history(
        &self,
        guild_id: &str,
        user_id: &str,
        currency: CurrencyType,
        limit: u64,
    ) -> Result<Vec<transaction::Model>> {
        ledger::history(&self.db, guild_id, user_id, currency, limit).await
    }

    /// Sum of a wallet's ledger amounts.
    pub async fn ledger_balance(
        &self,
        guild_id: &str,
        user_id: &str,
        currency: CurrencyType,
    ) -> Result<i64> {
        ledger::ledger_balance(&self.db, guild_id, user_id, currency).await
    }

    /// Moves `amount` from one member to another. The sender also pays the guild's transfer fee.
    #[instrument(skip(self))]
    pub async fn transfer(
        &self,
        guild_id: &str,
        from_user_id: &str,
        to_user_id: &str,
        currency: CurrencyType,
        amount: i64,
    ) -> Result<TransferReceipt> {
        if amount <= 0 {
            return Err(Error::InvalidAmount { amount });
        }
        if from_user_id == to_user_id {
            return Err(Error::SelfTransfer);
        }

        let now = self.clock.now();
        let cfg = self.get_settings(guild_id).await?;
        let fee = reward::transfer_fee(amount, cfg.transfer_fee_bps);
        let total = amount
            .checked_add(fee)
            .ok_or(Error::InvalidAmount { amount })?;

        let from_key = WalletKey::new(guild_id, from_user_id, currency);
        let to_key = WalletKey::new(guild_id, to_user_id, currency);
        let _guards = self.locks.lock_pair(&from_key, &to_key).await;
        let txn = self.db.begin().await?;

        let available = wallet::find_wallet(&txn, &from_key)
            .await?
            .map_or(0, |w| w.balance);
        if available < total {
            return Err(Error::InsufficientFunds {
                current: available,
                required: total,
            });
        }

        let mut sender = wallet::apply_delta(
            &txn,
            &from_key,
            BalanceDelta {
                amount: -amount,
                kind: TransactionKind::TransferOut,
                related_user_id: Some(to_user_id),
                note: None,
                now,
            },
        )
        .await?;
        if fee > 0 {
            sender = wallet::apply_delta(
                &txn,
                &from_key,
                BalanceDelta {
                    amount: -fee,
                    kind: TransactionKind::Fee,
                    related_user_id: Some(to_user_id),
                    note: None,
                    now,
                },
            )
            .await?;
        }
        let recipient = wallet::apply_delta(
            &txn,
            &to_key,
            BalanceDelta {
                amount,
                kind: TransactionKind::TransferIn,
                related_user_id: Some(from_user_id),
                note: None,
                now,
            },
        )
        .await?;
        txn.commit().await?;

        info!(fee, "Transfer completed");
        Ok(TransferReceipt {
            amount,
            fee,
            sender_balance: sender.wallet.balance,
            recipient_balance: recipient.wallet.balance,
        })
    }

    /// Adds (positive `delta`) or removes (negative `delta`) currency on behalf of an admin.
    #[instrument(skip(self))]
    pub async fn admin_adjust(
        &self,
        guild_id: &str,
        user_id: &str,
        currency: CurrencyType,
        delta: i64,
        note: Option<&str>,
    ) -> Result<WalletModel> {
        if delta == 0 {
            return Err(Error::InvalidAmount { amount: 0 });
        }
        let kind = if delta > 0 {
            TransactionKind::AdminAdd
        } else {
            TransactionKind::AdminRemove
        };

        let key = WalletKey::new(guild_id, user_id, currency);
        let _guard = self.locks.lock(&key).await;
        let txn = self.db.begin().await?;
        let change = wallet::apply_delta(
            &txn,
            &key,
            BalanceDelta {
                amount: delta,
                kind,
                related_user_id: None,
                note,
                now: self.clock.now(),
            },
        )
        .await?;
        txn.commit().await?;

        info!(balance = change.wallet.balance, "Admin adjusted wallet");
        Ok(change.wallet)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeDelta;

    const GUILD: &str = "guild";

    fn activity<'a>(user_id: &'a str, channel_id: &'a str) -> Activity<'a> {
        Activity {
            guild_id: GUILD,
            user_id,
            channel_id,
            role_ids: &[],
        }
    }

    #[tokio::test]
    async fn test_short_message_is_not_granted() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;

        let outcome = service
            .grant_text_currency(&activity("alice", "chat"), 10)
            .await?;
        assert_eq!(
            outcome,
            GrantOutcome::NotEligible(Ineligible::MessageTooShort {
                length: 10,
                required: 15
            })
        );
        assert_eq!(outcome.amount(), None);

        let wallets = service.get_wallets(GUILD, "alice").await?;
        assert!(wallets.topy.is_none());
        assert!(service.history(GUILD, "alice", CurrencyType::Topy, 10).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_single_grant_credits_exactly_one() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;

        let outcome = service
            .grant_text_currency(&activity("alice", "chat"), 20)
            .await?;
        assert_eq!(
            outcome,
            GrantOutcome::Granted {
                amount: 1,
                balance: 1,
                daily_earned: 1
            }
        );

        let wallet = service.get_wallets(GUILD, "alice").await?.topy.unwrap();
        assert_eq!(wallet.balance, 1);
        assert_eq!(wallet.total_earned, 1);

        let entries = service.history(GUILD, "alice", CurrencyType::Topy, 10).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, TransactionKind::EarnText);
        assert_eq!(entries[0].amount, 1);
        assert_eq!(entries[0].balance_after, wallet.balance);

        Ok(())
    }

    #[tokio::test]
    async fn test_cooldown_blocks_second_grant() -> Result<()> {
        let (service, clock) = setup_service(test_defaults()).await?;
        let alice = activity("alice", "chat");

        assert!(service.grant_text_currency(&alice, 20).await?.is_granted());
        clock.advance(TimeDelta::seconds(10));
        let second = service.grant_text_currency(&alice, 20).await?;
        assert_eq!(
            second,
            GrantOutcome::NotEligible(Ineligible::Cooldown { remaining_secs: 20 })
        );

        clock.advance(TimeDelta::seconds(20));
        assert!(service.grant_text_currency(&alice, 20).await?.is_granted());
        assert_eq!(service.get_wallets(GUILD, "alice").await?.balance(CurrencyType::Topy), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_daily_cap_is_never_exceeded() -> Result<()> {
        let mut defaults = test_defaults();
        defaults.text_min_reward = 3;
        defaults.text_max_reward = 3;
        defaults.text_daily_cap = 10;
        let (service, clock) = setup_service(defaults).await?;
        let alice = activity("alice", "chat");

        let mut granted = Vec::new();
        for _ in 0..6 {
            if let GrantOutcome::Granted { amount, daily_earned, .. } =
                service.grant_text_currency(&alice, 20).await?
            {
                assert!(daily_earned <= 10);
                granted.push(amount);
            }
            clock.advance(TimeDelta::seconds(31));
        }
        // 3 + 3 + 3 + 1 (clamped), then capped
        assert_eq!(granted, vec![3, 3, 3, 1]);
        assert_eq!(
            service.grant_text_currency(&alice, 20).await?,
            GrantOutcome::NotEligible(Ineligible::DailyCapReached)
        );

        // Next guild-local day resets the counter
        clock.advance(TimeDelta::days(1));
        let outcome = service.grant_text_currency(&alice, 20).await?;
        assert_eq!(
            outcome,
            GrantOutcome::Granted {
                amount: 3,
                balance: 13,
                daily_earned: 3
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_matches_balance_after_many_grants() -> Result<()> {
        let mut defaults = test_defaults();
        defaults.text_min_reward = 1;
        defaults.text_max_reward = 9;
        defaults.voice_min_reward = 2;
        defaults.voice_max_reward = 7;
        defaults.text_daily_cap = 10_000;
        defaults.voice_daily_cap = 10_000;
        let (service, clock) = setup_service(defaults).await?;
        let alice = activity("alice", "chat");

        for i in 0..25 {
            if i % 3 == 0 {
                service.grant_voice_currency(&alice).await?;
            } else {
                service.grant_text_currency(&alice, 40).await?;
            }
            clock.advance(TimeDelta::seconds(61));
        }
        service
            .admin_adjust(GUILD, "alice", CurrencyType::Topy, -5, Some("correction"))
            .await?;

        let wallet = service.get_wallets(GUILD, "alice").await?.topy.unwrap();
        let ledger_sum = service.ledger_balance(GUILD, "alice", CurrencyType::Topy).await?;
        assert_eq!(wallet.balance, ledger_sum);

        let entries = service.history(GUILD, "alice", CurrencyType::Topy, 100).await?;
        assert_eq!(entries.len(), 26);
        assert_eq!(entries[0].balance_after, wallet.balance);
        assert_eq!(entries[0].kind, TransactionKind::AdminRemove);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_grants_same_wallet_serialize() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;
        let alice = activity("alice", "chat");

        let (first, second) = tokio::join!(
            service.grant_text_currency(&alice, 20),
            service.grant_text_currency(&alice, 20)
        );
        let outcomes = [first?, second?];
        let granted = outcomes.iter().filter(|o| o.is_granted()).count();
        assert_eq!(granted, 1, "outcomes: {outcomes:?}");

        let wallet = service.get_wallets(GUILD, "alice").await?.topy.unwrap();
        assert_eq!(wallet.balance, 1);
        assert_eq!(
            service.history(GUILD, "alice", CurrencyType::Topy, 10).await?.len(),
            1
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_grants_different_wallets_all_succeed() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;
        let (a, b, c) = (
            activity("alice", "chat"),
            activity("bob", "chat"),
            activity("carol", "chat"),
        );

        let (ra, rb, rc) = tokio::join!(
            service.grant_text_currency(&a, 20),
            service.grant_text_currency(&b, 20),
            service.grant_voice_currency(&c)
        );
        assert!(ra?.is_granted());
        assert!(rb?.is_granted());
        assert!(rc?.is_granted());

        Ok(())
    }

    #[tokio::test]
    async fn test_multipliers_and_hot_time() -> Result<()> {
        let mut defaults = test_defaults();
        defaults.text_min_reward = 4;
        defaults.text_max_reward = 4;
        defaults.hot_time_enabled = true;
        defaults.hot_time_multiplier = 2.0;
        // The test clock starts at 12:00 local time
        defaults.hot_time_start_minute = 11 * 60;
        defaults.hot_time_end_minute = 13 * 60;
        let (service, clock) = setup_service(defaults).await?;

        service
            .set_multiplier(GUILD, MultiplierTarget::Channel, "boosted", 1.5)
            .await?;
        service
            .set_multiplier(GUILD, MultiplierTarget::Channel, "muted", 0.0)
            .await?;
        service
            .set_multiplier(GUILD, MultiplierTarget::Role, "vip", 1.25)
            .await?;

        // 4 * 1.5 * 2.0 = 12
        let outcome = service
            .grant_text_currency(&activity("alice", "boosted"), 20)
            .await?;
        assert_eq!(outcome.amount(), Some(12));

        // 4 * 1.25 * 2.0 = 10
        let roles = vec!["vip".to_string()];
        let bob = Activity {
            guild_id: GUILD,
            user_id: "bob",
            channel_id: "plain",
            role_ids: &roles,
        };
        assert_eq!(service.grant_text_currency(&bob, 20).await?.amount(), Some(10));

        // A zero multiplier disables rewards and writes nothing
        let outcome = service
            .grant_text_currency(&activity("carol", "muted"), 20)
            .await?;
        assert_eq!(outcome, GrantOutcome::NotEligible(Ineligible::ZeroReward));
        assert!(service.get_wallets(GUILD, "carol").await?.topy.is_none());

        // Outside hot time: 4 * 1.5 = 6
        clock.advance(TimeDelta::hours(3));
        let outcome = service
            .grant_text_currency(&activity("alice", "boosted"), 20)
            .await?;
        assert_eq!(outcome.amount(), Some(6));

        Ok(())
    }

    #[tokio::test]
    async fn test_voice_grant_has_no_length_rule() -> Result<()> {
        let (service, clock) = setup_service(test_defaults()).await?;
        let alice = activity("alice", "voice");

        assert!(service.grant_voice_currency(&alice).await?.is_granted());
        clock.advance(TimeDelta::seconds(30));
        assert!(matches!(
            service.grant_voice_currency(&alice).await?,
            GrantOutcome::NotEligible(Ineligible::Cooldown { .. })
        ));
        clock.advance(TimeDelta::seconds(30));
        assert!(service.grant_voice_currency(&alice).await?.is_granted());

        let entries = service.history(GUILD, "alice", CurrencyType::Topy, 10).await?;
        assert!(entries.iter().all(|e| e.kind == TransactionKind::EarnVoice));

        Ok(())
    }

    #[tokio::test]
    async fn test_leaderboard_pagination_is_stable() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;

        // 25 users; pairs of users share a balance so ties must be broken by user ID
        for i in 0..25_i64 {
            let user = format!("user{i:02}");
            service
                .admin_adjust(GUILD, &user, CurrencyType::Topy, 100 - (i / 2), None)
                .await?;
        }

        let first = service.get_leaderboard(GUILD, CurrencyType::Topy, 10, 0).await?;
        let second = service.get_leaderboard(GUILD, CurrencyType::Topy, 10, 10).await?;
        let again = service.get_leaderboard(GUILD, CurrencyType::Topy, 10, 10).await?;
        assert_eq!(second, again);

        let full = service.get_leaderboard(GUILD, CurrencyType::Topy, 100, 0).await?;
        assert_eq!(full.len(), 25);
        assert_eq!(second, full[10..20].to_vec());
        assert_eq!(first, full[..10].to_vec());
        for pair in full.windows(2) {
            assert!(
                pair[0].balance > pair[1].balance
                    || (pair[0].balance == pair[1].balance && pair[0].user_id < pair[1].user_id)
            );
        }
        assert_eq!(second[0].user_id, "user10");
        assert_eq!(
            service.count_wallets(GUILD, CurrencyType::Topy).await?,
            25
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_with_fee() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;
        service
            .admin_adjust(GUILD, "alice", CurrencyType::Ruby, 1000, None)
            .await?;

        // test_defaults uses a 5% fee
        let receipt = service
            .transfer(GUILD, "alice", "bob", CurrencyType::Ruby, 200)
            .await?;
        assert_eq!(
            receipt,
            TransferReceipt {
                amount: 200,
                fee: 10,
                sender_balance: 790,
                recipient_balance: 200
            }
        );

        let sender_entries = service.history(GUILD, "alice", CurrencyType::Ruby, 10).await?;
        let kinds: Vec<_> = sender_entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Fee,
                TransactionKind::TransferOut,
                TransactionKind::AdminAdd
            ]
        );
        assert_eq!(sender_entries[1].related_user_id.as_deref(), Some("bob"));

        let recipient_entries = service.history(GUILD, "bob", CurrencyType::Ruby, 10).await?;
        assert_eq!(recipient_entries.len(), 1);
        assert_eq!(recipient_entries[0].kind, TransactionKind::TransferIn);
        assert_eq!(recipient_entries[0].related_user_id.as_deref(), Some("alice"));

        for user in ["alice", "bob"] {
            let balance = service
                .get_wallets(GUILD, user)
                .await?
                .balance(CurrencyType::Ruby);
            assert_eq!(
                balance,
                service.ledger_balance(GUILD, user, CurrencyType::Ruby).await?
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rejections() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;
        service
            .admin_adjust(GUILD, "alice", CurrencyType::Topy, 100, None)
            .await?;

        let result = service
            .transfer(GUILD, "alice", "alice", CurrencyType::Topy, 10)
            .await;
        assert!(matches!(result, Err(Error::SelfTransfer)));

        let result = service.transfer(GUILD, "alice", "bob", CurrencyType::Topy, 0).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: 0 })));

        // 100 + 5% fee = 105 > 100
        let result = service
            .transfer(GUILD, "alice", "bob", CurrencyType::Topy, 100)
            .await;
        assert!(matches!(
            result,
            Err(Error::InsufficientFunds {
                current: 100,
                required: 105
            })
        ));

        // Nothing moved
        assert_eq!(
            service.get_wallets(GUILD, "alice").await?.balance(CurrencyType::Topy),
            100
        );
        assert!(service.get_wallets(GUILD, "bob").await?.topy.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_admin_adjust_underflow_and_zero() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;

        let result = service
            .admin_adjust(GUILD, "alice", CurrencyType::Ruby, -1, None)
            .await;
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));

        let result = service
            .admin_adjust(GUILD, "alice", CurrencyType::Ruby, 0, None)
            .await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: 0 })));

        let wallet = service
            .admin_adjust(GUILD, "alice", CurrencyType::Ruby, 50, Some("event prize"))
            .await?;
        assert_eq!(wallet.balance, 50);
        let entries = service.history(GUILD, "alice", CurrencyType::Ruby, 1).await?;
        assert_eq!(entries[0].note.as_deref(), Some("event prize"));

        Ok(())
    }

    #[tokio::test]
    async fn test_settings_changes_apply_to_grants() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;

        service
            .update_settings(
                GUILD,
                SettingsPatch {
                    text_min_length: Some(50),
                    ..Default::default()
                },
            )
            .await?;
        assert_eq!(service.get_settings(GUILD).await?.text_min_length, 50);

        let outcome = service
            .grant_text_currency(&activity("alice", "chat"), 20)
            .await?;
        assert!(matches!(
            outcome,
            GrantOutcome::NotEligible(Ineligible::MessageTooShort { required: 50, .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_text_and_voice_limits_are_independent() -> Result<()> {
        let mut defaults = test_defaults();
        defaults.voice_min_reward = 150;
        defaults.voice_max_reward = 150;
        defaults.voice_daily_cap = 500;
        defaults.text_daily_cap = 100;
        let (service, clock) = setup_service(defaults).await?;
        let alice = activity("alice", "lounge");

        // Voice earnings above the chat cap do not block chat rewards
        assert_eq!(
            service.grant_voice_currency(&alice).await?,
            GrantOutcome::Granted {
                amount: 150,
                balance: 150,
                daily_earned: 150
            }
        );
        assert_eq!(
            service.grant_text_currency(&alice, 20).await?,
            GrantOutcome::Granted {
                amount: 1,
                balance: 151,
                daily_earned: 1
            }
        );

        // Chatting in between does not restart the voice cooldown
        clock.advance(TimeDelta::seconds(30));
        assert!(service.grant_text_currency(&alice, 20).await?.is_granted());
        clock.advance(TimeDelta::seconds(30));
        assert_eq!(
            service.grant_voice_currency(&alice).await?,
            GrantOutcome::Granted {
                amount: 150,
                balance: 302,
                daily_earned: 300
            }
        );

        let wallet = service.get_wallets(GUILD, "alice").await?.topy.unwrap();
        assert_eq!(wallet.text_daily_earned, 2);
        assert_eq!(wallet.voice_daily_earned, 300);
        assert!(wallet.text_daily_earned <= 100);

        Ok(())
    }

    #[tokio::test]
    async fn test_voice_tick_slightly_early_still_counts() -> Result<()> {
        let (service, clock) = setup_service(test_defaults()).await?;
        let alice = activity("alice", "lounge");

        assert!(service.grant_voice_currency(&alice).await?.is_granted());
        // The next sweep lands a millisecond before the 60 s cooldown ends
        clock.advance(TimeDelta::milliseconds(59_999));
        assert!(service.grant_voice_currency(&alice).await?.is_granted());

        clock.advance(TimeDelta::seconds(58));
        assert_eq!(
            service.grant_voice_currency(&alice).await?,
            GrantOutcome::NotEligible(Ineligible::Cooldown { remaining_secs: 2 })
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_out_of_range_cooldown_is_rejected() -> Result<()> {
        let (service, _clock) = setup_service(test_defaults()).await?;

        let result = service
            .update_settings(
                GUILD,
                SettingsPatch {
                    text_cooldown_secs: Some(i64::MAX),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(Error::Config { .. })));

        // Grants keep working on the unchanged settings
        assert!(
            service
                .grant_text_currency(&activity("alice", "chat"), 20)
                .await?
                .is_granted()
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_local_today_follows_service_clock() -> Result<()> {
        let mut defaults = test_defaults();
        defaults.utc_offset_minutes = 9 * 60;
        let (service, clock) = setup_service(defaults).await?;
        let settings = service.get_settings(GUILD).await?;

        // 12:00 UTC is 21:00 at UTC+9, 15:00 UTC is midnight
        assert_eq!(
            service.local_today(&settings),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        clock.advance(TimeDelta::hours(3));
        assert_eq!(
            service.local_today(&settings),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
        );

        Ok(())
    }
}
