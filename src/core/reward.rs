//! Reward rules - pure functions behind activity grants.
//!
//! Nothing here touches the database. The currency service loads settings and
//! wallet state, then asks these functions whether a reward is due and how
//! large it is.

use crate::entities::{RoundingPolicy, TransactionKind, guild_settings, wallet};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use rand::Rng;

const MINUTES_PER_DAY: i32 = 24 * 60;
const BASIS_POINTS: i128 = 10_000;

/// Which activity a reward is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardKind {
    /// Chat message
    Text,
    /// Voice presence tick
    Voice,
}

impl RewardKind {
    /// Ledger kind written for this reward.
    #[must_use]
    pub const fn transaction_kind(self) -> TransactionKind {
        match self {
            Self::Text => TransactionKind::EarnText,
            Self::Voice => TransactionKind::EarnVoice,
        }
    }
}

/// Why an activity did not earn a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    /// The message is shorter than the configured minimum
    MessageTooShort {
        /// Length of the message in characters
        length: usize,
        /// Configured minimum
        required: usize,
    },
    /// The previous reward was too recent
    Cooldown {
        /// Seconds until the next reward is possible
        remaining_secs: i64,
    },
    /// The wallet already earned the daily cap today
    DailyCapReached,
    /// Multipliers reduced the reward to nothing
    ZeroReward,
}

/// Reward parameters for one activity kind, extracted from guild settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardRule {
    /// Activity the rule applies to
    pub kind: RewardKind,
    /// Minimum message length; `None` for voice
    pub min_length: Option<usize>,
    /// Minimum whole seconds between two rewards of this kind
    pub cooldown_secs: i64,
    /// Lower bound of the base roll
    pub min_reward: i64,
    /// Upper bound of the base roll
    pub max_reward: i64,
    /// Maximum rewards per guild-local day
    pub daily_cap: i64,
}

impl RewardRule {
    /// Extracts the rule for `kind` from `settings`.
    #[must_use]
    pub fn for_kind(settings: &guild_settings::Model, kind: RewardKind) -> Self {
        match kind {
            RewardKind::Text => Self {
                kind,
                min_length: Some(usize::try_from(settings.text_min_length).unwrap_or(0)),
                cooldown_secs: settings.text_cooldown_secs,
                min_reward: settings.text_min_reward,
                max_reward: settings.text_max_reward,
                daily_cap: settings.text_daily_cap,
            },
            RewardKind::Voice => Self {
                kind,
                min_length: None,
                cooldown_secs: settings.voice_cooldown_secs,
                min_reward: settings.voice_min_reward,
                max_reward: settings.voice_max_reward,
                daily_cap: settings.voice_daily_cap,
            },
        }
    }
}

/// The guild's timezone. Out-of-range offsets fall back to UTC.
#[must_use]
pub fn guild_offset(settings: &guild_settings::Model) -> FixedOffset {
    FixedOffset::east_opt(settings.utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix())
}

/// Calendar date at `now` in the guild's timezone.
#[must_use]
pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Minutes since local midnight at `now`.
#[must_use]
pub fn local_minute_of_day(now: DateTime<Utc>, offset: FixedOffset) -> i32 {
    let local = now.with_timezone(&offset);
    // hour < 24 and minute < 60, so this always fits
    i32::try_from(local.hour() * 60 + local.minute()).unwrap_or(0)
}

/// Today's earnings of one reward kind; a counter from an earlier day is zero.
#[must_use]
pub fn effective_daily_earned(
    wallet: Option<&wallet::Model>,
    kind: RewardKind,
    today: NaiveDate,
) -> i64 {
    wallet
        .filter(|w| w.daily_earned_date == today)
        .map_or(0, |w| match kind {
            RewardKind::Text => w.text_daily_earned,
            RewardKind::Voice => w.voice_daily_earned,
        })
}

/// When the wallet last received a reward of `kind`.
#[must_use]
pub fn last_grant_at(wallet: &wallet::Model, kind: RewardKind) -> Option<DateTime<Utc>> {
    match kind {
        RewardKind::Text => wallet.last_text_grant_at,
        RewardKind::Voice => wallet.last_voice_grant_at,
    }
}

/// Rejects messages shorter than the rule's minimum.
pub fn check_message_length(rule: &RewardRule, length: usize) -> Result<(), Ineligible> {
    match rule.min_length {
        Some(required) if length < required => {
            Err(Ineligible::MessageTooShort { length, required })
        }
        _ => Ok(()),
    }
}

/// Checks the rule's cooldown and daily cap for a wallet (absent wallets are always eligible).
///
/// Elapsed time counts in whole seconds, rounded up: a reward that arrives a
/// fraction of a second before the cooldown ends is accepted. Returns today's
/// effective earnings of the rule's kind on success.
pub fn check_wallet(
    rule: &RewardRule,
    wallet: Option<&wallet::Model>,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> Result<i64, Ineligible> {
    if let Some(last) = wallet.and_then(|w| last_grant_at(w, rule.kind)) {
        let elapsed_ms = (now - last).num_milliseconds().max(0);
        let elapsed_secs = elapsed_ms.saturating_add(999) / 1000;
        if elapsed_secs < rule.cooldown_secs {
            return Err(Ineligible::Cooldown {
                remaining_secs: rule.cooldown_secs - elapsed_secs,
            });
        }
    }

    let daily_earned = effective_daily_earned(wallet, rule.kind, today);
    if daily_earned >= rule.daily_cap {
        return Err(Ineligible::DailyCapReached);
    }
    Ok(daily_earned)
}

/// Whether the guild's hot-time window contains `now`.
///
/// The window is `[start, end)` in local minutes and wraps past midnight when
/// `start > end`. Equal bounds describe an empty window.
#[must_use]
pub fn is_hot_time(settings: &guild_settings::Model, now: DateTime<Utc>) -> bool {
    if !settings.hot_time_enabled {
        return false;
    }
    let start = settings.hot_time_start_minute.rem_euclid(MINUTES_PER_DAY);
    let end = settings.hot_time_end_minute.rem_euclid(MINUTES_PER_DAY);
    let minute = local_minute_of_day(now, guild_offset(settings));

    match start.cmp(&end) {
        std::cmp::Ordering::Less => (start..end).contains(&minute),
        std::cmp::Ordering::Greater => minute >= start || minute < end,
        std::cmp::Ordering::Equal => false,
    }
}

/// Combines the channel multiplier, the best role multiplier and hot time.
///
/// Missing factors count as 1.0. Role multipliers do not stack; only the
/// highest one applies.
#[must_use]
pub fn combined_multiplier(channel: Option<f64>, roles: &[f64], hot_time: Option<f64>) -> f64 {
    let role = roles.iter().copied().reduce(f64::max);
    channel.unwrap_or(1.0) * role.unwrap_or(1.0) * hot_time.unwrap_or(1.0)
}

/// Applies `multiplier` to `base` and rounds per `policy`. Negative results become zero.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn apply_multiplier(base: i64, multiplier: f64, policy: RoundingPolicy) -> i64 {
    if !multiplier.is_finite() || multiplier <= 0.0 || base <= 0 {
        return 0;
    }
    let raw = base as f64 * multiplier;
    let rounded = match policy {
        RoundingPolicy::Floor => raw.floor(),
        RoundingPolicy::Round => raw.round(),
        RoundingPolicy::Ceil => raw.ceil(),
    };
    // `as` saturates at i64::MAX for huge values
    rounded as i64
}

/// Shrinks `amount` so that `daily_earned + amount` stays within `daily_cap`.
#[must_use]
pub fn clamp_to_cap(amount: i64, daily_earned: i64, daily_cap: i64) -> i64 {
    let remaining = daily_cap.saturating_sub(daily_earned).max(0);
    amount.clamp(0, remaining)
}

/// Rolls a uniform base reward in `[min, max]` (bounds may be given in either order).
pub fn roll_base<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    rng.gen_range(low..=high)
}

/// Fee charged on a transfer of `amount` at `fee_bps` basis points, rounded down.
#[must_use]
pub fn transfer_fee(amount: i64, fee_bps: i64) -> i64 {
    let fee = i128::from(amount.max(0)) * i128::from(fee_bps.max(0)) / BASIS_POINTS;
    i64::try_from(fee).unwrap_or(i64::MAX)
}
