//! Shared test utilities.
//!
//! Provides an in-memory database with all tables created, deterministic
//! economy defaults, and a clock that only moves when a test advances it.

use crate::{
    config::EconomyDefaults,
    core::{Clock, CurrencyService},
    entities::RoundingPolicy,
    errors::Result,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::sync::{Arc, Mutex, PoisonError};

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Economy defaults with a fixed reward so outcomes are predictable.
///
/// # Defaults
/// * text: min length 15, cooldown 30s, reward [1, 1], daily cap 100
/// * voice: cooldown 60s, reward [1, 1], daily cap 100
/// * hot time disabled, floor rounding, UTC, 5% transfer fee
#[must_use]
pub fn test_defaults() -> EconomyDefaults {
    EconomyDefaults {
        topy_name: "Topy".to_string(),
        ruby_name: "Ruby".to_string(),
        text_min_length: 15,
        text_cooldown_secs: 30,
        text_min_reward: 1,
        text_max_reward: 1,
        text_daily_cap: 100,
        voice_cooldown_secs: 60,
        voice_min_reward: 1,
        voice_max_reward: 1,
        voice_daily_cap: 100,
        hot_time_enabled: false,
        hot_time_start_minute: 0,
        hot_time_end_minute: 0,
        hot_time_multiplier: 1.0,
        rounding: RoundingPolicy::Floor,
        utc_offset_minutes: 0,
        transfer_fee_bps: 500,
    }
}

/// A clock that starts at 2024-05-01 12:00:00 UTC and moves only via [`ManualClock::advance`].
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock at the fixed test start time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sets up a currency service over a fresh in-memory database and a manual clock.
/// Returns (service, clock) so tests can move time forward.
pub async fn setup_service(
    defaults: EconomyDefaults,
) -> Result<(CurrencyService, Arc<ManualClock>)> {
    let db = setup_test_db().await?;
    let clock = Arc::new(ManualClock::new());
    let service = CurrencyService::new(db, defaults).with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
    Ok((service, clock))
}
