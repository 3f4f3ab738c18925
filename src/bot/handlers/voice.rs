//! Voice presence sweep.
//!
//! Every `voice_sweep_secs` the sweep snapshots the voice states held in the
//! serenity cache and attempts a voice reward for each seated member. The
//! snapshot is taken synchronously so no cache reference is held across an
//! await; grants then run one after another.

use crate::core::{Activity, CurrencyService, GrantOutcome};
use poise::serenity_prelude as serenity;
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// One member sitting in a voice channel at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSeat {
    /// Guild ID
    pub guild_id: String,
    /// User ID
    pub user_id: String,
    /// Voice channel, `None` if the member has just left
    pub channel_id: Option<String>,
    /// The member's role IDs, when the member is cached
    pub role_ids: Vec<String>,
    /// Whether the member is a bot
    pub is_bot: bool,
    /// Server- or self-deafened
    pub deafened: bool,
}

impl VoiceSeat {
    /// Bots, deafened members and members without a channel earn nothing.
    #[must_use]
    pub const fn is_rewardable(&self) -> bool {
        self.channel_id.is_some() && !self.is_bot && !self.deafened
    }
}

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Seats that received a reward
    pub granted: usize,
    /// Seats that were skipped or not eligible
    pub skipped: usize,
    /// Seats whose grant failed
    pub failed: usize,
}

/// Collects every voice seat known to the cache.
#[must_use]
pub fn snapshot(cache: &serenity::Cache) -> Vec<VoiceSeat> {
    let mut seats = Vec::new();
    for guild_id in cache.guilds() {
        let Some(guild) = cache.guild(guild_id) else {
            continue;
        };
        for (user_id, state) in &guild.voice_states {
            let member = state.member.as_ref().or_else(|| guild.members.get(user_id));
            seats.push(VoiceSeat {
                guild_id: guild_id.to_string(),
                user_id: user_id.to_string(),
                channel_id: state.channel_id.map(|id| id.to_string()),
                role_ids: member
                    .map(|m| m.roles.iter().map(ToString::to_string).collect())
                    .unwrap_or_default(),
                is_bot: member.is_some_and(|m| m.user.bot),
                deafened: state.deaf || state.self_deaf,
            });
        }
    }
    seats
}

/// Attempts a voice reward for every rewardable seat, sequentially.
pub async fn sweep_once(service: &CurrencyService, seats: &[VoiceSeat]) -> SweepSummary {
    let mut summary = SweepSummary::default();
    for seat in seats {
        let Some(channel_id) = seat.channel_id.as_deref().filter(|_| seat.is_rewardable()) else {
            summary.skipped += 1;
            continue;
        };
        let activity = Activity {
            guild_id: &seat.guild_id,
            user_id: &seat.user_id,
            channel_id,
            role_ids: &seat.role_ids,
        };
        match service.grant_voice_currency(&activity).await {
            Ok(GrantOutcome::Granted { .. }) => summary.granted += 1,
            Ok(GrantOutcome::NotEligible(_)) => summary.skipped += 1,
            Err(e) => {
                warn!(
                    guild = %seat.guild_id,
                    user = %seat.user_id,
                    "Dropping voice reward after error: {e}"
                );
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Runs the sweep forever at the given period. Spawned once the bot is ready.
pub async fn run_voice_sweep(ctx: serenity::Context, service: Arc<CurrencyService>, period: Duration) {
    info!("Starting voice sweep every {}s", period.as_secs());
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; members need a full period in voice.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let seats = snapshot(&ctx.cache);
        if seats.is_empty() {
            continue;
        }
        let summary = sweep_once(&service, &seats).await;
        debug!(?summary, "Voice sweep finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::test_utils::*;
    use crate::entities::CurrencyType;
    use chrono::TimeDelta;

    fn seat(user_id: &str) -> VoiceSeat {
        VoiceSeat {
            guild_id: "guild".to_string(),
            user_id: user_id.to_string(),
            channel_id: Some("lounge".to_string()),
            role_ids: Vec::new(),
            is_bot: false,
            deafened: false,
        }
    }

    #[test]
    fn test_rewardable_seats() {
        assert!(seat("alice").is_rewardable());
        assert!(!VoiceSeat { is_bot: true, ..seat("bot") }.is_rewardable());
        assert!(!VoiceSeat { deafened: true, ..seat("alice") }.is_rewardable());
        assert!(!VoiceSeat { channel_id: None, ..seat("alice") }.is_rewardable());
    }

    #[tokio::test]
    async fn test_sweep_grants_each_seated_member() -> Result<()> {
        let (service, clock) = setup_service(test_defaults()).await?;
        let seats = vec![
            seat("alice"),
            seat("bob"),
            VoiceSeat { is_bot: true, ..seat("music") },
            VoiceSeat { deafened: true, ..seat("carol") },
        ];

        let summary = sweep_once(&service, &seats).await;
        assert_eq!(summary, SweepSummary { granted: 2, skipped: 2, failed: 0 });
        assert_eq!(service.get_wallets("guild", "alice").await?.balance(CurrencyType::Topy), 1);
        assert!(service.get_wallets("guild", "music").await?.topy.is_none());

        // Within the cooldown nobody earns again
        let summary = sweep_once(&service, &seats).await;
        assert_eq!(summary.granted, 0);

        clock.advance(TimeDelta::seconds(60));
        let summary = sweep_once(&service, &seats).await;
        assert_eq!(summary.granted, 2);
        assert_eq!(service.get_wallets("guild", "bob").await?.balance(CurrencyType::Topy), 2);

        Ok(())
    }
}
