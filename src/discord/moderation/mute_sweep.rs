// Background task that lifts role-based mutes once their `until` passes.
// Platform timeouts expire on their own and are left alone.

use crate::core::moderation::{Infraction, InfractionFilter, InfractionKind, ModerationService};
use crate::core::settings::SettingsService;
use crate::discord::Error;
use crate::infra::moderation::SqliteInfractionStore;
use crate::infra::settings::SqliteSettingsStore;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

// How far back the first sweep after startup looks for mutes that expired while offline.
const STARTUP_LOOKBACK_HOURS: i64 = 24;

/// Whether any other live timed case still keeps the member muted at `now`.
pub fn still_muted(history: &[Infraction], lifted_case: u64, now: DateTime<Utc>) -> bool {
    history.iter().any(|case| {
        case.id != lifted_case
            && !case.deleted
            && case.kind.is_timed()
            && case.until.is_some_and(|until| until > now)
    })
}

pub fn needs_role_removal(case: &Infraction) -> bool {
    matches!(case.kind, InfractionKind::Mute | InfractionKind::AutoMute)
}

/// Whether removing `case` from the record should also end the restriction it
/// imposed. `history` is the member's remaining live cases.
pub fn lifts_on_removal(case: &Infraction, history: &[Infraction], now: DateTime<Utc>) -> bool {
    case.kind.is_timed()
        && case.until.is_some_and(|until| until > now)
        && !still_muted(history, case.id, now)
}

pub async fn run(
    http: Arc<serenity::Http>,
    moderation: Arc<ModerationService<SqliteInfractionStore>>,
    settings: Arc<SettingsService<SqliteSettingsStore>>,
    every: Duration,
) {
    let mut last_sweep = Utc::now() - chrono::Duration::hours(STARTUP_LOOKBACK_HOURS);
    let mut ticker = tokio::time::interval(every);

    loop {
        ticker.tick().await;
        let now = Utc::now();
        match sweep(&http, &moderation, &settings, last_sweep, now).await {
            Ok(0) => tracing::debug!("Mute sweep found nothing to lift"),
            Ok(lifted) => tracing::info!(lifted, "Mute sweep lifted expired mutes"),
            Err(e) => {
                // Keep the window open so the next tick retries.
                tracing::warn!("Mute sweep failed: {}", e);
                continue;
            }
        }
        last_sweep = now;
    }
}

async fn sweep(
    http: &serenity::Http,
    moderation: &ModerationService<SqliteInfractionStore>,
    settings: &SettingsService<SqliteSettingsStore>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<usize, Error> {
    let mut lifted = 0;

    for case in moderation.expiring_between(from, to).await? {
        if !needs_role_removal(&case) {
            continue;
        }

        let guild_settings = settings.get_or_create(case.guild_id).await?;
        let Some(mute_role) = guild_settings.mute_role else {
            continue;
        };

        let history = moderation
            .find(case.guild_id, InfractionFilter::offender(case.offender_id))
            .await?;
        if still_muted(&history, case.id, to) {
            continue;
        }

        let result = http
            .remove_member_role(
                serenity::GuildId::new(case.guild_id),
                serenity::UserId::new(case.offender_id),
                serenity::RoleId::new(mute_role),
                Some("Mute expired"),
            )
            .await;

        match result {
            Ok(()) => lifted += 1,
            Err(e) => tracing::warn!(
                guild_id = case.guild_id,
                user_id = case.offender_id,
                case_id = case.id,
                "Failed to lift mute: {}",
                e
            ),
        }
    }

    Ok(lifted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::Issuer;

    fn case(id: u64, kind: InfractionKind, until: Option<DateTime<Utc>>) -> Infraction {
        Infraction {
            id,
            guild_id: 1,
            offender_id: 2,
            moderator: Issuer::User(3),
            kind,
            reason: "x".into(),
            created: Utc::now(),
            until,
            deleted: false,
        }
    }

    #[test]
    fn newer_mute_keeps_member_muted() {
        let now = Utc::now();
        let expired = case(1, InfractionKind::Mute, Some(now - chrono::Duration::minutes(1)));
        let newer = case(2, InfractionKind::Mute, Some(now + chrono::Duration::hours(1)));
        let warn = case(3, InfractionKind::Warn, None);

        assert!(still_muted(&[expired.clone(), newer.clone()], 1, now));
        assert!(!still_muted(&[expired.clone(), warn], 1, now));

        let mut removed = newer;
        removed.deleted = true;
        assert!(!still_muted(&[expired, removed], 1, now));
    }

    #[test]
    fn removing_an_active_mute_lifts_it() {
        let now = Utc::now();
        let active = case(4, InfractionKind::Mute, Some(now + chrono::Duration::minutes(60)));
        let lapsed = case(5, InfractionKind::Mute, Some(now - chrono::Duration::minutes(1)));
        let other = case(6, InfractionKind::Timeout, Some(now + chrono::Duration::hours(2)));

        assert!(lifts_on_removal(&active, &[], now));
        assert!(!lifts_on_removal(&lapsed, &[], now));
        assert!(!lifts_on_removal(&active, &[other], now));
        assert!(!lifts_on_removal(&case(7, InfractionKind::Warn, None), &[], now));
    }

    #[test]
    fn only_role_mutes_need_lifting() {
        assert!(needs_role_removal(&case(1, InfractionKind::Mute, None)));
        assert!(needs_role_removal(&case(1, InfractionKind::AutoMute, None)));
        assert!(!needs_role_removal(&case(1, InfractionKind::Timeout, None)));
    }
}
