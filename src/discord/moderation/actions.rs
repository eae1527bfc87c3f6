// Glue between the infraction ledger and the platform: file the case, post it
// to the log channel, and carry out an escalation if the policy fired.

use crate::core::logging::LogEvent;
use crate::core::moderation::{NewInfraction, RecordOutcome};
use crate::discord::logging::events::send_log;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

pub async fn record_infraction(
    ctx: &serenity::Context,
    data: &Data,
    new: NewInfraction,
) -> Result<RecordOutcome, Error> {
    let outcome = data.moderation.record(new).await?;
    log_case(ctx, data, LogEvent::InfractionRecorded(outcome.infraction.clone())).await;

    if let Some(auto) = &outcome.escalation {
        let guild_id = serenity::GuildId::new(auto.guild_id);
        let user_id = serenity::UserId::new(auto.offender_id);

        // The member may already be gone (e.g. a kick or ban triggered this).
        if let Err(e) = guild_id
            .kick_with_reason(&ctx.http, user_id, &auto.reason)
            .await
        {
            tracing::warn!(
                guild_id = auto.guild_id,
                user_id = auto.offender_id,
                case_id = auto.id,
                "Escalation kick failed: {}",
                e
            );
        }
        log_case(ctx, data, LogEvent::InfractionRecorded(auto.clone())).await;
    }

    Ok(outcome)
}

async fn log_case(ctx: &serenity::Context, data: &Data, event: LogEvent) {
    if let Err(e) = send_log(ctx, data, event).await {
        tracing::error!("Failed to log infraction: {}", e);
    }
}

/// Short confirmation shown to the moderator after a case is filed.
pub fn outcome_summary(outcome: &RecordOutcome) -> String {
    let case = &outcome.infraction;
    let mut summary = format!(
        "Case #{}: {} <@{}> | {}",
        case.id,
        case.kind.label(),
        case.offender_id,
        case.reason
    );
    if let Some(auto) = &outcome.escalation {
        summary.push_str(&format!(
            "\nCase #{}: member was automatically kicked ({})",
            auto.id, auto.reason
        ));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{Infraction, InfractionKind, Issuer};
    use chrono::Utc;

    fn case(id: u64, kind: InfractionKind, moderator: Issuer, reason: &str) -> Infraction {
        Infraction {
            id,
            guild_id: 1,
            offender_id: 42,
            moderator,
            kind,
            reason: reason.into(),
            created: Utc::now(),
            until: None,
            deleted: false,
        }
    }

    #[test]
    fn summary_mentions_escalation() {
        let plain = RecordOutcome {
            infraction: case(4, InfractionKind::Warn, Issuer::User(7), "spam"),
            escalation: None,
        };
        assert_eq!(outcome_summary(&plain), "Case #4: Warn <@42> | spam");

        let escalated = RecordOutcome {
            infraction: case(5, InfractionKind::Warn, Issuer::User(7), "spam"),
            escalation: Some(case(
                6,
                InfractionKind::AutoAction,
                Issuer::System,
                "violated 5 infractions.",
            )),
        };
        let summary = outcome_summary(&escalated);
        assert!(summary.contains("Case #6"));
        assert!(summary.contains("violated 5 infractions."));
    }
}
