// Moderation slash/prefix commands.
//
// Each command checks the role hierarchy, performs the platform action, then
// files the case through `record_infraction`, which also handles escalation.

use crate::core::logging::LogEvent;
use crate::core::moderation::{Infraction, InfractionFilter, InfractionKind, Issuer, NewInfraction};
use crate::discord::logging::events::send_log;
use crate::discord::logging::formatter::{infraction_embed, truncate};
use crate::discord::moderation::actions::{outcome_summary, record_infraction};
use crate::discord::moderation::mute_sweep;
use crate::discord::permissions::{check_target, is_moderator};
use crate::discord::{Context, Error};
use chrono::{Duration, Utc};
use poise::serenity_prelude as serenity;

// Discord caps timeouts at 28 days.
const MAX_TIMEOUT_MINUTES: u32 = 28 * 24 * 60;
const DEFAULT_MUTE_MINUTES: u32 = 60;
const CASES_PER_PAGE: usize = 10;

fn issuer(ctx: Context<'_>) -> Issuer {
    Issuer::User(ctx.author().id.get())
}

fn require_guild(ctx: Context<'_>) -> Result<serenity::GuildId, Error> {
    Ok(ctx.guild_id().ok_or("This command only works in servers")?)
}

async fn file_case(ctx: Context<'_>, new: NewInfraction) -> Result<(), Error> {
    let outcome = record_infraction(ctx.serenity_context(), ctx.data(), new).await?;
    ctx.say(outcome_summary(&outcome)).await?;
    Ok(())
}

async fn apply_timeout(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    minutes: u32,
) -> Result<chrono::DateTime<Utc>, Error> {
    let until = Utc::now() + Duration::minutes(minutes as i64);
    let timestamp = serenity::Timestamp::from_unix_timestamp(until.timestamp())?;
    guild_id
        .edit_member(
            ctx,
            user_id,
            serenity::EditMember::new().disable_communication_until_datetime(timestamp),
        )
        .await?;
    Ok(until)
}

/// Warn a member.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member to warn"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    if !check_target(ctx, &member).await? {
        return Ok(());
    }

    let new = NewInfraction::new(
        require_guild(ctx)?.get(),
        member.user.id.get(),
        issuer(ctx),
        InfractionKind::Warn,
        reason,
    );
    file_case(ctx, new).await
}

/// Mute a member with the mute role, or a timeout if the server prefers that.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "Member to mute"] member: serenity::Member,
    #[description = "Duration in minutes (default 60)"]
    #[min = 1]
    #[max = 40320]
    minutes: Option<u32>,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    if !check_target(ctx, &member).await? {
        return Ok(());
    }

    let guild_id = require_guild(ctx)?;
    let settings = ctx.data().settings.get_or_create(guild_id.get()).await?;
    let minutes = minutes
        .unwrap_or(DEFAULT_MUTE_MINUTES)
        .clamp(1, MAX_TIMEOUT_MINUTES);

    let (kind, until) = match settings.mute_role {
        Some(role_id) if !settings.timeout_instead_of_mute => {
            ctx.http()
                .add_member_role(
                    guild_id,
                    member.user.id,
                    serenity::RoleId::new(role_id),
                    reason.as_deref(),
                )
                .await?;
            (InfractionKind::Mute, Utc::now() + Duration::minutes(minutes as i64))
        }
        _ => {
            let until = apply_timeout(ctx, guild_id, member.user.id, minutes).await?;
            (InfractionKind::Timeout, until)
        }
    };

    let new = NewInfraction::new(guild_id.get(), member.user.id.get(), issuer(ctx), kind, reason)
        .until(until);
    file_case(ctx, new).await
}

/// Lift a mute or timeout early.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "Member to unmute"] member: serenity::Member,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    let settings = ctx.data().settings.get_or_create(guild_id.get()).await?;

    if let Some(role_id) = settings.mute_role {
        let role_id = serenity::RoleId::new(role_id);
        if member.roles.contains(&role_id) {
            ctx.http()
                .remove_member_role(guild_id, member.user.id, role_id, Some("Unmuted"))
                .await?;
        }
    }
    if member.communication_disabled_until.is_some() {
        guild_id
            .edit_member(
                ctx,
                member.user.id,
                serenity::EditMember::new().enable_communication(),
            )
            .await?;
    }

    ctx.say(format!("{} can talk again.", member.user.name)).await?;
    Ok(())
}

/// Time a member out.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn timeout(
    ctx: Context<'_>,
    #[description = "Member to time out"] member: serenity::Member,
    #[description = "Duration in minutes"]
    #[min = 1]
    #[max = 40320]
    minutes: u32,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    if !check_target(ctx, &member).await? {
        return Ok(());
    }

    let guild_id = require_guild(ctx)?;
    let until = apply_timeout(ctx, guild_id, member.user.id, minutes.clamp(1, MAX_TIMEOUT_MINUTES)).await?;
    let new = NewInfraction::new(
        guild_id.get(),
        member.user.id.get(),
        issuer(ctx),
        InfractionKind::Timeout,
        reason,
    )
    .until(until);
    file_case(ctx, new).await
}

/// Kick a member.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    if !check_target(ctx, &member).await? {
        return Ok(());
    }

    let guild_id = require_guild(ctx)?;
    let new = NewInfraction::new(
        guild_id.get(),
        member.user.id.get(),
        issuer(ctx),
        InfractionKind::Kick,
        reason,
    );
    guild_id
        .kick_with_reason(ctx.http(), member.user.id, &new.reason)
        .await?;
    file_case(ctx, new).await
}

/// Ban a user, whether or not they are still in the server.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Days of messages to delete (0-7)"]
    #[min = 0]
    #[max = 7]
    delete_days: Option<u8>,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    if let Ok(member) = guild_id.member(ctx, user.id).await {
        if !check_target(ctx, &member).await? {
            return Ok(());
        }
    }

    let new = NewInfraction::new(
        guild_id.get(),
        user.id.get(),
        issuer(ctx),
        InfractionKind::Ban,
        reason,
    );
    guild_id
        .ban_with_reason(ctx.http(), user.id, delete_days.unwrap_or(0).min(7), &new.reason)
        .await?;
    file_case(ctx, new).await
}

/// Ban and immediately unban a member to clear a day of their messages.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn softban(
    ctx: Context<'_>,
    #[description = "Member to soft-ban"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    if !check_target(ctx, &member).await? {
        return Ok(());
    }

    let guild_id = require_guild(ctx)?;
    let new = NewInfraction::new(
        guild_id.get(),
        member.user.id.get(),
        issuer(ctx),
        InfractionKind::SoftBan,
        reason,
    );
    guild_id
        .ban_with_reason(ctx.http(), member.user.id, 1, &new.reason)
        .await?;
    guild_id.unban(ctx.http(), member.user.id).await?;
    file_case(ctx, new).await
}

/// Lift a ban.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "User to unban"] user: serenity::User,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?;
    guild_id.unban(ctx.http(), user.id).await?;

    let new = NewInfraction::new(
        guild_id.get(),
        user.id.get(),
        issuer(ctx),
        InfractionKind::Unban,
        reason,
    );
    file_case(ctx, new).await
}

pub fn case_line(infraction: &Infraction) -> String {
    format!(
        "`#{}` **{}** by {} <t:{}:R>\n{}",
        infraction.id,
        infraction.kind.label(),
        infraction.moderator.mention(),
        infraction.created.timestamp(),
        truncate(&infraction.reason, 200)
    )
}

/// List a member's cases, optionally only those filed by one moderator.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn infractions(
    ctx: Context<'_>,
    #[description = "Offender"] user: Option<serenity::User>,
    #[description = "Only cases filed by this moderator"] moderator: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?.get();
    let filter = InfractionFilter {
        offender: user.as_ref().map(|u| u.id.get()),
        moderator: moderator.as_ref().map(|u| u.id.get()),
    };

    let cases = ctx.data().moderation.find(guild_id, filter).await?;
    if cases.is_empty() {
        ctx.say("No infractions found.").await?;
        return Ok(());
    }

    let title = match &user {
        Some(user) => format!("Infractions for {}", user.tag()),
        None => "Infractions".to_string(),
    };
    let body = cases
        .iter()
        .rev()
        .take(CASES_PER_PAGE)
        .map(case_line)
        .collect::<Vec<_>>()
        .join("\n\n");

    let embed = serenity::CreateEmbed::new()
        .title(title)
        .description(truncate(&body, 4000))
        .color(serenity::Color::ORANGE)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Showing latest {} of {}",
            cases.len().min(CASES_PER_PAGE),
            cases.len()
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show one case.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn case(
    ctx: Context<'_>,
    #[description = "Case number"] id: u64,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?.get();
    match ctx.data().moderation.get(guild_id, id).await? {
        Some(infraction) => {
            let offender = ctx
                .data()
                .users
                .display_name(ctx.http(), infraction.offender_id)
                .await;
            let embed = infraction_embed(&infraction).description(format!("Offender: {}", offender));
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
        None => {
            ctx.say(format!("Case #{} does not exist.", id)).await?;
        }
    }
    Ok(())
}

/// End the mute or timeout a removed case imposed. Failures are logged; the
/// case is already gone by the time this runs.
async fn lift_restriction(ctx: Context<'_>, case: &Infraction) {
    let guild_id = serenity::GuildId::new(case.guild_id);
    let user_id = serenity::UserId::new(case.offender_id);

    let result = if mute_sweep::needs_role_removal(case) {
        match ctx.data().settings.get_or_create(case.guild_id).await {
            Ok(settings) => match settings.mute_role {
                Some(role_id) => ctx
                    .http()
                    .remove_member_role(
                        guild_id,
                        user_id,
                        serenity::RoleId::new(role_id),
                        Some("Mute case removed"),
                    )
                    .await
                    .map_err(Error::from),
                None => Ok(()),
            },
            Err(e) => Err(e.into()),
        }
    } else {
        guild_id
            .edit_member(ctx, user_id, serenity::EditMember::new().enable_communication())
            .await
            .map(|_| ())
            .map_err(Error::from)
    };

    if let Err(e) = result {
        tracing::warn!(
            guild_id = case.guild_id,
            user_id = case.offender_id,
            case_id = case.id,
            "Failed to lift restriction of removed case: {}",
            e
        );
    }
}

/// Remove a case from the record. The case number is not reused.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn delcase(
    ctx: Context<'_>,
    #[description = "Case number"] id: u64,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?.get();
    match ctx.data().moderation.delete(guild_id, id).await? {
        Some(infraction) => {
            let history = ctx
                .data()
                .moderation
                .find(guild_id, InfractionFilter::offender(infraction.offender_id))
                .await?;
            if mute_sweep::lifts_on_removal(&infraction, &history, Utc::now()) {
                lift_restriction(ctx, &infraction).await;
            }

            ctx.say(format!("Removed case #{}.", id)).await?;
            let event = LogEvent::InfractionRemoved {
                infraction,
                removed_by: ctx.author().id.get(),
            };
            if let Err(e) = send_log(ctx.serenity_context(), ctx.data(), event).await {
                tracing::error!("Failed to log case removal: {}", e);
            }
        }
        None => {
            ctx.say(format!("Case #{} does not exist.", id)).await?;
        }
    }
    Ok(())
}

/// How many cases are on record in this server.
#[poise::command(slash_command, prefix_command, guild_only, check = "is_moderator")]
pub async fn casecount(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(ctx)?.get();
    let count = ctx.data().moderation.count(guild_id).await?;
    let next = ctx.data().moderation.next_id(guild_id).await?;
    let threshold = ctx.data().moderation.policy().threshold();
    ctx.say(case_count_summary(count, next, threshold)).await?;
    Ok(())
}

fn case_count_summary(count: u64, next: u64, threshold: u64) -> String {
    format!(
        "{} active case{} on record. The next case will be #{}.\nMembers are kicked automatically every {} infractions.",
        count,
        if count == 1 { "" } else { "s" },
        next,
        threshold
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_count_mentions_threshold() {
        assert_eq!(
            case_count_summary(1, 4, 5),
            "1 active case on record. The next case will be #4.\nMembers are kicked automatically every 5 infractions."
        );
        assert!(case_count_summary(3, 4, 5).starts_with("3 active cases"));
    }

    #[test]
    fn case_line_shows_issuer_and_reason() {
        let infraction = Infraction {
            id: 12,
            guild_id: 1,
            offender_id: 2,
            moderator: Issuer::System,
            kind: InfractionKind::AutoWarn,
            reason: "Posted a link".into(),
            created: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            until: None,
            deleted: false,
        };

        assert_eq!(
            case_line(&infraction),
            "`#12` **Automatic Warn** by System <t:1700000000:R>\nPosted a link"
        );
    }
}
