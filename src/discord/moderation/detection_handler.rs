// Runs the automated detectors on incoming messages. A hit deletes the
// message and files an automatic warn issued by the bot, which counts
// towards escalation like any other case.

use crate::core::moderation::{detect, InfractionKind, Issuer, NewInfraction};
use crate::core::settings::GuildSettings;
use crate::discord::moderation::actions::record_infraction;
use crate::discord::permissions::cached_permissions;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Staff (by role or Manage Server) and bypass-role holders are never auto-moderated.
pub fn is_exempt(settings: &GuildSettings, roles: &[u64], has_manage_guild: bool) -> bool {
    settings.can_bypass(roles) || settings.is_moderator(roles, has_manage_guild)
}

/// Returns `true` when the message was removed.
pub async fn handle_message(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<bool, Error> {
    let Some(guild_id) = message.guild_id else {
        return Ok(false);
    };

    let settings = data.settings.get_or_create(guild_id.get()).await?;
    let Some(detection) = detect(&settings, message.channel_id.get(), &message.content) else {
        return Ok(false);
    };

    let roles: Vec<u64> = message
        .member
        .as_ref()
        .map(|member| member.roles.iter().map(|role| role.get()).collect())
        .unwrap_or_default();
    let permissions = cached_permissions(&ctx.cache, guild_id, message.author.id);
    let has_manage_guild = permissions.contains(serenity::Permissions::MANAGE_GUILD);
    if is_exempt(&settings, &roles, has_manage_guild) {
        return Ok(false);
    }

    tracing::info!(
        guild_id = guild_id.get(),
        user_id = message.author.id.get(),
        detection = %detection,
        "Detector triggered"
    );

    if let Err(e) = message.delete(&ctx.http).await {
        tracing::warn!("Failed to delete flagged message: {}", e);
    }

    let new = NewInfraction::new(
        guild_id.get(),
        message.author.id.get(),
        Issuer::System,
        InfractionKind::AutoWarn,
        Some(detection.reason()),
    );
    let outcome = record_infraction(ctx, data, new).await?;

    let notice = format!(
        "<@{}>, your message was removed: {} (case #{})",
        message.author.id,
        detection.reason(),
        outcome.infraction.id
    );
    if let Err(e) = message.channel_id.say(&ctx.http, notice).await {
        tracing::warn!("Failed to send detection notice: {}", e);
    }

    Ok(true)
}
