use crate::core::logging::{LogEvent, TrackedMessage};
use crate::discord::logging::formatter::format_log_event;
use crate::discord::Data;
use anyhow::Result;
use poise::serenity_prelude::{self as serenity, Context, Mentionable};

fn snapshot(message: &serenity::Message, guild_id: u64) -> TrackedMessage {
    TrackedMessage {
        message_id: message.id.get(),
        guild_id,
        channel_id: message.channel_id.get(),
        author_id: message.author.id.get(),
        author_name: message.author.name.clone(),
        content: message.content.clone(),
        attachments: message
            .attachments
            .iter()
            .map(|a| a.filename.clone())
            .collect(),
        avatar_url: message.author.avatar_url(),
    }
}

/// Cache the message for logging so delete/edit events are reliable even when
/// Serenity's cache misses it.
pub fn track_message(data: &Data, message: &serenity::Message) {
    if let Some(guild_id) = message.guild_id {
        data.logging.remember_message(snapshot(message, guild_id.get()));
    }
}

pub async fn handle_member_join(
    ctx: &Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<()> {
    let event = LogEvent::MemberJoined {
        guild_id: member.guild_id.get(),
        user_id: member.user.id.get(),
        user_mention: member.mention().to_string(),
        avatar_url: member.user.avatar_url(),
        created_at: *member.user.created_at(),
    };

    send_log(ctx, data, event).await
}

pub async fn handle_member_remove(
    ctx: &Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    member_data: Option<&serenity::Member>,
) -> Result<()> {
    let event = LogEvent::MemberLeft {
        guild_id: guild_id.get(),
        user_id: user.id.get(),
        user_mention: user.mention().to_string(),
        avatar_url: user.avatar_url(),
        joined_at: member_data.and_then(|m| m.joined_at).map(|t| *t),
    };

    send_log(ctx, data, event).await
}

pub async fn handle_ban_add(
    ctx: &Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
) -> Result<()> {
    data.users.remember(user).await;
    let event = LogEvent::MemberBanned {
        guild_id: guild_id.get(),
        user_id: user.id.get(),
        user_name: user.tag(),
    };

    send_log(ctx, data, event).await
}

pub async fn handle_ban_remove(
    ctx: &Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
) -> Result<()> {
    data.users.remember(user).await;
    let event = LogEvent::MemberUnbanned {
        guild_id: guild_id.get(),
        user_id: user.id.get(),
        user_name: user.tag(),
    };

    send_log(ctx, data, event).await
}

pub async fn handle_message_delete(
    ctx: &Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
    guild_id: Option<serenity::GuildId>,
) -> Result<()> {
    let guild_id = match guild_id {
        Some(id) => id.get(),
        None => return Ok(()),
    };

    // Prefer our own snapshot over the Serenity cache so we never miss deletes.
    let snapshot = data
        .logging
        .take_tracked_message(message_id.get())
        .or_else(|| {
            ctx.cache
                .message(channel_id, message_id)
                .filter(|message| !message.author.bot)
                .map(|message| snapshot(&message, guild_id))
        });

    let snapshot = match snapshot {
        Some(msg) if msg.guild_id == guild_id => msg,
        _ => return Ok(()),
    };

    let event = LogEvent::MessageDeleted {
        guild_id,
        author_id: snapshot.author_id,
        author_name: snapshot.author_name,
        channel_id: snapshot.channel_id,
        content: snapshot.content,
        attachments: snapshot.attachments,
        avatar_url: snapshot.avatar_url,
    };

    send_log(ctx, data, event).await
}

pub async fn handle_message_update(
    ctx: &Context,
    data: &Data,
    old: Option<&serenity::Message>,
    event: &serenity::MessageUpdateEvent,
) -> Result<()> {
    let guild_id = match event.guild_id {
        Some(id) => id.get(),
        None => return Ok(()),
    };
    let new_content = match &event.content {
        Some(c) => c.as_str(),
        None => return Ok(()),
    };

    // Fall back to the cached "old" message if we never tracked this one.
    let message_id = event.id.get();
    if data.logging.get_tracked_message(message_id).is_none() {
        match old {
            Some(old) if !old.author.bot => {
                data.logging.remember_message(snapshot(old, guild_id));
            }
            _ => return Ok(()),
        }
    }

    match data.logging.record_edit(message_id, new_content) {
        Some(edit) => send_log(ctx, data, edit).await,
        None => Ok(()),
    }
}

/// Post an event to the channel its kind is routed to. Guilds without that
/// channel configured are skipped.
pub async fn send_log(ctx: &Context, data: &Data, event: LogEvent) -> Result<()> {
    let guild_id = event.guild_id();
    let settings = data.settings.get_or_create(guild_id).await?;
    let Some(channel_id) = data.logging.resolve_channel(&settings, &event) else {
        return Ok(());
    };

    let embed = format_log_event(&event);
    let channel = serenity::ChannelId::new(channel_id);
    if let Err(e) = channel
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await
    {
        tracing::warn!(guild_id, channel_id, "Failed to send log: {}", e);
    }
    Ok(())
}
