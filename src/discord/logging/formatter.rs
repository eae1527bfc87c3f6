use crate::core::logging::LogEvent;
use crate::core::moderation::{Infraction, Issuer};
use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedFooter};

const NO_CONTENT: &str = "*No content*";

/// Cut `text` to at most `max` characters without splitting a code point.
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn or_placeholder(text: &str, max: usize) -> &str {
    if text.is_empty() {
        NO_CONTENT
    } else {
        truncate(text, max)
    }
}

fn moderator_field(infraction: &Infraction) -> String {
    match (infraction.kind.is_automatic(), &infraction.moderator) {
        (true, Issuer::System) => "Automatic".to_string(),
        (true, issuer) => format!("{} (automatic)", issuer.mention()),
        (false, issuer) => issuer.mention(),
    }
}

/// Embed describing one case. Used for logs and the `case` command.
pub fn infraction_embed(infraction: &Infraction) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title(format!("Case #{} | {}", infraction.id, infraction.kind.label()))
        .color(infraction.kind.colour())
        .field("Offender", format!("<@{}>", infraction.offender_id), true)
        .field("Moderator", moderator_field(infraction), true)
        .field("Reason", truncate(&infraction.reason, 1024), false)
        .footer(CreateEmbedFooter::new(format!(
            "User ID: {}",
            infraction.offender_id
        )))
        .timestamp(
            serenity::Timestamp::from_unix_timestamp(infraction.created.timestamp())
                .unwrap_or_else(|_| serenity::Timestamp::now()),
        );

    if let Some(until) = infraction.until {
        embed = embed.field("Expires", format!("<t:{}:R>", until.timestamp()), true);
    }
    embed
}

pub fn format_log_event(event: &LogEvent) -> CreateEmbed {
    match event {
        LogEvent::MemberJoined {
            guild_id,
            user_mention,
            avatar_url,
            created_at,
            ..
        } => {
            let mut embed = CreateEmbed::default()
                .title("Member Joined Server")
                .description(format!("{} has joined the server.", user_mention))
                .color(serenity::Color::from_rgb(0, 255, 0))
                .field(
                    "Account Created",
                    format!("<t:{}:R>", created_at.timestamp()),
                    false,
                )
                .footer(CreateEmbedFooter::new(format!("Guild ID: {}", guild_id)))
                .timestamp(serenity::Timestamp::now());

            if let Some(url) = avatar_url {
                embed = embed.thumbnail(url);
            }
            embed
        }

        LogEvent::MemberLeft {
            guild_id,
            user_mention,
            avatar_url,
            joined_at,
            ..
        } => {
            let joined_str = match joined_at {
                Some(joined) => format!("<t:{}:R>", joined.timestamp()),
                None => "Unknown".to_string(),
            };

            let mut embed = CreateEmbed::default()
                .title("Member Left Server")
                .description(format!("{} has left the server.", user_mention))
                .color(serenity::Color::RED)
                .field("Joined Server", joined_str, false)
                .footer(CreateEmbedFooter::new(format!("Guild ID: {}", guild_id)))
                .timestamp(serenity::Timestamp::now());

            if let Some(url) = avatar_url {
                embed = embed.thumbnail(url);
            }
            embed
        }

        LogEvent::MemberBanned {
            guild_id,
            user_id,
            user_name,
        } => CreateEmbed::default()
            .title("Member Banned")
            .description(format!("**{}** (`{}`) was banned.", user_name, user_id))
            .color(serenity::Color::DARK_RED)
            .footer(CreateEmbedFooter::new(format!("Guild ID: {}", guild_id)))
            .timestamp(serenity::Timestamp::now()),

        LogEvent::MemberUnbanned {
            guild_id,
            user_id,
            user_name,
        } => CreateEmbed::default()
            .title("Member Unbanned")
            .description(format!("**{}** (`{}`) was unbanned.", user_name, user_id))
            .color(serenity::Color::DARK_GREEN)
            .footer(CreateEmbedFooter::new(format!("Guild ID: {}", guild_id)))
            .timestamp(serenity::Timestamp::now()),

        LogEvent::MessageDeleted {
            guild_id,
            author_id,
            author_name,
            channel_id,
            content,
            attachments,
            avatar_url,
        } => {
            let mut embed = CreateEmbed::default()
                .title("Message Deleted")
                .description(or_placeholder(content, 4096))
                .color(serenity::Color::from_rgb(255, 165, 0))
                .field(
                    "Author",
                    format!("{} (`{}`)", author_name, author_id),
                    false,
                )
                .field("Channel", format!("<#{}>", channel_id), false)
                .footer(CreateEmbedFooter::new(format!("Guild ID: {}", guild_id)))
                .timestamp(serenity::Timestamp::now());

            if !attachments.is_empty() {
                embed = embed.field("Attachments", attachments.join("\n"), false);
            }

            if let Some(url) = avatar_url {
                embed = embed.thumbnail(url);
            }
            embed
        }

        LogEvent::MessageEdited {
            guild_id,
            author_id,
            author_name,
            channel_id,
            before_content,
            after_content,
            avatar_url,
        } => {
            let mut embed = CreateEmbed::default()
                .title("Message Edited")
                .description(format!("Message edited in <#{}>", channel_id))
                .color(serenity::Color::BLURPLE)
                .field(
                    "Author",
                    format!("{} (`{}`)", author_name, author_id),
                    false,
                )
                .field("Before", or_placeholder(before_content, 1024), false)
                .field("After", or_placeholder(after_content, 1024), false)
                .footer(CreateEmbedFooter::new(format!("Guild ID: {}", guild_id)))
                .timestamp(serenity::Timestamp::now());

            if let Some(url) = avatar_url {
                embed = embed.thumbnail(url);
            }
            embed
        }

        LogEvent::InfractionRecorded(infraction) => infraction_embed(infraction),

        LogEvent::InfractionRemoved {
            infraction,
            removed_by,
        } => CreateEmbed::default()
            .title(format!("Case #{} Removed", infraction.id))
            .description(format!(
                "{} against <@{}>: {}",
                infraction.kind.label(),
                infraction.offender_id,
                truncate(&infraction.reason, 1024)
            ))
            .color(serenity::Color::LIGHT_GREY)
            .field("Removed By", format!("<@{}>", removed_by), true)
            .footer(CreateEmbedFooter::new(format!(
                "Guild ID: {}",
                infraction.guild_id
            )))
            .timestamp(serenity::Timestamp::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("🦀🦀🦀", 1), "🦀");
    }

    #[test]
    fn automatic_cases_are_marked() {
        let mut case = Infraction {
            id: 6,
            guild_id: 1,
            offender_id: 42,
            moderator: Issuer::System,
            kind: crate::core::moderation::InfractionKind::AutoAction,
            reason: "violated 5 infractions.".into(),
            created: chrono::Utc::now(),
            until: None,
            deleted: false,
        };
        assert_eq!(moderator_field(&case), "Automatic");

        case.kind = crate::core::moderation::InfractionKind::Warn;
        case.moderator = Issuer::User(7);
        assert_eq!(moderator_field(&case), "<@7>");
    }

    #[test]
    fn empty_content_gets_placeholder() {
        assert_eq!(or_placeholder("", 10), NO_CONTENT);
        assert_eq!(or_placeholder("hi", 10), "hi");
    }
}
