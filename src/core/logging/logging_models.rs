use crate::core::moderation::Infraction;
use crate::core::settings::LogChannelKind;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum LogEvent {
    MemberJoined {
        guild_id: u64,
        user_id: u64,
        user_mention: String,
        avatar_url: Option<String>,
        created_at: DateTime<Utc>,
    },
    MemberLeft {
        guild_id: u64,
        user_id: u64,
        user_mention: String,
        avatar_url: Option<String>,
        joined_at: Option<DateTime<Utc>>,
    },
    MemberBanned {
        guild_id: u64,
        user_id: u64,
        user_name: String,
    },
    MemberUnbanned {
        guild_id: u64,
        user_id: u64,
        user_name: String,
    },
    MessageDeleted {
        guild_id: u64,
        author_id: u64,
        author_name: String,
        channel_id: u64,
        content: String,
        attachments: Vec<String>,
        avatar_url: Option<String>,
    },
    MessageEdited {
        guild_id: u64,
        author_id: u64,
        author_name: String,
        channel_id: u64,
        before_content: String,
        after_content: String,
        avatar_url: Option<String>,
    },
    InfractionRecorded(Infraction),
    InfractionRemoved {
        infraction: Infraction,
        removed_by: u64,
    },
}

impl LogEvent {
    pub fn guild_id(&self) -> u64 {
        match self {
            LogEvent::MemberJoined { guild_id, .. }
            | LogEvent::MemberLeft { guild_id, .. }
            | LogEvent::MemberBanned { guild_id, .. }
            | LogEvent::MemberUnbanned { guild_id, .. }
            | LogEvent::MessageDeleted { guild_id, .. }
            | LogEvent::MessageEdited { guild_id, .. } => *guild_id,
            LogEvent::InfractionRecorded(infraction)
            | LogEvent::InfractionRemoved { infraction, .. } => infraction.guild_id,
        }
    }

    /// Which configured log channel this event belongs in.
    pub fn channel_kind(&self) -> LogChannelKind {
        match self {
            LogEvent::MessageDeleted { .. } | LogEvent::MessageEdited { .. } => {
                LogChannelKind::Message
            }
            LogEvent::MemberJoined { .. }
            | LogEvent::MemberLeft { .. }
            | LogEvent::MemberBanned { .. }
            | LogEvent::MemberUnbanned { .. }
            | LogEvent::InfractionRecorded(_)
            | LogEvent::InfractionRemoved { .. } => LogChannelKind::Bot,
        }
    }
}

/// What we remember about a guild message, so a later edit or delete can
/// still show the original text after the platform cache has dropped it.
#[derive(Debug, Clone)]
pub struct TrackedMessage {
    pub message_id: u64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub content: String,
    pub attachments: Vec<String>,
    pub avatar_url: Option<String>,
}
