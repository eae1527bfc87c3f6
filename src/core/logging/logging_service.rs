use super::logging_models::{LogEvent, TrackedMessage};
use crate::core::settings::GuildSettings;
use dashmap::DashMap;

// Cap how many messages we keep in memory for logging so we don't grow unbounded.
const MAX_TRACKED_MESSAGES: usize = 5_000;

pub struct LoggingService {
    // Message ID -> Snapshot for logging edits/deletes even if Serenity's cache evicts them
    message_cache: DashMap<u64, TrackedMessage>,
    max_tracked: usize,
}

impl Default for LoggingService {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingService {
    pub fn new() -> Self {
        Self::with_capacity(MAX_TRACKED_MESSAGES)
    }

    pub fn with_capacity(max_tracked: usize) -> Self {
        Self {
            message_cache: DashMap::new(),
            max_tracked,
        }
    }

    /// Channel an event should be posted to, if the guild configured one.
    pub fn resolve_channel(&self, settings: &GuildSettings, event: &LogEvent) -> Option<u64> {
        settings.log_channel(event.channel_kind())
    }

    /// Store a message snapshot so we can later log deletes/edits reliably.
    pub fn remember_message(&self, message: TrackedMessage) {
        self.message_cache.insert(message.message_id, message);

        // Simple eviction: drop an arbitrary entry once we cross the cap.
        // The key is read in its own statement so the shard guard is released before removal.
        if self.message_cache.len() > self.max_tracked {
            let first_key = self.message_cache.iter().next().map(|entry| *entry.key());
            if let Some(key) = first_key {
                self.message_cache.remove(&key);
            }
        }
    }

    /// Get a tracked message without removing it (used for edits).
    pub fn get_tracked_message(&self, message_id: u64) -> Option<TrackedMessage> {
        self.message_cache.get(&message_id).map(|m| m.clone())
    }

    /// Remove a tracked message (used for deletions).
    pub fn take_tracked_message(&self, message_id: u64) -> Option<TrackedMessage> {
        self.message_cache.remove(&message_id).map(|(_, msg)| msg)
    }

    /// Build the edit event for a tracked message and refresh its snapshot.
    /// Returns `None` when the content did not actually change.
    pub fn record_edit(&self, message_id: u64, new_content: &str) -> Option<LogEvent> {
        let mut tracked = self.get_tracked_message(message_id)?;
        if tracked.content == new_content {
            return None;
        }

        let event = LogEvent::MessageEdited {
            guild_id: tracked.guild_id,
            author_id: tracked.author_id,
            author_name: tracked.author_name.clone(),
            channel_id: tracked.channel_id,
            before_content: tracked.content.clone(),
            after_content: new_content.to_string(),
            avatar_url: tracked.avatar_url.clone(),
        };

        tracked.content = new_content.to_string();
        self.remember_message(tracked);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{Infraction, InfractionKind, Issuer};
    use crate::core::settings::LogChannels;
    use chrono::Utc;

    fn tracked(message_id: u64, content: &str) -> TrackedMessage {
        TrackedMessage {
            message_id,
            guild_id: 1,
            channel_id: 2,
            author_id: 3,
            author_name: "ferris".into(),
            content: content.into(),
            attachments: vec![],
            avatar_url: None,
        }
    }

    #[test]
    fn events_route_to_matching_channels() {
        let service = LoggingService::new();
        let settings = GuildSettings {
            log_channels: LogChannels {
                bot: Some(100),
                message: Some(200),
            },
            ..Default::default()
        };

        let edit = LogEvent::MessageEdited {
            guild_id: 1,
            author_id: 3,
            author_name: "ferris".into(),
            channel_id: 2,
            before_content: "a".into(),
            after_content: "b".into(),
            avatar_url: None,
        };
        let ban = LogEvent::MemberBanned {
            guild_id: 1,
            user_id: 3,
            user_name: "ferris".into(),
        };
        let case = LogEvent::InfractionRecorded(Infraction {
            id: 1,
            guild_id: 1,
            offender_id: 3,
            moderator: Issuer::System,
            kind: InfractionKind::AutoWarn,
            reason: "x".into(),
            created: Utc::now(),
            until: None,
            deleted: false,
        });

        assert_eq!(service.resolve_channel(&settings, &edit), Some(200));
        assert_eq!(service.resolve_channel(&settings, &ban), Some(100));
        assert_eq!(service.resolve_channel(&settings, &case), Some(100));
        assert_eq!(case.guild_id(), 1);
    }

    #[test]
    fn unconfigured_channels_are_skipped() {
        let service = LoggingService::new();
        let event = LogEvent::MemberUnbanned {
            guild_id: 1,
            user_id: 3,
            user_name: "ferris".into(),
        };
        assert_eq!(
            service.resolve_channel(&GuildSettings::default(), &event),
            None
        );
    }

    #[test]
    fn edit_uses_snapshot_and_refreshes_it() {
        let service = LoggingService::new();
        service.remember_message(tracked(9, "before"));

        assert!(service.record_edit(9, "before").is_none());

        match service.record_edit(9, "after") {
            Some(LogEvent::MessageEdited {
                before_content,
                after_content,
                ..
            }) => {
                assert_eq!(before_content, "before");
                assert_eq!(after_content, "after");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(service.get_tracked_message(9).unwrap().content, "after");
        assert!(service.record_edit(10, "x").is_none());
    }

    #[test]
    fn snapshot_cache_is_bounded() {
        let service = LoggingService::with_capacity(3);
        for id in 0..10 {
            service.remember_message(tracked(id, "hi"));
        }
        assert_eq!(service.message_cache.len(), 3);
    }

    #[test]
    fn take_removes_snapshot() {
        let service = LoggingService::new();
        service.remember_message(tracked(5, "bye"));
        assert_eq!(service.take_tracked_message(5).unwrap().content, "bye");
        assert!(service.take_tracked_message(5).is_none());
    }
}
