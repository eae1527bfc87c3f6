// Guild settings service - lazily created per-guild configuration.
//
// Reads go through a TTL cache because settings are consulted on nearly every
// message (detectors, log routing, prefix lookup). Writes go straight to the
// store and invalidate the cached copy.

use super::settings_models::{GuildSettings, ListSetting, SettingsField};
use crate::core::cache::TtlCache;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

pub const SETTINGS_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Malformed settings document for guild {guild_id}: {reason}")]
    Malformed { guild_id: u64, reason: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, guild_id: u64) -> Result<Option<GuildSettings>, SettingsError>;

    /// Persist the default document if the guild has none, then return
    /// whatever is stored. Concurrent callers converge on one document.
    async fn insert_default(&self, guild_id: u64) -> Result<GuildSettings, SettingsError>;

    /// Replace exactly one field. The document must exist.
    async fn set_field(&self, guild_id: u64, field: &SettingsField) -> Result<(), SettingsError>;
}

pub struct SettingsService<S: SettingsStore> {
    store: S,
    cache: Mutex<TtlCache<u64, GuildSettings>>,
}

impl<S: SettingsStore> SettingsService<S> {
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, SETTINGS_TTL)
    }

    pub fn with_ttl(store: S, ttl: Duration) -> Self {
        Self {
            store,
            cache: Mutex::new(TtlCache::new(ttl)),
        }
    }

    /// Fetch a guild's settings, creating the default document on first access.
    pub async fn get_or_create(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        if let Some(settings) = self.cache.lock().await.get(&guild_id) {
            return Ok(settings);
        }

        let settings = match self.store.get(guild_id).await? {
            Some(settings) => settings,
            None => {
                tracing::info!(guild_id, "Creating default guild settings");
                self.store.insert_default(guild_id).await?
            }
        };

        self.cache.lock().await.insert(guild_id, settings.clone());
        Ok(settings)
    }

    /// Write one field and return the updated document.
    pub async fn update(
        &self,
        guild_id: u64,
        field: SettingsField,
    ) -> Result<GuildSettings, SettingsError> {
        if let SettingsField::Prefix(prefix) = &field {
            validate_prefix(prefix)?;
        }

        let mut settings = self.get_or_create(guild_id).await?;
        self.store.set_field(guild_id, &field).await?;
        field.apply(&mut settings);

        self.cache.lock().await.remove(&guild_id);
        tracing::debug!(guild_id, path = field.path(), "Guild setting updated");
        Ok(settings)
    }

    /// Add an entry to a list setting. Returns `false` if it was already present.
    pub async fn add_to_list(
        &self,
        guild_id: u64,
        list: ListSetting,
        entry: &str,
    ) -> Result<bool, SettingsError> {
        self.edit_list(guild_id, list, entry, true).await
    }

    /// Remove an entry from a list setting. Returns `false` if it was not present.
    pub async fn remove_from_list(
        &self,
        guild_id: u64,
        list: ListSetting,
        entry: &str,
    ) -> Result<bool, SettingsError> {
        self.edit_list(guild_id, list, entry, false).await
    }

    async fn edit_list(
        &self,
        guild_id: u64,
        list: ListSetting,
        entry: &str,
        add: bool,
    ) -> Result<bool, SettingsError> {
        let settings = self.get_or_create(guild_id).await?;

        let field = if list.holds_ids() {
            let id: u64 = entry
                .trim()
                .parse()
                .map_err(|_| SettingsError::InvalidValue(format!("`{}` is not an id", entry)))?;
            let mut ids = match list {
                ListSetting::ModRoles => settings.mod_roles,
                ListSetting::CommandDisabledChannels => settings.command_disabled_channels,
                _ => settings.detection_exclusive_channels,
            };
            if !toggle(&mut ids, id, add) {
                return Ok(false);
            }
            SettingsField::IdList(list, ids)
        } else {
            let word = entry.trim().to_lowercase();
            if word.is_empty() {
                return Err(SettingsError::InvalidValue("empty entry".to_string()));
            }
            let mut words = match list {
                ListSetting::BadWords => settings.bad_words,
                _ => settings.domains_whitelisted,
            };
            if !toggle(&mut words, word, add) {
                return Ok(false);
            }
            SettingsField::WordList(list, words)
        };

        self.update(guild_id, field).await?;
        Ok(true)
    }
}

fn toggle<T: PartialEq>(items: &mut Vec<T>, item: T, add: bool) -> bool {
    let present = items.contains(&item);
    match (add, present) {
        (true, false) => {
            items.push(item);
            true
        }
        (false, true) => {
            items.retain(|existing| existing != &item);
            true
        }
        _ => false,
    }
}

fn validate_prefix(prefix: &str) -> Result<(), SettingsError> {
    if prefix.is_empty() || prefix.chars().count() > 5 || prefix.chars().any(char::is_whitespace) {
        return Err(SettingsError::InvalidValue(
            "Prefix must be 1-5 characters without spaces".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{DetectionFlag, LogChannelKind};
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockSettingsStore {
        docs: DashMap<u64, GuildSettings>,
        creates: AtomicUsize,
        reads: AtomicUsize,
    }

    impl MockSettingsStore {
        fn new() -> Self {
            Self {
                docs: DashMap::new(),
                creates: AtomicUsize::new(0),
                reads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SettingsStore for MockSettingsStore {
        async fn get(&self, guild_id: u64) -> Result<Option<GuildSettings>, SettingsError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.docs.get(&guild_id).map(|d| d.clone()))
        }

        async fn insert_default(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(self.docs.entry(guild_id).or_default().clone())
        }

        async fn set_field(
            &self,
            guild_id: u64,
            field: &SettingsField,
        ) -> Result<(), SettingsError> {
            let mut doc = self
                .docs
                .get_mut(&guild_id)
                .ok_or_else(|| SettingsError::Storage("no document".into()))?;
            field.apply(&mut doc);
            Ok(())
        }
    }

    #[tokio::test]
    async fn unseen_guild_gets_persisted_default() {
        let service = SettingsService::new(MockSettingsStore::new());

        let first = service.get_or_create(1).await.unwrap();
        assert_eq!(first, GuildSettings::default());
        assert!(service.store.docs.contains_key(&1));

        let second = service.get_or_create(1).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(service.store.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_reads_are_served_from_cache() {
        let service = SettingsService::new(MockSettingsStore::new());
        for _ in 0..5 {
            service.get_or_create(1).await.unwrap();
        }
        assert_eq!(service.store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_expires_after_ttl() {
        let service = SettingsService::with_ttl(MockSettingsStore::new(), Duration::from_secs(5));
        service.get_or_create(1).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        service.get_or_create(1).await.unwrap();
        assert_eq!(service.store.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn update_writes_through_and_invalidates() {
        let service = SettingsService::new(MockSettingsStore::new());
        service.get_or_create(1).await.unwrap();

        service
            .update(1, SettingsField::LogChannel(LogChannelKind::Bot, Some(77)))
            .await
            .unwrap();
        service
            .update(1, SettingsField::Flag(DetectionFlag::BadWord, true))
            .await
            .unwrap();

        let settings = service.get_or_create(1).await.unwrap();
        assert_eq!(settings.log_channels.bot, Some(77));
        assert!(settings.bad_word_detection);
        assert_eq!(settings.log_channels.message, None);
    }

    #[tokio::test]
    async fn bad_prefix_is_rejected_before_write() {
        let service = SettingsService::new(MockSettingsStore::new());
        let err = service
            .update(1, SettingsField::Prefix("a b".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
        assert!(!service.store.docs.contains_key(&1));
    }

    #[tokio::test]
    async fn list_edits_report_changes() {
        let service = SettingsService::new(MockSettingsStore::new());

        assert!(service.add_to_list(1, ListSetting::BadWords, "Heck").await.unwrap());
        assert!(!service.add_to_list(1, ListSetting::BadWords, "heck").await.unwrap());
        assert!(service.add_to_list(1, ListSetting::ModRoles, "42").await.unwrap());
        assert!(service.add_to_list(1, ListSetting::ModRoles, "nope").await.is_err());

        let settings = service.get_or_create(1).await.unwrap();
        assert_eq!(settings.bad_words, vec!["heck".to_string()]);
        assert_eq!(settings.mod_roles, vec![42]);

        assert!(service.remove_from_list(1, ListSetting::BadWords, "HECK").await.unwrap());
        assert!(!service.remove_from_list(1, ListSetting::BadWords, "heck").await.unwrap());
        assert!(service.get_or_create(1).await.unwrap().bad_words.is_empty());
    }
}
