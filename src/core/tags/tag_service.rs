// Tag service - canned responses keyed by a case-insensitive name.

use super::tag_models::{normalize_name, Tag, TagExtras, MAX_TAG_CONTENT_LEN, MAX_TAG_NAME_LEN};
use crate::core::cache::CaseInsensitiveCache;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

pub const TAG_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum TagError {
    #[error("No tag named `{0}` exists.")]
    NotFound(String),

    #[error("A tag named `{0}` already exists.")]
    AlreadyExists(String),

    #[error("You don't own the tag `{0}`.")]
    NotOwner(String),

    #[error("{0}")]
    InvalidName(String),

    #[error("{0}")]
    InvalidContent(String),

    #[error("Malformed tag record: {0}")]
    Malformed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait TagStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<Tag>, TagError>;

    /// Fails with `AlreadyExists` if the name is taken.
    async fn create(&self, tag: &Tag) -> Result<(), TagError>;

    async fn update(&self, name: &str, content: &str, extras: &TagExtras) -> Result<(), TagError>;

    async fn delete(&self, name: &str) -> Result<Option<Tag>, TagError>;

    /// All tags, sorted by name.
    async fn list(&self) -> Result<Vec<Tag>, TagError>;

    async fn increment_uses(&self, name: &str) -> Result<(), TagError>;
}

pub struct TagService<S: TagStore> {
    store: S,
    cache: Mutex<CaseInsensitiveCache<Tag>>,
}

impl<S: TagStore> TagService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: Mutex::new(CaseInsensitiveCache::new(TAG_TTL)),
        }
    }

    /// Look a tag up, preferring the cache.
    pub async fn get(&self, name: &str) -> Result<Tag, TagError> {
        let name = normalize_name(name);
        if let Some(tag) = self.cache.lock().await.get(&name) {
            return Ok(tag);
        }

        let tag = self
            .store
            .get(&name)
            .await?
            .ok_or_else(|| TagError::NotFound(name.clone()))?;
        self.cache.lock().await.insert(&name, tag.clone());
        Ok(tag)
    }

    /// Fetch a tag for display and bump its usage counter.
    pub async fn invoke(&self, name: &str) -> Result<Tag, TagError> {
        let mut tag = self.get(name).await?;
        self.store.increment_uses(&tag.name).await?;
        tag.uses += 1;
        self.cache
            .lock()
            .await
            .modify(&tag.name, |cached| cached.uses += 1);
        Ok(tag)
    }

    pub async fn create(
        &self,
        name: &str,
        owner_id: u64,
        content: String,
        extras: TagExtras,
    ) -> Result<Tag, TagError> {
        validate_name(name)?;
        validate_content(&content)?;

        let mut tag = Tag::new(name, owner_id, content);
        tag.extras = extras;
        self.store.create(&tag).await?;
        tracing::info!(tag = %tag.name, owner_id, "Tag created");
        Ok(tag)
    }

    /// Replace a tag's content. Only the owner or an admin may do this.
    pub async fn edit(
        &self,
        name: &str,
        editor_id: u64,
        is_admin: bool,
        content: String,
        extras: Option<TagExtras>,
    ) -> Result<Tag, TagError> {
        validate_content(&content)?;

        let mut tag = self.get(name).await?;
        ensure_can_manage(&tag, editor_id, is_admin)?;

        tag.content = content;
        if let Some(extras) = extras {
            tag.extras = extras;
        }
        self.store.update(&tag.name, &tag.content, &tag.extras).await?;
        self.cache.lock().await.remove(&tag.name);
        Ok(tag)
    }

    pub async fn delete(&self, name: &str, user_id: u64, is_admin: bool) -> Result<Tag, TagError> {
        let tag = self.get(name).await?;
        ensure_can_manage(&tag, user_id, is_admin)?;

        self.cache.lock().await.remove(&tag.name);
        self.store
            .delete(&tag.name)
            .await?
            .ok_or_else(|| TagError::NotFound(tag.name.clone()))
    }

    pub async fn list(&self) -> Result<Vec<Tag>, TagError> {
        self.store.list().await
    }
}

fn ensure_can_manage(tag: &Tag, user_id: u64, is_admin: bool) -> Result<(), TagError> {
    if tag.owner_id == user_id || is_admin {
        Ok(())
    } else {
        Err(TagError::NotOwner(tag.name.clone()))
    }
}

fn validate_name(name: &str) -> Result<(), TagError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_TAG_NAME_LEN {
        return Err(TagError::InvalidName(format!(
            "Tag names must be 1-{} characters.",
            MAX_TAG_NAME_LEN
        )));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(TagError::InvalidName(
            "Tag names can't contain spaces.".to_string(),
        ));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), TagError> {
    if content.trim().is_empty() || content.chars().count() > MAX_TAG_CONTENT_LEN {
        return Err(TagError::InvalidContent(format!(
            "Tag content must be 1-{} characters.",
            MAX_TAG_CONTENT_LEN
        )));
    }
    Ok(())
}
