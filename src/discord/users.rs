// Platform user lookups, cached for a few hours. Profiles rarely change and
// listing commands would otherwise hit the API once per row.

use crate::core::cache::TtlCache;
use poise::serenity_prelude as serenity;
use std::time::Duration;
use tokio::sync::Mutex;

pub const USER_TTL: Duration = Duration::from_secs(3 * 60 * 60);

pub struct UserDirectory {
    cache: Mutex<TtlCache<u64, serenity::User>>,
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(TtlCache::new(USER_TTL)),
        }
    }

    pub async fn fetch(
        &self,
        http: &serenity::Http,
        user_id: u64,
    ) -> Result<serenity::User, serenity::Error> {
        if let Some(user) = self.cache.lock().await.get(&user_id) {
            return Ok(user);
        }

        let user = http.get_user(serenity::UserId::new(user_id)).await?;
        self.cache.lock().await.insert(user_id, user.clone());
        Ok(user)
    }

    /// Display name for a user id, falling back to a mention if the lookup fails.
    pub async fn display_name(&self, http: &serenity::Http, user_id: u64) -> String {
        match self.fetch(http, user_id).await {
            Ok(user) => user.tag(),
            Err(e) => {
                tracing::debug!(user_id, "User lookup failed: {}", e);
                format!("<@{}>", user_id)
            }
        }
    }

    /// Seed the cache with a user we already have in hand.
    pub async fn remember(&self, user: &serenity::User) {
        self.cache.lock().await.insert(user.id.get(), user.clone());
    }
}
