// AFK status registry.
//
// Owned by `Data` and constructed once at startup; nothing here is global.
// Statuses live in memory only and vanish on restart.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

pub const DEFAULT_AFK_REASON: &str = "AFK";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfkStatus {
    pub user_id: u64,
    pub reason: String,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AfkRegistry {
    // (guild_id, user_id) -> status
    statuses: DashMap<(u64, u64), AfkStatus>,
}

impl AfkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, guild_id: u64, user_id: u64, reason: Option<String>) -> AfkStatus {
        let status = AfkStatus {
            user_id,
            reason: reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_AFK_REASON.to_string()),
            since: Utc::now(),
        };
        self.statuses.insert((guild_id, user_id), status.clone());
        status
    }

    /// Remove a user's status, returning it if they were AFK.
    pub fn clear(&self, guild_id: u64, user_id: u64) -> Option<AfkStatus> {
        self.statuses
            .remove(&(guild_id, user_id))
            .map(|(_, status)| status)
    }

    pub fn get(&self, guild_id: u64, user_id: u64) -> Option<AfkStatus> {
        self.statuses.get(&(guild_id, user_id)).map(|s| s.clone())
    }

    /// Statuses of the given users that are currently AFK.
    pub fn lookup_many(&self, guild_id: u64, user_ids: &[u64]) -> Vec<AfkStatus> {
        user_ids
            .iter()
            .filter_map(|user_id| self.get(guild_id, *user_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_round_trip() {
        let registry = AfkRegistry::new();
        let status = registry.set(1, 2, Some("lunch".into()));
        assert_eq!(status.reason, "lunch");
        assert_eq!(registry.get(1, 2), Some(status.clone()));

        assert_eq!(registry.clear(1, 2), Some(status));
        assert_eq!(registry.clear(1, 2), None);
    }

    #[test]
    fn statuses_are_per_guild() {
        let registry = AfkRegistry::new();
        registry.set(1, 2, None);
        assert_eq!(registry.get(1, 2).unwrap().reason, DEFAULT_AFK_REASON);
        assert!(registry.get(3, 2).is_none());
    }

    #[test]
    fn lookup_many_returns_only_afk_users() {
        let registry = AfkRegistry::new();
        registry.set(1, 10, None);
        registry.set(1, 30, Some("  ".into()));

        let found: Vec<u64> = registry
            .lookup_many(1, &[10, 20, 30])
            .into_iter()
            .map(|s| s.user_id)
            .collect();
        assert_eq!(found, vec![10, 30]);
    }
}
