// Runtime configuration, read from the environment (and `.env` via dotenv).

use anyhow::{Context, Result};
use std::time::Duration;

use crate::core::moderation::DEFAULT_THRESHOLD;

const DEFAULT_DATABASE_PATH: &str = "data/warden.db";
const DEFAULT_MUTE_SWEEP_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    /// Path of the SQLite database file.
    pub database_path: String,
    /// Every Nth qualifying infraction triggers an automatic kick.
    pub escalation_threshold: u64,
    /// How often expired timed mutes are lifted.
    pub mute_sweep_interval: Duration,
    /// Register commands in this guild only (instant updates while developing).
    pub dev_guild_id: Option<u64>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup("DISCORD_TOKEN").context(
            "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
        )?;

        let database_path = lookup("DATABASE_URL")
            .map(|url| url.trim_start_matches("sqlite://").to_string())
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        let escalation_threshold = match lookup("ESCALATION_THRESHOLD") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("ESCALATION_THRESHOLD must be a positive integer, got `{}`", raw))?,
            None => DEFAULT_THRESHOLD,
        };

        let mute_sweep_secs = match lookup("MUTE_SWEEP_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("MUTE_SWEEP_SECS must be a number of seconds, got `{}`", raw))?,
            None => DEFAULT_MUTE_SWEEP_SECS,
        };

        let dev_guild_id = lookup("DEV_GUILD_ID")
            .map(|raw| raw.parse::<u64>())
            .transpose()
            .context("DEV_GUILD_ID must be a guild id")?;

        Ok(Self {
            token,
            database_path,
            escalation_threshold,
            mute_sweep_interval: Duration::from_secs(mute_sweep_secs.max(1)),
            dev_guild_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<BotConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert!(config(&[]).is_err());
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.database_path, DEFAULT_DATABASE_PATH);
        assert_eq!(config.escalation_threshold, 5);
        assert_eq!(config.mute_sweep_interval, Duration::from_secs(60));
        assert_eq!(config.dev_guild_id, None);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("DISCORD_TOKEN", "abc"),
            ("DATABASE_URL", "sqlite://tmp/bot.db"),
            ("ESCALATION_THRESHOLD", "3"),
            ("DEV_GUILD_ID", "42"),
        ])
        .unwrap();
        assert_eq!(config.database_path, "tmp/bot.db");
        assert_eq!(config.escalation_threshold, 3);
        assert_eq!(config.dev_guild_id, Some(42));
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(config(&[("DISCORD_TOKEN", "abc"), ("ESCALATION_THRESHOLD", "0")]).is_err());
        assert!(config(&[("DISCORD_TOKEN", "abc"), ("MUTE_SWEEP_SECS", "soon")]).is_err());
        assert!(config(&[("DISCORD_TOKEN", "abc"), ("DEV_GUILD_ID", "x")]).is_err());
    }
}
