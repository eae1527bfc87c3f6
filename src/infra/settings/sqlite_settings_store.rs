// Guild settings live as one JSON document per guild. Field updates go
// through SQLite's json_set so a write only touches the path it names.

use crate::core::settings::{GuildSettings, SettingsError, SettingsField, SettingsStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

fn storage(e: sqlx::Error) -> SettingsError {
    SettingsError::Storage(e.to_string())
}

impl SqliteSettingsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), SettingsError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER PRIMARY KEY,
                document TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, guild_id: u64) -> Result<Option<GuildSettings>, SettingsError> {
        let row = sqlx::query("SELECT document FROM guild_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: String = row
            .try_get("document")
            .map_err(|e| SettingsError::Malformed {
                guild_id,
                reason: e.to_string(),
            })?;
        serde_json::from_str(&document)
            .map(Some)
            .map_err(|e| SettingsError::Malformed {
                guild_id,
                reason: e.to_string(),
            })
    }

    async fn insert_default(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        let document = serde_json::to_string(&GuildSettings::default())
            .map_err(|e| SettingsError::Storage(e.to_string()))?;

        sqlx::query(
            "INSERT INTO guild_settings (guild_id, document) VALUES (?, ?) ON CONFLICT(guild_id) DO NOTHING",
        )
        .bind(guild_id as i64)
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        self.get(guild_id).await?.ok_or_else(|| {
            SettingsError::Storage(format!("settings for guild {} vanished after insert", guild_id))
        })
    }

    async fn set_field(&self, guild_id: u64, field: &SettingsField) -> Result<(), SettingsError> {
        let result = sqlx::query(
            "UPDATE guild_settings SET document = json_set(document, ?, json(?)) WHERE guild_id = ?",
        )
        .bind(field.path())
        .bind(field.value().to_string())
        .bind(guild_id as i64)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(SettingsError::Storage(format!(
                "no settings document for guild {}",
                guild_id
            )));
        }
        Ok(())
    }
}
