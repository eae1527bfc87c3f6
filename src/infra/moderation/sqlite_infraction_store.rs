// SQLite-backed infraction ledger.
//
// Tables:
// - infractions: one row per case, soft-deleted via the `deleted` flag
// - infraction_counters: last case id handed out per guild
//
// Case ids come from the counter row, not from counting records, so a
// deleted case never frees its id and concurrent appends can't collide.

use crate::core::moderation::{
    Infraction, InfractionFilter, InfractionKind, InfractionStore, Issuer, ModerationError,
    NewInfraction,
};
use crate::infra::database::{decode_time, encode_time};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteInfractionStore {
    pool: Pool<Sqlite>,
}

fn storage(e: sqlx::Error) -> ModerationError {
    ModerationError::Storage(e.to_string())
}

impl SqliteInfractionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS infractions (
                guild_id INTEGER NOT NULL,
                id INTEGER NOT NULL,
                offender INTEGER NOT NULL,
                moderator INTEGER,
                type TEXT NOT NULL,
                reason TEXT NOT NULL,
                created TEXT NOT NULL,
                until TEXT,
                deleted BOOLEAN NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, id)
            );
            CREATE INDEX IF NOT EXISTS idx_infractions_offender
                ON infractions(guild_id, offender);
            CREATE INDEX IF NOT EXISTS idx_infractions_until
                ON infractions(until) WHERE until IS NOT NULL;
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS infraction_counters (
                guild_id INTEGER PRIMARY KEY,
                last_id INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}

/// Build a typed record from a row, rejecting anything that doesn't fit.
fn infraction_from_row(row: &SqliteRow) -> Result<Infraction, ModerationError> {
    let malformed = |e: sqlx::Error| ModerationError::Malformed(e.to_string());

    let id: i64 = row.try_get("id").map_err(malformed)?;
    let guild_id: i64 = row.try_get("guild_id").map_err(malformed)?;
    let offender: i64 = row.try_get("offender").map_err(malformed)?;
    let moderator: Option<i64> = row.try_get("moderator").map_err(malformed)?;
    let kind: String = row.try_get("type").map_err(malformed)?;
    let reason: String = row.try_get("reason").map_err(malformed)?;
    let created: String = row.try_get("created").map_err(malformed)?;
    let until: Option<String> = row.try_get("until").map_err(malformed)?;
    let deleted: bool = row.try_get("deleted").map_err(malformed)?;

    if id <= 0 {
        return Err(ModerationError::Malformed(format!("invalid case id {}", id)));
    }

    let kind = kind
        .parse::<InfractionKind>()
        .map_err(|e| ModerationError::Malformed(e.to_string()))?;
    let parse_time = |raw: &str| {
        decode_time(raw)
            .map_err(|e| ModerationError::Malformed(format!("bad timestamp `{}`: {}", raw, e)))
    };

    Ok(Infraction {
        id: id as u64,
        guild_id: guild_id as u64,
        offender_id: offender as u64,
        moderator: moderator.map_or(Issuer::System, |id| Issuer::User(id as u64)),
        kind,
        reason,
        created: parse_time(&created)?,
        until: until.as_deref().map(parse_time).transpose()?,
        deleted,
    })
}

fn rows_to_infractions(rows: Vec<SqliteRow>) -> Result<Vec<Infraction>, ModerationError> {
    rows.iter().map(infraction_from_row).collect()
}

#[async_trait]
impl InfractionStore for SqliteInfractionStore {
    async fn next_id(&self, guild_id: u64) -> Result<u64, ModerationError> {
        let row = sqlx::query("SELECT last_id FROM infraction_counters WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        let last_id = match row {
            Some(row) => row.try_get::<i64, _>("last_id").map_err(storage)?,
            None => 0,
        };
        Ok(last_id as u64 + 1)
    }

    async fn append(&self, new: NewInfraction) -> Result<Infraction, ModerationError> {
        let created = Utc::now();
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Reserving the id is the first statement, so the transaction takes the
        // write lock before anything else can read the counter.
        let row = sqlx::query(
            r#"
            INSERT INTO infraction_counters (guild_id, last_id)
            VALUES (?, 1)
            ON CONFLICT(guild_id) DO UPDATE SET last_id = last_id + 1
            RETURNING last_id
            "#,
        )
        .bind(new.guild_id as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;
        let id: i64 = row.try_get("last_id").map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO infractions (guild_id, id, offender, moderator, type, reason, created, until, deleted)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(new.guild_id as i64)
        .bind(id)
        .bind(new.offender_id as i64)
        .bind(new.moderator.user_id().map(|id| id as i64))
        .bind(new.kind.as_tag())
        .bind(&new.reason)
        .bind(encode_time(created))
        .bind(new.until.map(encode_time))
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        Ok(Infraction {
            id: id as u64,
            guild_id: new.guild_id,
            offender_id: new.offender_id,
            moderator: new.moderator,
            kind: new.kind,
            reason: new.reason,
            created,
            until: new.until,
            deleted: false,
        })
    }

    async fn get(&self, guild_id: u64, id: u64) -> Result<Option<Infraction>, ModerationError> {
        let row = sqlx::query("SELECT * FROM infractions WHERE guild_id = ? AND id = ? AND deleted = 0")
            .bind(guild_id as i64)
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(infraction_from_row).transpose()
    }

    async fn find(
        &self,
        guild_id: u64,
        filter: InfractionFilter,
    ) -> Result<Vec<Infraction>, ModerationError> {
        let offender = filter.offender.map(|id| id as i64);
        let moderator = filter.moderator.map(|id| id as i64);

        let rows = sqlx::query(
            r#"
            SELECT * FROM infractions
            WHERE guild_id = ? AND deleted = 0
              AND (? IS NULL OR offender = ?)
              AND (? IS NULL OR moderator = ?)
            ORDER BY id ASC
            "#,
        )
        .bind(guild_id as i64)
        .bind(offender)
        .bind(offender)
        .bind(moderator)
        .bind(moderator)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows_to_infractions(rows)
    }

    async fn delete(&self, guild_id: u64, id: u64) -> Result<Option<Infraction>, ModerationError> {
        // Hand back the record as it was before the flag flipped.
        let row = sqlx::query(
            r#"
            UPDATE infractions SET deleted = 1
            WHERE guild_id = ? AND id = ? AND deleted = 0
            RETURNING guild_id, id, offender, moderator, type, reason, created, until, 0 AS deleted
            "#,
        )
        .bind(guild_id as i64)
        .bind(id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.as_ref().map(infraction_from_row).transpose()
    }

    async fn count(&self, guild_id: u64) -> Result<u64, ModerationError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM infractions WHERE guild_id = ? AND deleted = 0",
        )
        .bind(guild_id as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.try_get::<i64, _>("total").map_err(storage)? as u64)
    }

    async fn expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Infraction>, ModerationError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM infractions
            WHERE deleted = 0 AND until IS NOT NULL AND until > ? AND until <= ?
            ORDER BY until ASC
            "#,
        )
        .bind(encode_time(from))
        .bind(encode_time(to))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows_to_infractions(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{EscalationPolicy, ModerationService};
    use crate::infra::database::{connect, memory_pool};
    use std::collections::HashSet;
    use std::sync::Arc;

    const GUILD: u64 = 1_100_000_000_000_000_001;

    async fn store() -> SqliteInfractionStore {
        let store = SqliteInfractionStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    fn warn(offender: u64) -> NewInfraction {
        NewInfraction::new(GUILD, offender, Issuer::User(7), InfractionKind::Warn, None)
    }

    #[tokio::test]
    async fn ids_are_sequential_per_guild() {
        let store = store().await;
        assert_eq!(store.next_id(GUILD).await.unwrap(), 1);

        for expected in 1..=3 {
            assert_eq!(store.append(warn(9)).await.unwrap().id, expected);
        }
        assert_eq!(store.next_id(GUILD).await.unwrap(), 4);

        let other = NewInfraction { guild_id: 2, ..warn(9) };
        assert_eq!(store.append(other).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn appended_record_round_trips() {
        let store = store().await;
        let until = Utc::now() + chrono::Duration::minutes(10);
        let new = NewInfraction::new(GUILD, 9, Issuer::System, InfractionKind::AutoMute, Some("spam".into()))
            .until(until);

        let stored = store.append(new).await.unwrap();
        let fetched = store.get(GUILD, stored.id).await.unwrap().unwrap();

        assert_eq!(fetched.moderator, Issuer::System);
        assert_eq!(fetched.kind, InfractionKind::AutoMute);
        assert_eq!(fetched.reason, "spam");
        assert_eq!(fetched.until.map(encode_time), Some(encode_time(until)));
        assert_eq!(encode_time(fetched.created), encode_time(stored.created));
    }

    #[tokio::test]
    async fn soft_delete_hides_record_and_keeps_id_reserved() {
        let store = store().await;
        store.append(warn(9)).await.unwrap();
        store.append(warn(9)).await.unwrap();

        let removed = store.delete(GUILD, 2).await.unwrap().unwrap();
        assert_eq!(removed.id, 2);
        assert!(!removed.deleted);

        assert!(store.get(GUILD, 2).await.unwrap().is_none());
        assert!(store.delete(GUILD, 2).await.unwrap().is_none());
        assert_eq!(store.count(GUILD).await.unwrap(), 1);
        assert_eq!(store.append(warn(9)).await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn deleting_unknown_case_changes_nothing() {
        let store = store().await;
        store.append(warn(9)).await.unwrap();

        assert!(store.delete(GUILD, 99).await.unwrap().is_none());
        assert_eq!(store.count(GUILD).await.unwrap(), 1);
        assert_eq!(store.next_id(GUILD).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn find_filters_offender_and_moderator() {
        let store = store().await;
        store.append(warn(9)).await.unwrap();
        store.append(warn(10)).await.unwrap();
        store
            .append(NewInfraction::new(GUILD, 9, Issuer::System, InfractionKind::AutoWarn, None))
            .await
            .unwrap();

        let nine = store.find(GUILD, InfractionFilter::offender(9)).await.unwrap();
        assert_eq!(nine.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 3]);

        let by_mod = store.find(GUILD, InfractionFilter::moderator(7)).await.unwrap();
        assert_eq!(by_mod.len(), 2);

        let all = store.find(GUILD, InfractionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn malformed_rows_are_rejected() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO infractions (guild_id, id, offender, moderator, type, reason, created) VALUES (?, 1, 2, 3, 'yeet', 'x', '2024-01-01T00:00:00Z')",
        )
        .bind(GUILD as i64)
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.get(GUILD, 1).await.unwrap_err();
        assert!(matches!(err, ModerationError::Malformed(_)));
    }

    #[tokio::test]
    async fn expiring_window_is_half_open() {
        let store = store().await;
        let now = Utc::now();
        for minutes in [1, 5, 10] {
            let new = NewInfraction::new(GUILD, 9, Issuer::User(7), InfractionKind::Mute, None)
                .until(now + chrono::Duration::minutes(minutes));
            store.append(new).await.unwrap();
        }
        store.append(warn(9)).await.unwrap();

        let due = store
            .expiring_between(now + chrono::Duration::minutes(1), now + chrono::Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(due.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test]
    async fn fifth_warn_escalates_against_sqlite() {
        let service = ModerationService::new(store().await, EscalationPolicy::default());
        for _ in 0..4 {
            assert!(service.record(warn(9)).await.unwrap().escalation.is_none());
        }
        let outcome = service.record(warn(9)).await.unwrap();
        assert_eq!(outcome.infraction.id, 5);
        let auto = outcome.escalation.unwrap();
        assert_eq!(auto.id, 6);
        assert_eq!(auto.reason, "violated 5 infractions.");
    }

    // Deriving the id from COUNT(*) + 1 races under concurrent appends; the
    // counter row must hand out distinct ids instead.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.db");
        let pool = connect(path.to_str().unwrap()).await.unwrap();
        let store = Arc::new(SqliteInfractionStore::new(pool));
        store.migrate().await.unwrap();

        let mut handles = Vec::new();
        for offender in 0..20u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append(warn(offender)).await.unwrap().id
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids, (1..=20).collect::<HashSet<u64>>());
        assert_eq!(store.count(GUILD).await.unwrap(), 20);
    }
}
