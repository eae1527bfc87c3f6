use crate::core::tags::{Tag, TagError, TagExtras, TagStore};
use crate::infra::database::{decode_time, encode_time};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteTagStore {
    pool: Pool<Sqlite>,
}

fn storage(e: sqlx::Error) -> TagError {
    TagError::Storage(e.to_string())
}

impl SqliteTagStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), TagError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                name TEXT PRIMARY KEY,
                owner INTEGER NOT NULL,
                content TEXT NOT NULL,
                uses INTEGER NOT NULL DEFAULT 0,
                created TEXT NOT NULL,
                extras TEXT NOT NULL DEFAULT '{}'
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}

/// Build a typed tag from a row, rejecting anything that doesn't fit.
fn tag_from_row(row: &SqliteRow) -> Result<Tag, TagError> {
    let malformed = |e: sqlx::Error| TagError::Malformed(e.to_string());

    let name: String = row.try_get("name").map_err(malformed)?;
    let owner: i64 = row.try_get("owner").map_err(malformed)?;
    let content: String = row.try_get("content").map_err(malformed)?;
    let uses: i64 = row.try_get("uses").map_err(malformed)?;
    let created: String = row.try_get("created").map_err(malformed)?;
    let extras: String = row.try_get("extras").map_err(malformed)?;

    if owner <= 0 {
        return Err(TagError::Malformed(format!("tag `{}` has owner {}", name, owner)));
    }
    if uses < 0 {
        return Err(TagError::Malformed(format!("tag `{}` has {} uses", name, uses)));
    }

    let created = decode_time(&created)
        .map_err(|e| TagError::Malformed(format!("tag `{}` has a bad timestamp: {}", name, e)))?;
    let extras: TagExtras = serde_json::from_str(&extras)
        .map_err(|e| TagError::Malformed(format!("tag `{}` has bad extras: {}", name, e)))?;

    Ok(Tag {
        owner_id: owner as u64,
        content,
        uses: uses as u64,
        created,
        extras,
        name,
    })
}

fn encode_extras(extras: &TagExtras) -> Result<String, TagError> {
    serde_json::to_string(extras).map_err(|e| TagError::Storage(e.to_string()))
}

#[async_trait]
impl TagStore for SqliteTagStore {
    async fn get(&self, name: &str) -> Result<Option<Tag>, TagError> {
        let row = sqlx::query("SELECT * FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(tag_from_row).transpose()
    }

    async fn create(&self, tag: &Tag) -> Result<(), TagError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tags (name, owner, content, uses, created, extras)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(&tag.name)
        .bind(tag.owner_id as i64)
        .bind(&tag.content)
        .bind(tag.uses as i64)
        .bind(encode_time(tag.created))
        .bind(encode_extras(&tag.extras)?)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(TagError::AlreadyExists(tag.name.clone()));
        }
        Ok(())
    }

    async fn update(&self, name: &str, content: &str, extras: &TagExtras) -> Result<(), TagError> {
        let result = sqlx::query("UPDATE tags SET content = ?, extras = ? WHERE name = ?")
            .bind(content)
            .bind(encode_extras(extras)?)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(TagError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<Option<Tag>, TagError> {
        let row = sqlx::query("DELETE FROM tags WHERE name = ? RETURNING *")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref().map(tag_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Tag>, TagError> {
        let rows = sqlx::query("SELECT * FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.iter().map(tag_from_row).collect()
    }

    async fn increment_uses(&self, name: &str) -> Result<(), TagError> {
        sqlx::query("UPDATE tags SET uses = uses + 1 WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tags::{TagButton, TagService};
    use crate::infra::database::memory_pool;

    async fn store() -> SqliteTagStore {
        let store = SqliteTagStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = store().await;
        let mut tag = Tag::new("rules", 1, "Be nice.".into());
        tag.extras.button = Some(TagButton {
            label: "Docs".into(),
            url: "https://example.org".into(),
        });
        store.create(&tag).await.unwrap();

        let fetched = store.get("rules").await.unwrap().unwrap();
        assert_eq!(fetched.content, "Be nice.");
        assert_eq!(fetched.extras, tag.extras);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = store().await;
        let tag = Tag::new("rules", 1, "a".into());
        store.create(&tag).await.unwrap();

        let err = store.create(&Tag::new("rules", 2, "b".into())).await.unwrap_err();
        assert!(matches!(err, TagError::AlreadyExists(_)));
        assert_eq!(store.get("rules").await.unwrap().unwrap().owner_id, 1);
    }

    #[tokio::test]
    async fn update_delete_and_uses() {
        let store = store().await;
        store.create(&Tag::new("faq", 1, "old".into())).await.unwrap();

        store.update("faq", "new", &TagExtras::default()).await.unwrap();
        store.increment_uses("faq").await.unwrap();
        store.increment_uses("faq").await.unwrap();

        let tag = store.get("faq").await.unwrap().unwrap();
        assert_eq!(tag.content, "new");
        assert_eq!(tag.uses, 2);

        assert!(matches!(
            store.update("nope", "x", &TagExtras::default()).await,
            Err(TagError::NotFound(_))
        ));

        assert_eq!(store.delete("faq").await.unwrap().unwrap().content, "new");
        assert!(store.delete("faq").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_rows_are_rejected() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO tags (name, owner, content, created) VALUES ('faq', 'someone', 'hi', '2024-01-01T00:00:00.000000Z')",
        )
        .execute(&store.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO tags (name, owner, content, created, extras) VALUES ('rules', 1, 'hi', '2024-01-01T00:00:00.000000Z', 'not json')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        assert!(matches!(store.get("faq").await, Err(TagError::Malformed(_))));
        assert!(matches!(store.get("rules").await, Err(TagError::Malformed(_))));
        assert!(matches!(store.list().await, Err(TagError::Malformed(_))));
    }

    #[tokio::test]
    async fn uses_shown_after_invoking_are_current() {
        let service = TagService::new(store().await);
        service
            .create("faq", 1, "Read the docs.".into(), TagExtras::default())
            .await
            .unwrap();

        service.invoke("faq").await.unwrap();
        service.invoke("faq").await.unwrap();
        assert_eq!(service.get("faq").await.unwrap().uses, 2);
    }

    #[tokio::test]
    async fn service_lookups_are_case_insensitive() {
        let service = TagService::new(store().await);
        service
            .create("Welcome", 1, "hi".into(), TagExtras::default())
            .await
            .unwrap();

        assert_eq!(service.invoke("WELCOME").await.unwrap().content, "hi");
        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "welcome");
    }
}
