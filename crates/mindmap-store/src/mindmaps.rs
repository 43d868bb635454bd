//! Mind maps. Every query is scoped to the owning user.

use chrono::{DateTime, Utc};
use mindmap_core::OutlineNode;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{Result, StoreError};
use crate::models::{MindMap, MindMapSummary, NewMindMap};

#[derive(sqlx::FromRow)]
struct MindMapRow {
    id: String,
    user_id: String,
    title: String,
    outline: String,
    language: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MindMapRow> for MindMap {
    type Error = StoreError;

    fn try_from(row: MindMapRow) -> Result<Self> {
        Ok(Self {
            outline: serde_json::from_str(&row.outline)?,
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            language: row.language,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Database {
    pub async fn create_mindmap(&self, user_id: &str, new: &NewMindMap, now: DateTime<Utc>) -> Result<MindMap> {
        let map = MindMap {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: new.title.clone(),
            outline: new.outline.clone(),
            language: new.language.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO mindmaps (id, user_id, title, outline, language, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&map.id)
        .bind(&map.user_id)
        .bind(&map.title)
        .bind(serde_json::to_string(&map.outline)?)
        .bind(&map.language)
        .bind(map.created_at)
        .bind(map.updated_at)
        .execute(self.pool())
        .await?;

        tracing::debug!(mindmap_id = %map.id, user_id, nodes = map.outline.node_count(), "Saved mind map");
        Ok(map)
    }

    /// A mind map owned by `user_id`; someone else's map is `None`
    pub async fn get_mindmap(&self, user_id: &str, id: &str) -> Result<Option<MindMap>> {
        sqlx::query_as::<_, MindMapRow>(
            "SELECT id, user_id, title, outline, language, created_at, updated_at \
             FROM mindmaps WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?
        .map(MindMap::try_from)
        .transpose()
    }

    /// Newest first
    pub async fn list_mindmaps(&self, user_id: &str) -> Result<Vec<MindMapSummary>> {
        let maps = sqlx::query_as::<_, MindMapSummary>(
            "SELECT id, title, language, created_at, updated_at \
             FROM mindmaps WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(maps)
    }

    /// Replace title and tree
    pub async fn update_mindmap(
        &self,
        user_id: &str,
        id: &str,
        title: &str,
        outline: &OutlineNode,
        now: DateTime<Utc>,
    ) -> Result<MindMap> {
        let result = sqlx::query(
            "UPDATE mindmaps SET title = ?, outline = ?, updated_at = ? WHERE id = ? AND user_id = ?",
        )
        .bind(title)
        .bind(serde_json::to_string(outline)?)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_mindmap(user_id, id).await?.ok_or(StoreError::NotFound)
    }

    pub async fn delete_mindmap(&self, user_id: &str, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM mindmaps WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use chrono::Duration;

    async fn user(db: &Database, name: &str) -> String {
        db.create_user(
            &NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: "hash".into(),
            },
            Utc::now(),
        )
        .await
        .unwrap()
        .id
    }

    fn new_map(title: &str) -> NewMindMap {
        NewMindMap {
            title: title.into(),
            outline: OutlineNode::new(title).with_children(vec![OutlineNode::new("Branch")]),
            language: "en".into(),
        }
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let db = Database::in_memory().await.unwrap();
        let owner = user(&db, "ada").await;
        let now = Utc::now();

        let map = db.create_mindmap(&owner, &new_map("Rust"), now).await.unwrap();
        let loaded = db.get_mindmap(&owner, &map.id).await.unwrap().unwrap();
        assert_eq!(loaded.outline, map.outline);

        let replaced = OutlineNode::new("Rust 2").with_children(vec![OutlineNode::new("Ownership")]);
        let updated = db
            .update_mindmap(&owner, &map.id, "Rust 2", &replaced, now + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(updated.title, "Rust 2");
        assert_eq!(updated.outline, replaced);

        db.delete_mindmap(&owner, &map.id).await.unwrap();
        assert!(db.get_mindmap(&owner, &map.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_maps_are_invisible_to_other_users() {
        let db = Database::in_memory().await.unwrap();
        let owner = user(&db, "ada").await;
        let stranger = user(&db, "eve").await;
        let map = db.create_mindmap(&owner, &new_map("Secret"), Utc::now()).await.unwrap();

        assert!(db.get_mindmap(&stranger, &map.id).await.unwrap().is_none());
        assert!(db.list_mindmaps(&stranger).await.unwrap().is_empty());
        assert!(matches!(
            db.update_mindmap(&stranger, &map.id, "x", &map.outline, Utc::now()).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(db.delete_mindmap(&stranger, &map.id).await, Err(StoreError::NotFound)));
        assert_eq!(db.list_mindmaps(&owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let owner = user(&db, "ada").await;
        let t0 = Utc::now();
        db.create_mindmap(&owner, &new_map("Old"), t0).await.unwrap();
        db.create_mindmap(&owner, &new_map("New"), t0 + Duration::minutes(1)).await.unwrap();

        let titles: Vec<_> = db
            .list_mindmaps(&owner)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, ["New", "Old"]);
    }

    #[tokio::test]
    async fn test_user_deletion_cascades() {
        let db = Database::in_memory().await.unwrap();
        let owner = user(&db, "ada").await;
        let map = db.create_mindmap(&owner, &new_map("Gone"), Utc::now()).await.unwrap();

        db.delete_user(&owner).await.unwrap();
        assert!(db.get_mindmap(&owner, &map.id).await.unwrap().is_none());
    }
}
