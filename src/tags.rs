use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::{is_unique_violation, ApiError},
    state::AppState,
};

/// Tag record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Wire shape for a tag, nested in recipes and returned by the tag endpoints.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagOut {
    pub id: Uuid,
    pub name: String,
}

impl From<Tag> for TagOut {
    fn from(t: Tag) -> Self {
        Self { id: t.id, name: t.name }
    }
}

#[derive(Debug, Deserialize)]
pub struct TagUpdate {
    pub name: String,
}

impl Tag {
    /// Per-user get-or-create. The upsert makes concurrent calls for the
    /// same (user, name) converge on a single row.
    pub async fn get_or_create_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (user_id, name)
            VALUES ($1, $2)
            ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
        Ok(tag)
    }

    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, user_id, name, created_at
            FROM tags
            WHERE user_id = $1
            ORDER BY name DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(tags)
    }

    /// Tags for a batch of recipes, as (recipe_id, tag) pairs.
    pub async fn for_recipes(
        db: &PgPool,
        recipe_ids: &[Uuid],
    ) -> anyhow::Result<Vec<(Uuid, TagOut)>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String)>(
            r#"
            SELECT rt.recipe_id, t.id, t.name
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(recipe_id, id, name)| (recipe_id, TagOut { id, name }))
            .collect())
    }

    pub async fn rename(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags
            SET name = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(db)
        .await?;
        Ok(tag)
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- handlers ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route("/tags/:id", patch(update_tag).put(update_tag).delete(delete_tag))
}

#[instrument(skip(state, user))]
pub async fn list_tags(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<TagOut>>, ApiError> {
    let tags = Tag::list_by_user(&state.db, user.id).await?;
    Ok(Json(tags.into_iter().map(TagOut::from).collect()))
}

#[instrument(skip(state, user, payload))]
pub async fn update_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TagUpdate>,
) -> Result<Json<TagOut>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("name", "this field may not be blank"));
    }

    let tag = Tag::rename(&state.db, user.id, id, payload.name.trim())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::validation("name", "tag with this name already exists")
            } else {
                ApiError::Internal(e)
            }
        })?
        .ok_or(ApiError::NotFound("tag"))?;

    Ok(Json(tag.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !Tag::delete(&state.db, user.id, id).await? {
        return Err(ApiError::NotFound("tag"));
    }
    info!(user_id = %user.id, tag_id = %id, "tag deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_out_serializes_id_and_name_only() {
        let out = TagOut {
            id: Uuid::new_v4(),
            name: "Vegan".into(),
        };
        let json = serde_json::to_value(&out).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["name"], "Vegan");
    }

    #[test]
    fn tag_update_requires_a_name_field() {
        assert!(serde_json::from_str::<TagUpdate>(r#"{}"#).is_err());
        let upd: TagUpdate = serde_json::from_str(r#"{"name": "Dessert"}"#).unwrap();
        assert_eq!(upd.name, "Dessert");
    }
}
