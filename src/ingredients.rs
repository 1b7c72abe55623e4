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

/// Ingredient record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Wire shape for an ingredient.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IngredientOut {
    pub id: Uuid,
    pub name: String,
}

impl From<Ingredient> for IngredientOut {
    fn from(i: Ingredient) -> Self {
        Self { id: i.id, name: i.name }
    }
}

#[derive(Debug, Deserialize)]
pub struct IngredientUpdate {
    pub name: String,
}

impl Ingredient {
    /// Per-user get-or-create, same upsert shape as tags.
    pub async fn get_or_create_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Ingredient> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (user_id, name)
            VALUES ($1, $2)
            ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
        Ok(ingredient)
    }

    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, user_id, name, created_at
            FROM ingredients
            WHERE user_id = $1
            ORDER BY name DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(ingredients)
    }

    /// Ingredients for a batch of recipes, as (recipe_id, ingredient) pairs.
    pub async fn for_recipes(
        db: &PgPool,
        recipe_ids: &[Uuid],
    ) -> anyhow::Result<Vec<(Uuid, IngredientOut)>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String)>(
            r#"
            SELECT ri.recipe_id, i.id, i.name
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY i.name
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(recipe_id, id, name)| (recipe_id, IngredientOut { id, name }))
            .collect())
    }

    pub async fn rename(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            UPDATE ingredients
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
        Ok(ingredient)
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1 AND user_id = $2")
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
        .route("/ingredients", get(list_ingredients))
        .route(
            "/ingredients/:id",
            patch(update_ingredient).put(update_ingredient).delete(delete_ingredient),
        )
}

#[instrument(skip(state, user))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<IngredientOut>>, ApiError> {
    let ingredients = Ingredient::list_by_user(&state.db, user.id).await?;
    Ok(Json(ingredients.into_iter().map(IngredientOut::from).collect()))
}

#[instrument(skip(state, user, payload))]
pub async fn update_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<IngredientUpdate>,
) -> Result<Json<IngredientOut>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("name", "this field may not be blank"));
    }

    let ingredient = Ingredient::rename(&state.db, user.id, id, payload.name.trim())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::validation("name", "ingredient with this name already exists")
            } else {
                ApiError::Internal(e)
            }
        })?
        .ok_or(ApiError::NotFound("ingredient"))?;

    Ok(Json(ingredient.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !Ingredient::delete(&state.db, user.id, id).await? {
        return Err(ApiError::NotFound("ingredient"));
    }
    info!(user_id = %user.id, ingredient_id = %id, "ingredient deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredient_out_serializes_id_and_name_only() {
        let out = IngredientOut {
            id: Uuid::new_v4(),
            name: "Salt".into(),
        };
        let json = serde_json::to_value(&out).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["name"], "Salt");
    }
}
