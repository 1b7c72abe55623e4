use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

/// Recipe record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image_path: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const RECIPE_COLUMNS: &str =
    "id, user_id, title, description, time_minutes, price, link, image_path, created_at";

impl Recipe {
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        title: &str,
        description: &str,
        time_minutes: i32,
        price: Decimal,
        link: &str,
    ) -> anyhow::Result<Recipe> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            INSERT INTO recipes (user_id, title, description, time_minutes, price, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(time_minutes)
        .bind(price)
        .bind(link)
        .fetch_one(&mut **tx)
        .await?;
        Ok(recipe)
    }

    /// The requester's recipes, newest first.
    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            SELECT {RECIPE_COLUMNS}
            FROM recipes
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Owner-scoped lookup: someone else's recipe is simply absent.
    pub async fn find_for_user(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(recipe)
    }

    /// Update scalar fields; NULL binds leave the column untouched.
    pub async fn update_fields_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        time_minutes: Option<i32>,
        price: Option<Decimal>,
        link: Option<&str>,
    ) -> anyhow::Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            UPDATE recipes
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                time_minutes = COALESCE($5, time_minutes),
                price = COALESCE($6, price),
                link = COALESCE($7, link)
            WHERE id = $1 AND user_id = $2
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(time_minutes)
        .bind(price)
        .bind(link)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(recipe)
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_image(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        image_path: &str,
    ) -> anyhow::Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            UPDATE recipes
            SET image_path = $3
            WHERE id = $1 AND user_id = $2
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(image_path)
        .fetch_optional(db)
        .await?;
        Ok(recipe)
    }

    pub async fn link_tag_tx(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: Uuid,
        tag_id: Uuid,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(recipe_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn link_ingredient_tx(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: Uuid,
        ingredient_id: Uuid,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(recipe_id)
        .bind(ingredient_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn clear_tags_tx(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: Uuid,
    ) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn clear_ingredients_tx(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: Uuid,
    ) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
