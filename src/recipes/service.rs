use std::collections::HashMap;

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ApiError,
    ingredients::{Ingredient, IngredientOut},
    recipes::{
        dto::{CreateRecipeRequest, IngredientInput, RecipeDetail, RecipeSummary, TagInput, UpdateRecipeRequest},
        repo::Recipe,
    },
    tags::{Tag, TagOut},
};

const PRICE_MAX: Decimal = Decimal::from_parts(99999, 0, 0, false, 2); // 999.99

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::validation("title", "this field may not be blank"));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), ApiError> {
    if price.is_sign_negative() {
        return Err(ApiError::validation("price", "ensure this value is not negative"));
    }
    if price > PRICE_MAX {
        return Err(ApiError::validation(
            "price",
            "ensure that there are no more than 5 digits in total",
        ));
    }
    if price.scale() > 2 {
        return Err(ApiError::validation(
            "price",
            "ensure that there are no more than 2 decimal places",
        ));
    }
    Ok(())
}

pub fn validate_create(req: &CreateRecipeRequest) -> Result<(), ApiError> {
    validate_title(&req.title)?;
    validate_price(req.price)
}

pub fn validate_update(req: &UpdateRecipeRequest) -> Result<(), ApiError> {
    if let Some(title) = &req.title {
        validate_title(title)?;
    }
    if let Some(price) = req.price {
        validate_price(price)?;
    }
    Ok(())
}

async fn resolve_and_link_tags(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    recipe_id: Uuid,
    inputs: &[TagInput],
) -> anyhow::Result<()> {
    for input in inputs {
        let tag = Tag::get_or_create_tx(tx, user_id, input.name.trim())
            .await
            .with_context(|| format!("get-or-create tag {:?}", input.name))?;
        Recipe::link_tag_tx(tx, recipe_id, tag.id).await?;
    }
    Ok(())
}

async fn resolve_and_link_ingredients(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    recipe_id: Uuid,
    inputs: &[IngredientInput],
) -> anyhow::Result<()> {
    for input in inputs {
        let ingredient = Ingredient::get_or_create_tx(tx, user_id, input.name.trim())
            .await
            .with_context(|| format!("get-or-create ingredient {:?}", input.name))?;
        Recipe::link_ingredient_tx(tx, recipe_id, ingredient.id).await?;
    }
    Ok(())
}

/// List the user's recipes with their tag and ingredient sets attached.
/// Relations come back in two batch queries rather than one per row.
pub async fn list_recipes(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<RecipeSummary>> {
    let recipes = Recipe::list_by_user(db, user_id, limit, offset).await?;
    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();

    let mut tags: HashMap<Uuid, Vec<TagOut>> = HashMap::new();
    for (recipe_id, tag) in Tag::for_recipes(db, &ids).await? {
        tags.entry(recipe_id).or_default().push(tag);
    }
    let mut ingredients: HashMap<Uuid, Vec<IngredientOut>> = HashMap::new();
    for (recipe_id, ingredient) in Ingredient::for_recipes(db, &ids).await? {
        ingredients.entry(recipe_id).or_default().push(ingredient);
    }

    Ok(recipes
        .into_iter()
        .map(|r| {
            let id = r.id;
            RecipeSummary::from_parts(
                r,
                tags.remove(&id).unwrap_or_default(),
                ingredients.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

pub async fn load_detail(db: &PgPool, recipe: Recipe) -> anyhow::Result<RecipeDetail> {
    let ids = [recipe.id];
    let tags = Tag::for_recipes(db, &ids)
        .await?
        .into_iter()
        .map(|(_, t)| t)
        .collect();
    let ingredients = Ingredient::for_recipes(db, &ids)
        .await?
        .into_iter()
        .map(|(_, i)| i)
        .collect();
    Ok(RecipeDetail::from_parts(recipe, tags, ingredients))
}

pub async fn create_recipe(
    db: &PgPool,
    user_id: Uuid,
    req: CreateRecipeRequest,
) -> Result<RecipeDetail, ApiError> {
    validate_create(&req)?;

    let mut tx = db.begin().await.context("begin tx")?;
    let recipe = Recipe::create_tx(
        &mut tx,
        user_id,
        req.title.trim(),
        &req.description,
        req.time_minutes,
        req.price,
        &req.link,
    )
    .await?;
    resolve_and_link_tags(&mut tx, user_id, recipe.id, &req.tags).await?;
    resolve_and_link_ingredients(&mut tx, user_id, recipe.id, &req.ingredients).await?;
    tx.commit().await.context("commit tx")?;

    info!(user_id = %user_id, recipe_id = %recipe.id, "recipe created");
    Ok(load_detail(db, recipe).await?)
}

/// Partial update. A present `tags`/`ingredients` key, empty or not, fully
/// replaces the association set; an absent key leaves it alone.
pub async fn update_recipe(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    req: UpdateRecipeRequest,
) -> Result<RecipeDetail, ApiError> {
    validate_update(&req)?;

    let mut tx = db.begin().await.context("begin tx")?;
    let recipe = Recipe::update_fields_tx(
        &mut tx,
        user_id,
        id,
        req.title.as_deref().map(str::trim),
        req.description.as_deref(),
        req.time_minutes,
        req.price,
        req.link.as_deref(),
    )
    .await?
    .ok_or(ApiError::NotFound("recipe"))?;

    if let Some(tags) = &req.tags {
        Recipe::clear_tags_tx(&mut tx, recipe.id).await?;
        resolve_and_link_tags(&mut tx, user_id, recipe.id, tags).await?;
    }
    if let Some(ingredients) = &req.ingredients {
        Recipe::clear_ingredients_tx(&mut tx, recipe.id).await?;
        resolve_and_link_ingredients(&mut tx, user_id, recipe.id, ingredients).await?;
    }
    tx.commit().await.context("commit tx")?;

    info!(user_id = %user_id, recipe_id = %recipe.id, "recipe updated");
    Ok(load_detail(db, recipe).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_req(title: &str, price: Decimal) -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: title.into(),
            description: String::new(),
            time_minutes: 30,
            price,
            link: String::new(),
            tags: vec![],
            ingredients: vec![],
        }
    }

    #[test]
    fn blank_title_fails_validation() {
        let err = validate_create(&create_req("   ", Decimal::new(500, 2))).unwrap_err();
        assert!(err.to_string().starts_with("title:"));
    }

    #[test]
    fn negative_price_fails_validation() {
        let err = validate_create(&create_req("Soup", Decimal::new(-500, 2))).unwrap_err();
        assert!(err.to_string().starts_with("price:"));
    }

    #[test]
    fn price_over_five_digits_fails_validation() {
        assert!(validate_create(&create_req("Soup", Decimal::new(99999, 2))).is_ok());
        let err = validate_create(&create_req("Soup", Decimal::new(100000, 2))).unwrap_err();
        assert!(err.to_string().contains("5 digits"));
    }

    #[test]
    fn price_with_three_decimal_places_fails_validation() {
        let err = validate_create(&create_req("Soup", Decimal::new(5999, 3))).unwrap_err();
        assert!(err.to_string().contains("decimal places"));
    }

    #[test]
    fn update_ignores_fields_that_are_absent() {
        // An all-None update carries nothing to validate.
        assert!(validate_update(&UpdateRecipeRequest::default()).is_ok());

        let bad_title = UpdateRecipeRequest {
            title: Some("  ".into()),
            ..Default::default()
        };
        assert!(validate_update(&bad_title).is_err());
    }
}
