use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    ingredients::IngredientOut,
    media,
    recipes::repo::Recipe,
    tags::TagOut,
};

/// Nested tag payload on recipe create/update.
#[derive(Debug, Clone, Deserialize)]
pub struct TagInput {
    pub name: String,
}

/// Nested ingredient payload on recipe create/update.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientInput {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub tags: Vec<TagInput>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
}

/// Partial update. For `tags` and `ingredients` the distinction between an
/// absent key (leave associations alone) and an empty list (clear them) is
/// load-bearing, which is why both are `Option<Vec<_>>`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<TagInput>>,
    pub ingredients: Option<Vec<IngredientInput>>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    20
}

/// List-view shape of a recipe.
#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<TagOut>,
    pub ingredients: Vec<IngredientOut>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Detail-view shape: the summary fields plus description and image.
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<TagOut>,
    pub ingredients: Vec<IngredientOut>,
    pub description: String,
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl RecipeSummary {
    pub fn from_parts(r: Recipe, tags: Vec<TagOut>, ingredients: Vec<IngredientOut>) -> Self {
        Self {
            id: r.id,
            title: r.title,
            time_minutes: r.time_minutes,
            price: r.price,
            link: r.link,
            tags,
            ingredients,
            created_at: r.created_at,
        }
    }
}

impl RecipeDetail {
    pub fn from_parts(r: Recipe, tags: Vec<TagOut>, ingredients: Vec<IngredientOut>) -> Self {
        Self {
            id: r.id,
            title: r.title,
            time_minutes: r.time_minutes,
            price: r.price,
            link: r.link,
            tags,
            ingredients,
            description: r.description,
            image: r.image_path.as_deref().map(media::public_url),
            created_at: r.created_at,
        }
    }
}

/// Response for the image-upload endpoint.
#[derive(Debug, Serialize)]
pub struct RecipeImageResponse {
    pub id: Uuid,
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recipe() -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Lentil soup".into(),
            description: "Cheap and filling.".into(),
            time_minutes: 35,
            price: Decimal::new(450, 2),
            link: String::new(),
            image_path: Some("uploads/recipe/abc.jpg".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn absent_tags_key_deserializes_to_none() {
        let req: UpdateRecipeRequest = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        assert!(req.tags.is_none());
        assert!(req.ingredients.is_none());
    }

    #[test]
    fn empty_tags_list_deserializes_to_some_empty() {
        let req: UpdateRecipeRequest = serde_json::from_str(r#"{"tags": []}"#).unwrap();
        assert_eq!(req.tags.map(|t| t.len()), Some(0));
        assert!(req.ingredients.is_none());
    }

    #[test]
    fn create_request_accepts_nested_tags_and_defaults() {
        let req: CreateRecipeRequest = serde_json::from_str(
            r#"{
                "title": "Avocado toast",
                "time_minutes": 10,
                "price": 5.99,
                "tags": [{"name": "Vegan"}, {"name": "Dinner"}]
            }"#,
        )
        .unwrap();
        assert_eq!(req.title, "Avocado toast");
        assert_eq!(req.price, Decimal::new(599, 2));
        assert_eq!(req.tags.len(), 2);
        assert_eq!(req.tags[0].name, "Vegan");
        assert!(req.ingredients.is_empty());
        assert_eq!(req.description, "");
        assert_eq!(req.link, "");
    }

    #[test]
    fn summary_shape_has_no_description_or_image() {
        let summary = RecipeSummary::from_parts(sample_recipe(), vec![], vec![]);
        let json = serde_json::to_value(&summary).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("title"));
        assert!(!obj.contains_key("description"));
        assert!(!obj.contains_key("image"));
    }

    #[test]
    fn detail_shape_adds_description_and_image_url() {
        let detail = RecipeDetail::from_parts(sample_recipe(), vec![], vec![]);
        let json = serde_json::to_value(&detail).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["description"], "Cheap and filling.");
        assert_eq!(obj["image"], "/media/uploads/recipe/abc.jpg");
    }

    #[test]
    fn detail_image_is_null_when_no_upload_happened() {
        let mut recipe = sample_recipe();
        recipe.image_path = None;
        let detail = RecipeDetail::from_parts(recipe, vec![], vec![]);
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.as_object().unwrap()["image"].is_null());
    }
}
