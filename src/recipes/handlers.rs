use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    media,
    recipes::{
        dto::{
            CreateRecipeRequest, Pagination, RecipeDetail, RecipeImageResponse, RecipeSummary,
            UpdateRecipeRequest,
        },
        repo::Recipe,
        service,
    },
    state::AppState,
};

const UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route(
            "/recipes/:id",
            axum::routing::put(update_recipe)
                .patch(update_recipe)
                .delete(delete_recipe),
        )
        .route(
            "/recipes/:id/upload-image",
            post(upload_image).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
}

// --- handlers ---

#[instrument(skip(state, user))]
pub async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<RecipeSummary>>, ApiError> {
    let recipes = service::list_recipes(&state.db, user.id, p.limit, p.offset).await?;
    Ok(Json(recipes))
}

#[instrument(skip(state, user))]
pub async fn get_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = Recipe::find_for_user(&state.db, user.id, id)
        .await?
        .ok_or(ApiError::NotFound("recipe"))?;
    Ok(Json(service::load_detail(&state.db, recipe).await?))
}

#[instrument(skip(state, user, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, HeaderMap, Json<RecipeDetail>), ApiError> {
    let detail = service::create_recipe(&state.db, user.id, payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/recipes/{}", detail.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(detail)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let detail = service::update_recipe(&state.db, user.id, id, payload).await?;
    Ok(Json(detail))
}

#[instrument(skip(state, user))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !Recipe::delete(&state.db, user.id, id).await? {
        return Err(ApiError::NotFound("recipe"));
    }
    info!(user_id = %user.id, recipe_id = %id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipes/:id/upload-image (multipart, single `image` field).
#[instrument(skip(state, user, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<RecipeImageResponse>, ApiError> {
    // The recipe must exist (and be the caller's) before we accept bytes.
    let recipe = Recipe::find_for_user(&state.db, user.id, id)
        .await?
        .ok_or(ApiError::NotFound("recipe"))?;

    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|_| ApiError::validation("image", "invalid multipart body"))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::validation("image", "could not read uploaded file"))?;
        upload = Some((content_type, data));
        break;
    }

    let Some((content_type, data)) = upload else {
        return Err(ApiError::validation("image", "this field is required"));
    };
    if data.is_empty() {
        return Err(ApiError::validation("image", "the submitted file is empty"));
    }
    let Some(ext) = media::ext_from_mime(&content_type) else {
        return Err(ApiError::validation("image", "unsupported image type"));
    };

    let key = media::recipe_image_key(ext);
    state.media.put(&key, data, &content_type).await?;

    let updated = Recipe::set_image(&state.db, user.id, recipe.id, &key)
        .await?
        .ok_or(ApiError::NotFound("recipe"))?;

    // Replaced images are orphans; losing one is not worth failing the request.
    if let Some(old) = recipe.image_path {
        if let Err(e) = state.media.delete(&old).await {
            warn!(error = %e, key = %old, "could not delete replaced image");
        }
    }

    info!(user_id = %user.id, recipe_id = %updated.id, key = %key, "image uploaded");
    Ok(Json(RecipeImageResponse {
        id: updated.id,
        image: media::public_url(&key),
    }))
}
