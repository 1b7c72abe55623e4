use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{auth::StaffUser, error::ApiError, state::AppState, users::repo::User};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/stats", get(stats))
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(users))
}

#[instrument(skip_all)]
pub async fn stats(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let users: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
        .fetch_one(&state.db)
        .await?;
    let recipes: i64 = sqlx::query_scalar("SELECT count(*) FROM recipes")
        .fetch_one(&state.db)
        .await?;
    let tags: i64 = sqlx::query_scalar("SELECT count(*) FROM tags")
        .fetch_one(&state.db)
        .await?;
    let ingredients: i64 = sqlx::query_scalar("SELECT count(*) FROM ingredients")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(serde_json::json!({
        "users": users,
        "recipes": recipes,
        "tags": tags,
        "ingredients": ingredients,
    })))
}
