mod admin;
mod app;
mod auth;
mod config;
mod error;
mod ingredients;
mod media;
mod recipes;
mod state;
mod tags;
mod users;

use tracing::info;

use crate::{state::AppState, users::repo::User};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipebox=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .map_err(|e| anyhow::anyhow!("migrations failed: {e}"))?;

    seed_superuser(&app_state).await?;

    let app = app::build_app(app_state);
    app::serve(app).await
}

/// Create the superuser named by ADMIN_EMAIL/ADMIN_PASSWORD, once.
async fn seed_superuser(state: &AppState) -> anyhow::Result<()> {
    let Some(admin) = &state.config.admin else {
        return Ok(());
    };

    let email = users::service::normalize_email(&admin.email);
    if let Some(existing) = User::find_by_email(&state.db, &email).await? {
        info!(email = %existing.email, "superuser already present");
        return Ok(());
    }

    let user = users::service::create_superuser(&state.db, &email, &admin.password)
        .await
        .map_err(anyhow::Error::new)?;
    info!(user_id = %user.id, email = %user.email, "seeded superuser");
    Ok(())
}
