use std::path::PathBuf;

use serde::Deserialize;

/// Superuser seeded at startup when ADMIN_EMAIL/ADMIN_PASSWORD are set.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub media_root: PathBuf,
    pub admin: Option<AdminSeed>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let media_root = std::env::var("MEDIA_ROOT")
            .unwrap_or_else(|_| "media".into())
            .into();
        let admin = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };
        Ok(Self {
            database_url,
            media_root,
            admin,
        })
    }
}
