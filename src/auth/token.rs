use async_trait::async_trait;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

pub const TOKEN_LENGTH: usize = 40;

/// Opaque bearer keys live behind this seam so handlers never care where
/// tokens are kept.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Return the user's token, creating one if none exists yet.
    async fn issue(&self, user_id: Uuid) -> anyhow::Result<String>;
    /// Resolve a presented key to the owning user, if any.
    async fn resolve(&self, key: &str) -> anyhow::Result<Option<Uuid>>;
}

/// Generate a fresh token key from the OS RNG.
pub fn generate_key() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct PgTokenStore {
    db: PgPool,
}

impl PgTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        // One token per user. The no-op update makes RETURNING yield the
        // existing key when the row is already there, so concurrent issues
        // converge on a single key.
        let key = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO auth_tokens (key, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING key
            "#,
        )
        .bind(generate_key())
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        debug!(user_id = %user_id, "token issued");
        Ok(key)
    }

    async fn resolve(&self, key: &str) -> anyhow::Result<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id
            FROM auth_tokens
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await?;
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_forty_alphanumeric_chars() {
        let key = generate_key();
        assert_eq!(key.len(), TOKEN_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_keys_do_not_collide() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
    }
}
