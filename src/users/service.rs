use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    auth::password::{hash_password, verify_password},
    error::{is_unique_violation, ApiError},
    users::repo::User,
};

const PASSWORD_MIN_LENGTH: usize = 5;

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trim surrounding whitespace and lower-case the domain part. The local
/// part keeps its case: "Joe@EXAMPLE.com" and "joe@example.com" may be
/// different mailboxes.
pub fn normalize_email(raw: &str) -> String {
    let email = raw.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::validation("email", "this field may not be blank"));
    }
    if !is_valid_email(email) {
        return Err(ApiError::validation("email", "enter a valid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < PASSWORD_MIN_LENGTH {
        return Err(ApiError::validation(
            "password",
            "ensure this field has at least 5 characters",
        ));
    }
    Ok(())
}

pub async fn create_user(
    db: &PgPool,
    email: &str,
    password: &str,
    name: &str,
    is_staff: bool,
    is_superuser: bool,
) -> Result<User, ApiError> {
    let email = normalize_email(email);
    validate_email(&email)?;
    validate_password(password)?;

    if User::find_by_email(db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::EmailTaken);
    }

    let hash = hash_password(password)?;
    let user = User::create(db, &email, name, &hash, is_staff, is_superuser)
        .await
        .map_err(|e| {
            // Lost the race against a concurrent registration for the same email.
            if is_unique_violation(&e) {
                ApiError::EmailTaken
            } else {
                ApiError::Internal(e)
            }
        })?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

pub async fn create_superuser(db: &PgPool, email: &str, password: &str) -> Result<User, ApiError> {
    create_user(db, email, password, "", true, true).await
}

/// Validate an email/password pair. Unknown email, wrong password and
/// inactive account all collapse into the same generic error.
pub async fn authenticate(db: &PgPool, email: &str, password: &str) -> Result<User, ApiError> {
    let email = normalize_email(email);

    let Some(user) = User::find_by_email(db, &email).await? else {
        warn!(email = %email, "authentication against unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "authentication with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        warn!(user_id = %user.id, "authentication against inactive account");
        return Err(ApiError::InvalidCredentials);
    }

    User::touch_last_login(db, user.id).await?;
    info!(user_id = %user.id, "user authenticated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_only_the_domain() {
        let samples = [
            ("test1@EXAMPLE.com", "test1@example.com"),
            ("Test2@Example.com", "Test2@example.com"),
            ("TEST3@EXAMPLE.COM", "TEST3@example.com"),
            ("test4@example.COM", "test4@example.com"),
            ("  test5@example.com  ", "test5@example.com"),
        ];
        for (raw, expected) in samples {
            assert_eq!(normalize_email(raw), expected);
        }
    }

    #[test]
    fn blank_email_fails_validation() {
        let err = validate_email("").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.to_string().starts_with("email:"));
    }

    #[test]
    fn malformed_email_fails_validation() {
        for bad in ["not-an-email", "missing@domain", "@no-local.com", "a b@x.com"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
        assert!(validate_email("cook@example.com").is_ok());
    }

    #[test]
    fn short_password_fails_validation() {
        assert!(validate_password("pw").is_err());
        assert!(validate_password("pw123").is_ok());
    }
}
