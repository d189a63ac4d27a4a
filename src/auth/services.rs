use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{check_credentials, hash_password},
    repo::UserRepo,
    repo_types::{NewUser, User},
};
use crate::error::{AppError, AppResult};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 8;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn validate_registration(req: &RegisterRequest) -> AppResult<()> {
    let mut errors = Vec::new();
    let name_len = req.username.chars().count();
    if name_len == 0 {
        errors.push("Username is required".to_string());
    } else if !(USERNAME_MIN..=USERNAME_MAX).contains(&name_len) {
        errors.push(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        ));
    }
    if req.email.is_empty() {
        errors.push("Email is required".to_string());
    } else if !is_valid_email(&req.email) {
        errors.push("Please provide a valid email".to_string());
    }
    if req.password.chars().count() < PASSWORD_MIN {
        errors.push(format!("Password must be at least {PASSWORD_MIN} characters"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Creates the account and returns it with a fresh session token.
pub async fn register(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    mut req: RegisterRequest,
) -> AppResult<(User, String)> {
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_lowercase();
    validate_registration(&req)?;

    if users
        .find_by_email_or_username(&req.email, &req.username)
        .await?
        .is_some()
    {
        warn!(email = %req.email, username = %req.username, "user already exists");
        return Err(AppError::Conflict(
            "User already exists with this email or username".into(),
        ));
    }

    let password_hash = hash_password(&req.password)?;
    let user = users
        .create(NewUser {
            username: req.username,
            email: req.email,
            password_hash,
        })
        .await?;

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user, token))
}

/// Unknown email and wrong password are reported identically.
pub async fn login(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    req: LoginRequest,
) -> AppResult<(User, String)> {
    let email = req.email.trim().to_lowercase();

    let user = users.find_by_email(&email).await?;
    let stored = user.as_ref().map(|u| u.password_hash.as_str());
    let user = match (check_credentials(&req.password, stored)?, user) {
        (true, Some(user)) => user,
        (_, user) => {
            warn!(email = %email, known = user.is_some(), "login rejected");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::JwtConfig, memory::MemoryStore};

    fn keys() -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_days: 30,
        })
    }

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "hunter2hunter2".into(),
        }
    }

    #[test]
    fn email_regex() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[tokio::test]
    async fn register_normalizes_and_hashes() {
        let store = MemoryStore::default();
        let keys = keys();
        let (user, token) = register(&store, &keys, register_req("  alice ", " Alice@Example.COM "))
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_ne!(user.password_hash, "hunter2hunter2");
        assert_eq!(keys.verify(&token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email_or_username() {
        let store = MemoryStore::default();
        let keys = keys();
        register(&store, &keys, register_req("alice", "alice@example.com"))
            .await
            .unwrap();

        let same_email = register(&store, &keys, register_req("bob", "ALICE@example.com")).await;
        assert!(matches!(same_email, Err(AppError::Conflict(_))));

        let same_name = register(&store, &keys, register_req("alice", "other@example.com")).await;
        assert!(matches!(same_name, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn register_reports_every_invalid_field() {
        let store = MemoryStore::default();
        let req = RegisterRequest {
            username: "a".into(),
            email: "nope".into(),
            password: "short".into(),
        };
        match register(&store, &keys(), req).await {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let store = MemoryStore::default();
        let keys = keys();
        register(&store, &keys, register_req("alice", "alice@example.com"))
            .await
            .unwrap();

        let wrong_password = login(
            &store,
            &keys,
            LoginRequest {
                email: "alice@example.com".into(),
                password: "not-the-password".into(),
            },
        )
        .await
        .unwrap_err();
        let unknown_email = login(
            &store,
            &keys,
            LoginRequest {
                email: "ghost@example.com".into(),
                password: "hunter2hunter2".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(wrong_password, AppError::Unauthorized(_)));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_password() {
        let store = MemoryStore::default();
        let keys = keys();
        let (registered, _) = register(&store, &keys, register_req("alice", "alice@example.com"))
            .await
            .unwrap();
        let (user, token) = login(
            &store,
            &keys,
            LoginRequest {
                email: "Alice@Example.com".into(),
                password: "hunter2hunter2".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(user.id, registered.id);
        assert_eq!(keys.verify(&token).unwrap(), registered.id);
    }
}
