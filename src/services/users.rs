//! Credential store: registration and login
//!
//! Accounts live in process memory only and are rebuilt from the seed list
//! on every start.

use std::{collections::HashMap, sync::Arc};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tokio::sync::RwLock;

use crate::{
    config::SeedUser,
    error::{AppError, AppResult},
};

#[derive(Clone)]
struct UserRecord {
    password_hash: String,
    role: Option<String>,
}

#[derive(Clone, Default)]
pub struct UsersService {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(record: &UserRecord, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&record.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

impl UsersService {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding the configured seed accounts
    pub fn with_seed(seed: &[SeedUser]) -> AppResult<Self> {
        let mut users = HashMap::with_capacity(seed.len());
        for user in seed {
            if users.contains_key(&user.username) {
                return Err(AppError::Conflict(format!(
                    "seed user {} is listed twice",
                    user.username
                )));
            }
            users.insert(
                user.username.clone(),
                UserRecord {
                    password_hash: hash_password(&user.password)?,
                    role: user.role.clone(),
                },
            );
        }

        tracing::info!("Credential store seeded with {} users", users.len());
        Ok(Self {
            users: Arc::new(RwLock::new(users)),
        })
    }

    /// Register a new account; fails with Conflict if the username is taken
    pub async fn register(&self, username: &str, password: &str, role: &str) -> AppResult<()> {
        let record = UserRecord {
            password_hash: hash_password(password)?,
            role: Some(role.to_string()),
        };

        // Check and insert under one write lock
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(AppError::Conflict("user already exists".to_string()));
        }
        users.insert(username.to_string(), record);
        drop(users);

        tracing::info!("Registered user {} with role {}", username, role);
        Ok(())
    }

    /// Check credentials and return the account's role
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<String> {
        let record = self
            .users
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("unauthorized".to_string()))?;

        if !verify_password(&record, password)? {
            return Err(AppError::Unauthorized("unauthorized".to_string()));
        }

        record
            .role
            .ok_or_else(|| AppError::Unauthorized("role not assigned".to_string()))
    }

    /// Role of `username`, if the account exists and has one
    #[cfg(test)]
    pub async fn role_of(&self, username: &str) -> Option<String> {
        self.users
            .read()
            .await
            .get(username)
            .and_then(|record| record.role.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(username: &str, password: &str, role: Option<&str>) -> SeedUser {
        SeedUser {
            username: username.to_string(),
            password: password.to_string(),
            role: role.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let users = UsersService::new();

        users.register("alice", "pw", "user").await.unwrap();
        let second = users.register("alice", "other", "admin").await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        assert_eq!(users.role_of("alice").await.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let users = UsersService::new();
        users.register("alice", "pw", "admin").await.unwrap();

        assert_eq!(users.authenticate("alice", "pw").await.unwrap(), "admin");
        assert!(matches!(
            users.authenticate("alice", "wrong").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            users.authenticate("bob", "pw").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_passwords_are_not_stored_in_clear() {
        let users = UsersService::new();
        users.register("alice", "hunter2", "user").await.unwrap();

        let stored = users.users.read().await.get("alice").unwrap().password_hash.clone();
        assert_ne!(stored, "hunter2");
        assert!(stored.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_seed_user_without_role_cannot_log_in() {
        let users = UsersService::with_seed(&[
            seed("admin", "admin123", Some("admin")),
            seed("orphan", "pw", None),
        ])
        .unwrap();

        assert_eq!(users.authenticate("admin", "admin123").await.unwrap(), "admin");
        match users.authenticate("orphan", "pw").await {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "role not assigned"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_seed_is_rejected() {
        let result = UsersService::with_seed(&[
            seed("admin", "a", Some("admin")),
            seed("admin", "b", Some("user")),
        ]);
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_has_single_winner() {
        let users = UsersService::new();

        let attempts: Vec<_> = (0..8)
            .map(|i| {
                let users = users.clone();
                tokio::spawn(async move {
                    users.register("racer", &format!("pw{}", i), "user").await
                })
            })
            .collect();

        let mut successes = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
