//! Business logic services

pub mod catalog;
pub mod tokens;
pub mod users;

use std::time::Duration;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub tokens: tokens::TokenService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            catalog: catalog::CatalogService::new(
                repository,
                Duration::from_millis(config.catalog.query_timeout_ms),
            ),
            tokens: tokens::TokenService::new(&config.auth),
            users: users::UsersService::with_seed(&config.users.seed)?,
        })
    }
}
