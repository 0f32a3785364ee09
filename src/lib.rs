//! Bookshelf catalog server
//!
//! REST JSON API over a book catalog, with token authentication and an
//! admin role guarding writes.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::Repository;
use services::Services;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
}

impl AppState {
    /// Wire the services over `repository` and freeze the configuration
    pub fn new(config: AppConfig, repository: Repository) -> AppResult<Self> {
        let services = Services::new(repository, &config)?;
        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
        })
    }
}
