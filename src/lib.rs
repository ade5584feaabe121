pub mod auth;
pub mod config;
pub mod csrf;
pub mod db;
pub mod error;
pub mod flash;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod route;
pub mod schema;
pub mod session;
pub mod templates;

use sqlx::SqlitePool;

use crate::{auth::PasswordHasher, config::Config, csrf::CsrfKey, session::SessionKeys};

// Struct representing the application state
pub struct AppState {
    pub db: SqlitePool,
    pub sessions: SessionKeys,
    pub hasher: PasswordHasher,
    pub csrf: CsrfKey,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &Config) -> Self {
        Self {
            db,
            sessions: SessionKeys::new(&config.secret_key, config.session_ttl_hours),
            hasher: PasswordHasher::new(config.password_iterations),
            csrf: CsrfKey::new(&config.secret_key),
        }
    }
}
