//! Personal finance tracker.
//!
//! Accounts sign up and sign in, record income and expense transactions, set
//! per-category budgets and savings goals, and keep a preferences document.
//! The same [`store::Store`] backs both the HTTP API in [`backend`] and the
//! terminal UI in [`cli`].

pub mod analytics;
pub mod auth;
pub mod backend;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod store;
pub mod telemetry;

pub use error::{AppError, AppResult};

use sqlx::{Pool, Sqlite};

use crate::auth::AuthService;
use crate::backend::AppState;
use crate::config::Config;
use crate::database::db::{connection, migrate};
use crate::store::Store;

/// Opens the database and applies pending migrations.
pub async fn open_database(config: &Config) -> AppResult<Pool<Sqlite>> {
    let pool = connection::get_db_pool(&config.database_url, config.max_connections).await?;
    migrate::run_migrations(&pool).await?;
    Ok(pool)
}

pub fn app_state(pool: Pool<Sqlite>, config: &Config) -> AppState {
    AppState {
        store: Store::new(pool.clone()),
        auth: AuthService::new(pool, config.session_ttl()),
    }
}
