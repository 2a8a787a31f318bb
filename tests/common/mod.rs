#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use finance_tracker::auth::{Session, SignUpRequest};
use finance_tracker::backend::AppState;
use finance_tracker::config::Config;
use finance_tracker::database::models::{NewTransaction, TransactionKind};
use finance_tracker::{app_state, open_database};
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn memory_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        bind: ([127, 0, 0, 1], 0).into(),
        session_ttl_hours: 1,
        max_connections: 1,
    }
}

/// Fresh migrated in-memory database wrapped in the full application state.
pub async fn memory_state() -> Result<AppState> {
    let config = memory_config();
    let pool = open_database(&config).await?;
    Ok(app_state(pool, &config))
}

/// Migrated on-disk database with a multi-connection pool, for tests that
/// need real concurrent writers. The file lives in the temp directory.
pub async fn file_state() -> Result<(AppState, PathBuf)> {
    let path = std::env::temp_dir().join(format!("finance-tracker-{}.db", Uuid::new_v4()));
    let config = Config {
        database_url: format!("sqlite://{}", path.display()),
        max_connections: 4,
        ..memory_config()
    };
    let pool = open_database(&config).await?;
    Ok((app_state(pool, &config), path))
}

pub fn remove_database(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

pub async fn sign_up(state: &AppState, email: &str) -> Result<Session> {
    Ok(state
        .auth
        .sign_up(&SignUpRequest {
            email: email.into(),
            password: "hunter22".into(),
            display_name: Some("Ada".into()),
        })
        .await?)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn expense(date: NaiveDate, description: &str, category: &str, amount: Decimal) -> NewTransaction {
    NewTransaction {
        date,
        description: description.into(),
        category: category.into(),
        kind: TransactionKind::Expense,
        amount,
    }
}

pub fn income(date: NaiveDate, description: &str, amount: Decimal) -> NewTransaction {
    NewTransaction {
        date,
        description: description.into(),
        category: "Salary".into(),
        kind: TransactionKind::Income,
        amount,
    }
}
