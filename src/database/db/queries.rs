use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::database::models::{
    Budget, Goal, NewBudget, NewGoal, NewTransaction, Transaction, TransactionKind, User,
    UserCredentials, UserSettings,
};
use crate::error::{AppError, AppResult};

/*
SQL for every per-user collection. Each query is scoped by user_id, so a
record owned by someone else behaves exactly like a missing one.
Amounts are TEXT (parsed into Decimal), dates are YYYY-MM-DD and
timestamps are fixed-width RFC 3339 so they sort as text.
 */

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn decimal_col(row: &SqliteRow, col: &str) -> AppResult<Decimal> {
    let text: String = row.try_get(col)?;
    Decimal::from_str(&text).map_err(|e| {
        AppError::Database(sqlx::Error::Decode(
            format!("invalid decimal in {col}: {e}").into(),
        ))
    })
}

fn timestamp_col(row: &SqliteRow, col: &str) -> AppResult<DateTime<Utc>> {
    let text: String = row.try_get(col)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            AppError::Database(sqlx::Error::Decode(
                format!("invalid timestamp in {col}: {e}").into(),
            ))
        })
}

fn date_col(row: &SqliteRow, col: &str) -> AppResult<NaiveDate> {
    let text: String = row.try_get(col)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
        AppError::Database(sqlx::Error::Decode(format!("invalid date in {col}: {e}").into()))
    })
}

/* ==========User Queries=========== */

fn user_from_row(row: &SqliteRow) -> AppResult<User> {
    Ok(User {
        id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        created_at: timestamp_col(row, "user_created_at")?,
    })
}

// `email` must already be normalized
pub async fn create_user(
    pool: &Pool<Sqlite>,
    email: &str,
    display_name: Option<&str>,
    password_hash: &str,
) -> AppResult<User> {
    let user = User {
        id: new_id(),
        email: email.to_string(),
        display_name: display_name.map(str::to_string),
        created_at: Utc::now(),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (user_id, email, display_name, password_hash, user_created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(user.display_name.as_deref())
    .bind(password_hash)
    .bind(timestamp(user.created_at))
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(user),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(AppError::Conflict("email already in use".into()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_user_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> AppResult<Option<UserCredentials>> {
    let row = sqlx::query(
        r#"
        SELECT user_id, email, display_name, password_hash, user_created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.map(|r| {
        Ok(UserCredentials {
            user: user_from_row(&r)?,
            password_hash: r.try_get("password_hash")?,
        })
    })
    .transpose()
}

pub async fn find_user_by_id(pool: &Pool<Sqlite>, user_id: &str) -> AppResult<Option<User>> {
    sqlx::query(
        r#"
        SELECT user_id, email, display_name, user_created_at
        FROM users
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .map(|r| user_from_row(&r))
    .transpose()
}

/* ==========Session Queries=========== */

pub async fn insert_session(
    pool: &Pool<Sqlite>,
    session_hash: &[u8],
    user_id: &str,
    expires_at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (session_hash, user_id, session_created_at, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(session_hash)
    .bind(user_id)
    .bind(timestamp(Utc::now()))
    .bind(timestamp(expires_at))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_session_user(
    pool: &Pool<Sqlite>,
    session_hash: &[u8],
    now: DateTime<Utc>,
) -> AppResult<Option<User>> {
    sqlx::query(
        r#"
        SELECT u.user_id, u.email, u.display_name, u.user_created_at
        FROM sessions s
        JOIN users u ON u.user_id = s.user_id
        WHERE s.session_hash = ?
          AND s.expires_at > ?
        "#,
    )
    .bind(session_hash)
    .bind(timestamp(now))
    .fetch_optional(pool)
    .await?
    .map(|r| user_from_row(&r))
    .transpose()
}

pub async fn delete_session(pool: &Pool<Sqlite>, session_hash: &[u8]) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE session_hash = ?")
        .bind(session_hash)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_expired_sessions(pool: &Pool<Sqlite>, now: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(timestamp(now))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/* ==========Transaction Queries=========== */

fn transaction_from_row(row: &SqliteRow) -> AppResult<Transaction> {
    let kind: String = row.try_get("kind")?;
    Ok(Transaction {
        id: row.try_get("transaction_id")?,
        date: date_col(row, "transacted_on")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        kind: TransactionKind::from_str(&kind)?,
        amount: decimal_col(row, "amount")?,
        created_at: timestamp_col(row, "trans_create_at")?,
    })
}

pub async fn create_transaction(
    pool: &Pool<Sqlite>,
    user_id: &str,
    new: &NewTransaction,
) -> AppResult<Transaction> {
    let tx = Transaction {
        id: new_id(),
        date: new.date,
        description: new.description.clone(),
        category: new.category.clone(),
        kind: new.kind,
        amount: new.amount,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO transactions (
            transaction_id, user_id, transacted_on, description,
            category, kind, amount, trans_create_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&tx.id)
    .bind(user_id)
    .bind(tx.date.format("%Y-%m-%d").to_string())
    .bind(&tx.description)
    .bind(&tx.category)
    .bind(tx.kind.as_str())
    .bind(tx.amount.to_string())
    .bind(timestamp(tx.created_at))
    .execute(pool)
    .await?;

    Ok(tx)
}

// Newest first, by creation time
pub async fn list_transactions(pool: &Pool<Sqlite>, user_id: &str) -> AppResult<Vec<Transaction>> {
    sqlx::query(
        r#"
        SELECT transaction_id, transacted_on, description, category, kind, amount, trans_create_at
        FROM transactions
        WHERE user_id = ?
        ORDER BY trans_create_at DESC, rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(transaction_from_row)
    .collect()
}

pub async fn get_transaction(
    pool: &Pool<Sqlite>,
    user_id: &str,
    transaction_id: &str,
) -> AppResult<Transaction> {
    let row = sqlx::query(
        r#"
        SELECT transaction_id, transacted_on, description, category, kind, amount, trans_create_at
        FROM transactions
        WHERE user_id = ? AND transaction_id = ?
        "#,
    )
    .bind(user_id)
    .bind(transaction_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("transaction"))?;

    transaction_from_row(&row)
}

// Replaces every editable field; creation time is kept
pub async fn update_transaction(
    pool: &Pool<Sqlite>,
    user_id: &str,
    transaction_id: &str,
    new: &NewTransaction,
) -> AppResult<Transaction> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET transacted_on = ?, description = ?, category = ?, kind = ?, amount = ?
        WHERE user_id = ? AND transaction_id = ?
        "#,
    )
    .bind(new.date.format("%Y-%m-%d").to_string())
    .bind(&new.description)
    .bind(&new.category)
    .bind(new.kind.as_str())
    .bind(new.amount.to_string())
    .bind(user_id)
    .bind(transaction_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("transaction"));
    }
    get_transaction(pool, user_id, transaction_id).await
}

pub async fn delete_transaction(
    pool: &Pool<Sqlite>,
    user_id: &str,
    transaction_id: &str,
) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM transactions WHERE user_id = ? AND transaction_id = ?")
        .bind(user_id)
        .bind(transaction_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("transaction"));
    }
    Ok(())
}

/* ==========Budget Queries=========== */

fn budget_from_row(row: &SqliteRow) -> AppResult<Budget> {
    Ok(Budget {
        id: row.try_get("budget_id")?,
        category: row.try_get("category")?,
        limit: decimal_col(row, "limit_amount")?,
        created_at: timestamp_col(row, "budget_created_at")?,
    })
}

pub async fn create_budget(pool: &Pool<Sqlite>, user_id: &str, new: &NewBudget) -> AppResult<Budget> {
    let budget = Budget {
        id: new_id(),
        category: new.category.clone(),
        limit: new.limit,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO budgets (budget_id, user_id, category, limit_amount, budget_created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&budget.id)
    .bind(user_id)
    .bind(&budget.category)
    .bind(budget.limit.to_string())
    .bind(timestamp(budget.created_at))
    .execute(pool)
    .await?;

    Ok(budget)
}

// In the order they were added
pub async fn list_budgets(pool: &Pool<Sqlite>, user_id: &str) -> AppResult<Vec<Budget>> {
    sqlx::query(
        r#"
        SELECT budget_id, category, limit_amount, budget_created_at
        FROM budgets
        WHERE user_id = ?
        ORDER BY budget_created_at ASC, rowid ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(budget_from_row)
    .collect()
}

pub async fn delete_budget(pool: &Pool<Sqlite>, user_id: &str, budget_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM budgets WHERE user_id = ? AND budget_id = ?")
        .bind(user_id)
        .bind(budget_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("budget"));
    }
    Ok(())
}

/* ==========Goal Queries=========== */

fn goal_from_row(row: &SqliteRow) -> AppResult<Goal> {
    Ok(Goal {
        id: row.try_get("goal_id")?,
        title: row.try_get("title")?,
        target: decimal_col(row, "target_amount")?,
        saved: decimal_col(row, "saved_amount")?,
        created_at: timestamp_col(row, "goal_created_at")?,
    })
}

pub async fn create_goal(pool: &Pool<Sqlite>, user_id: &str, new: &NewGoal) -> AppResult<Goal> {
    let goal = Goal {
        id: new_id(),
        title: new.title.clone(),
        target: new.target,
        saved: Decimal::ZERO,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO goals (goal_id, user_id, title, target_amount, saved_amount, goal_created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&goal.id)
    .bind(user_id)
    .bind(&goal.title)
    .bind(goal.target.to_string())
    .bind(goal.saved.to_string())
    .bind(timestamp(goal.created_at))
    .execute(pool)
    .await?;

    Ok(goal)
}

// Newest first
pub async fn list_goals(pool: &Pool<Sqlite>, user_id: &str) -> AppResult<Vec<Goal>> {
    sqlx::query(
        r#"
        SELECT goal_id, title, target_amount, saved_amount, goal_created_at
        FROM goals
        WHERE user_id = ?
        ORDER BY goal_created_at DESC, rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(goal_from_row)
    .collect()
}

pub async fn get_goal(pool: &Pool<Sqlite>, user_id: &str, goal_id: &str) -> AppResult<Goal> {
    let row = sqlx::query(
        r#"
        SELECT goal_id, title, target_amount, saved_amount, goal_created_at
        FROM goals
        WHERE user_id = ? AND goal_id = ?
        "#,
    )
    .bind(user_id)
    .bind(goal_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("goal"))?;

    goal_from_row(&row)
}

/* The no-op UPDATE takes SQLite's write lock before the read, so a second
contribution waits for this one to commit instead of reading the same saved
amount and failing with SQLITE_BUSY on its own write. */
pub async fn add_goal_contribution(
    pool: &Pool<Sqlite>,
    user_id: &str,
    goal_id: &str,
    amount: Decimal,
) -> AppResult<Goal> {
    let mut tx = pool.begin().await?;

    let locked = sqlx::query(
        "UPDATE goals SET saved_amount = saved_amount WHERE user_id = ? AND goal_id = ?",
    )
    .bind(user_id)
    .bind(goal_id)
    .execute(&mut *tx)
    .await?;
    if locked.rows_affected() == 0 {
        return Err(AppError::NotFound("goal"));
    }

    let row = sqlx::query(
        r#"
        SELECT goal_id, title, target_amount, saved_amount, goal_created_at
        FROM goals
        WHERE user_id = ? AND goal_id = ?
        "#,
    )
    .bind(user_id)
    .bind(goal_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("goal"))?;

    let mut goal = goal_from_row(&row)?;
    goal.saved = goal.saved_after(amount);

    sqlx::query("UPDATE goals SET saved_amount = ? WHERE user_id = ? AND goal_id = ?")
        .bind(goal.saved.to_string())
        .bind(user_id)
        .bind(goal_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(goal)
}

pub async fn delete_goal(pool: &Pool<Sqlite>, user_id: &str, goal_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM goals WHERE user_id = ? AND goal_id = ?")
        .bind(user_id)
        .bind(goal_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("goal"));
    }
    Ok(())
}

/* ==========Settings Queries=========== */

pub async fn load_settings(pool: &Pool<Sqlite>, user_id: &str) -> AppResult<Option<UserSettings>> {
    let document: Option<String> =
        sqlx::query_scalar("SELECT document FROM user_settings WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    document
        .map(|doc| serde_json::from_str(&doc).map_err(AppError::from))
        .transpose()
}

// Whole-document upsert
pub async fn save_settings(
    pool: &Pool<Sqlite>,
    user_id: &str,
    settings: &UserSettings,
) -> AppResult<()> {
    let document = serde_json::to_string(settings)?;
    let updated_at = settings.updated_at.unwrap_or_else(Utc::now);

    sqlx::query(
        r#"
        INSERT INTO user_settings (user_id, document, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            document = excluded.document,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(document)
    .bind(timestamp(updated_at))
    .execute(pool)
    .await?;

    Ok(())
}
