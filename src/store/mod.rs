//! Per-user data access used by both the HTTP API and the TUI.
//!
//! Every write goes through [`Store`], which validates input, persists it and
//! then pushes a fresh snapshot to any live feed for that user.

pub mod feed;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::{Pool, Sqlite};

use crate::analytics::{self, BudgetProgress, Dashboard, GoalProgress};
use crate::database::db::queries;
use crate::database::models::{
    Budget, Contribution, Goal, NewBudget, NewGoal, NewTransaction, SettingsPatch, Transaction,
    User, UserSettings,
};
use crate::error::AppResult;

pub use self::feed::{Feed, FeedHub};

#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
    transaction_feeds: Arc<FeedHub<Vec<Transaction>>>,
    settings_feeds: Arc<FeedHub<UserSettings>>,
}

impl Store {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            transaction_feeds: Arc::new(FeedHub::default()),
            settings_feeds: Arc::new(FeedHub::default()),
        }
    }

    // ============= Transactions =============

    pub async fn list_transactions(&self, user_id: &str) -> AppResult<Vec<Transaction>> {
        queries::list_transactions(&self.pool, user_id).await
    }

    pub async fn get_transaction(&self, user_id: &str, id: &str) -> AppResult<Transaction> {
        queries::get_transaction(&self.pool, user_id, id).await
    }

    pub async fn add_transaction(&self, user_id: &str, new: NewTransaction) -> AppResult<Transaction> {
        let new = new.normalized()?;
        let tx = queries::create_transaction(&self.pool, user_id, &new).await?;
        tracing::debug!(user_id, transaction_id = %tx.id, kind = %tx.kind, "transaction added");
        self.republish_transactions(user_id).await;
        Ok(tx)
    }

    pub async fn update_transaction(
        &self,
        user_id: &str,
        id: &str,
        new: NewTransaction,
    ) -> AppResult<Transaction> {
        let new = new.normalized()?;
        let tx = queries::update_transaction(&self.pool, user_id, id, &new).await?;
        tracing::debug!(user_id, transaction_id = id, "transaction updated");
        self.republish_transactions(user_id).await;
        Ok(tx)
    }

    pub async fn delete_transaction(&self, user_id: &str, id: &str) -> AppResult<()> {
        queries::delete_transaction(&self.pool, user_id, id).await?;
        tracing::debug!(user_id, transaction_id = id, "transaction deleted");
        self.republish_transactions(user_id).await;
        Ok(())
    }

    /// Live view of the user's transactions, newest first.
    pub async fn subscribe_transactions(&self, user_id: &str) -> AppResult<Feed<Vec<Transaction>>> {
        let feed = self
            .transaction_feeds
            .subscribe(user_id, || self.list_transactions(user_id))
            .await?;
        let open_feeds = self.transaction_feeds.active_feeds().await;
        tracing::debug!(
            user_id,
            open_feeds,
            "transaction feed joined"
        );
        Ok(feed)
    }

    async fn republish_transactions(&self, user_id: &str) {
        let refreshed = self
            .transaction_feeds
            .refresh(user_id, || self.list_transactions(user_id))
            .await;
        if let Err(e) = refreshed {
            tracing::warn!(user_id, error = %e, "could not refresh transaction feed");
        }
    }

    // ============= Budgets =============

    pub async fn list_budgets(&self, user_id: &str) -> AppResult<Vec<Budget>> {
        queries::list_budgets(&self.pool, user_id).await
    }

    pub async fn add_budget(&self, user_id: &str, new: NewBudget) -> AppResult<Budget> {
        let new = new.normalized()?;
        let budget = queries::create_budget(&self.pool, user_id, &new).await?;
        tracing::debug!(user_id, budget_id = %budget.id, category = %budget.category, "budget added");
        Ok(budget)
    }

    pub async fn remove_budget(&self, user_id: &str, id: &str) -> AppResult<()> {
        queries::delete_budget(&self.pool, user_id, id).await?;
        tracing::debug!(user_id, budget_id = id, "budget removed");
        Ok(())
    }

    /// Budgets with their spent amount derived from the current transactions.
    pub async fn budget_progress(&self, user_id: &str) -> AppResult<Vec<BudgetProgress>> {
        let budgets = self.list_budgets(user_id).await?;
        let transactions = self.list_transactions(user_id).await?;
        Ok(budgets
            .iter()
            .map(|b| analytics::budget_progress(b, &transactions))
            .collect())
    }

    // ============= Goals =============

    pub async fn list_goals(&self, user_id: &str) -> AppResult<Vec<Goal>> {
        queries::list_goals(&self.pool, user_id).await
    }

    pub async fn add_goal(&self, user_id: &str, new: NewGoal) -> AppResult<Goal> {
        let new = new.normalized()?;
        let goal = queries::create_goal(&self.pool, user_id, &new).await?;
        tracing::debug!(user_id, goal_id = %goal.id, "goal added");
        Ok(goal)
    }

    pub async fn contribute(&self, user_id: &str, id: &str, contribution: Contribution) -> AppResult<Goal> {
        contribution.validate()?;
        let goal = queries::add_goal_contribution(&self.pool, user_id, id, contribution.amount).await?;
        tracing::debug!(user_id, goal_id = id, saved = %goal.saved, "contribution added");
        Ok(goal)
    }

    pub async fn delete_goal(&self, user_id: &str, id: &str) -> AppResult<()> {
        queries::delete_goal(&self.pool, user_id, id).await?;
        tracing::debug!(user_id, goal_id = id, "goal deleted");
        Ok(())
    }

    pub async fn goal_progress(&self, user_id: &str) -> AppResult<Vec<GoalProgress>> {
        Ok(self
            .list_goals(user_id)
            .await?
            .iter()
            .map(analytics::goal_progress)
            .collect())
    }

    // ============= Settings =============

    /// The stored preferences document, or defaults seeded from the account.
    pub async fn load_settings(&self, user: &User) -> AppResult<UserSettings> {
        Ok(queries::load_settings(&self.pool, &user.id)
            .await?
            .unwrap_or_else(|| UserSettings::initial_for(user)))
    }

    /// Overlays `patch` on the current document and saves the whole thing.
    pub async fn update_settings(&self, user: &User, patch: SettingsPatch) -> AppResult<UserSettings> {
        let mut settings = self.load_settings(user).await?;
        patch.apply(&mut settings);

        let now = Utc::now();
        settings.created_at.get_or_insert(now);
        settings.updated_at = Some(now);

        queries::save_settings(&self.pool, &user.id, &settings).await?;
        tracing::debug!(user_id = %user.id, "settings saved");

        let refreshed = self
            .settings_feeds
            .refresh(&user.id, || self.load_settings(user))
            .await;
        if let Err(e) = refreshed {
            tracing::warn!(user_id = %user.id, error = %e, "could not refresh settings feed");
        }
        Ok(settings)
    }

    pub async fn subscribe_settings(&self, user: &User) -> AppResult<Feed<UserSettings>> {
        self.settings_feeds
            .subscribe(&user.id, || self.load_settings(user))
            .await
    }

    // ============= Overview =============

    pub async fn dashboard(&self, user: &User, today: NaiveDate) -> AppResult<Dashboard> {
        let transactions = self.list_transactions(&user.id).await?;
        let budgets = self.list_budgets(&user.id).await?;
        let goals = self.list_goals(&user.id).await?;
        let settings = self.load_settings(user).await?;
        analytics::dashboard(&transactions, &budgets, &goals, &settings, today)
    }
}
