use crate::analytics::{self, Dashboard};
use crate::auth::{AuthService, Session, SignInRequest, SignUpRequest};
use crate::backend::AppState;
use crate::database::models::{
    Budget, Contribution, Goal, NewBudget, NewGoal, NewTransaction, SettingsPatch, Transaction,
    User, UserSettings,
};
use crate::error::{AppError, AppResult};
use crate::store::{Feed, Store};

/// The TUI's handle on the store, bound to whoever is signed in.
#[derive(Clone)]
pub struct Client {
    store: Store,
    auth: AuthService,
    session: Option<Session>,
}

impl Client {
    pub fn new(state: AppState) -> Self {
        Self {
            store: state.store,
            auth: state.auth,
            session: None,
        }
    }

    // ============= Session =============

    pub async fn sign_in(&mut self, email: &str, password: &str) -> AppResult<&User> {
        let session = self
            .auth
            .sign_in(&SignInRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        Ok(&self.session.insert(session).user)
    }

    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        display_name: Option<String>,
    ) -> AppResult<&User> {
        let session = self
            .auth
            .sign_up(&SignUpRequest {
                email: email.to_string(),
                password: password.to_string(),
                display_name,
            })
            .await?;
        Ok(&self.session.insert(session).user)
    }

    pub async fn sign_out(&mut self) -> AppResult<()> {
        if let Some(session) = self.session.take() {
            self.auth.sign_out(&session.token).await?;
        }
        Ok(())
    }

    pub fn user(&self) -> AppResult<&User> {
        self.session.as_ref().map(|s| &s.user).ok_or(AppError::Unauthorized)
    }

    fn uid(&self) -> AppResult<&str> {
        Ok(self.user()?.id.as_str())
    }

    // ============= Transactions =============

    pub async fn subscribe_transactions(&self) -> AppResult<Feed<Vec<Transaction>>> {
        self.store.subscribe_transactions(self.uid()?).await
    }

    pub async fn create_transaction(&self, new: NewTransaction) -> AppResult<Transaction> {
        self.store.add_transaction(self.uid()?, new).await
    }

    pub async fn update_transaction(&self, id: &str, new: NewTransaction) -> AppResult<Transaction> {
        self.store.update_transaction(self.uid()?, id, new).await
    }

    pub async fn delete_transaction(&self, id: &str) -> AppResult<()> {
        self.store.delete_transaction(self.uid()?, id).await
    }

    // ============= Budgets & goals =============

    pub async fn list_budgets(&self) -> AppResult<Vec<Budget>> {
        self.store.list_budgets(self.uid()?).await
    }

    pub async fn create_budget(&self, new: NewBudget) -> AppResult<Budget> {
        self.store.add_budget(self.uid()?, new).await
    }

    pub async fn remove_budget(&self, id: &str) -> AppResult<()> {
        self.store.remove_budget(self.uid()?, id).await
    }

    pub async fn list_goals(&self) -> AppResult<Vec<Goal>> {
        self.store.list_goals(self.uid()?).await
    }

    pub async fn create_goal(&self, new: NewGoal) -> AppResult<Goal> {
        self.store.add_goal(self.uid()?, new).await
    }

    pub async fn contribute(&self, id: &str, contribution: Contribution) -> AppResult<Goal> {
        self.store.contribute(self.uid()?, id, contribution).await
    }

    pub async fn delete_goal(&self, id: &str) -> AppResult<()> {
        self.store.delete_goal(self.uid()?, id).await
    }

    // ============= Settings =============

    pub async fn load_settings(&self) -> AppResult<UserSettings> {
        self.store.load_settings(self.user()?).await
    }

    pub async fn save_settings(&self, settings: UserSettings) -> AppResult<UserSettings> {
        self.store
            .update_settings(self.user()?, SettingsPatch::from(settings))
            .await
    }
}

/// Dashboard figures computed from what the TUI already holds.
pub fn local_dashboard(
    transactions: &[Transaction],
    budgets: &[Budget],
    goals: &[Goal],
    settings: &UserSettings,
) -> AppResult<Dashboard> {
    analytics::dashboard(transactions, budgets, goals, settings, super::util::today())
}
