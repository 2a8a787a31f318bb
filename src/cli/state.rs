// src/cli/state.rs
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::{ListState, TableState};

use crate::cli::api::Client;
use crate::cli::input::LineEdit;
use crate::cli::util::{iso, parse_date_any, parse_money, today};
use crate::database::models::settings::{CURRENCIES, LANGUAGES, TIMEZONES};
use crate::database::models::{
    Budget, Contribution, Goal, NewBudget, NewGoal, NewTransaction, Transaction, TransactionKind,
    UserSettings,
};
use crate::store::Feed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Transactions,
    Budget,
    Goals,
    Settings,
    Help,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Dashboard,
        Tab::Transactions,
        Tab::Budget,
        Tab::Goals,
        Tab::Settings,
        Tab::Help,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Transactions => "Transactions",
            Tab::Budget => "Budget",
            Tab::Goals => "Goals",
            Tab::Settings => "Settings",
            Tab::Help => "Help",
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    fn step(&self, delta: isize) -> Tab {
        let n = Self::ALL.len() as isize;
        Self::ALL[(self.index() as isize + delta).rem_euclid(n) as usize]
    }
}

// ============= Login =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
    Name,
}

#[derive(Default)]
pub struct LoginForm {
    pub email: LineEdit,
    pub password: LineEdit,
    pub name: LineEdit,
    pub focus: Option<LoginField>,
    pub signing_up: bool,
    pub error: Option<String>,
}

impl LoginForm {
    fn new() -> Self {
        Self {
            password: LineEdit::masked(),
            focus: Some(LoginField::Email),
            ..Self::default()
        }
    }

    pub fn fields(&self) -> &'static [LoginField] {
        if self.signing_up {
            &[LoginField::Email, LoginField::Password, LoginField::Name]
        } else {
            &[LoginField::Email, LoginField::Password]
        }
    }

    fn cycle(&mut self, delta: isize) {
        let fields = self.fields();
        let cur = self
            .focus
            .and_then(|f| fields.iter().position(|x| *x == f))
            .unwrap_or(0) as isize;
        let next = (cur + delta).rem_euclid(fields.len() as isize) as usize;
        self.focus = Some(fields[next]);
    }

    fn focused(&mut self) -> &mut LineEdit {
        match self.focus.unwrap_or(LoginField::Email) {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
            LoginField::Name => &mut self.name,
        }
    }
}

// ============= Transactions =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnField {
    Date,
    Description,
    Category,
    Kind,
    Amount,
}

impl TxnField {
    pub const ORDER: [TxnField; 5] = [
        TxnField::Date,
        TxnField::Description,
        TxnField::Category,
        TxnField::Kind,
        TxnField::Amount,
    ];

    fn step(self, delta: isize) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0) as isize;
        Self::ORDER[(i + delta).rem_euclid(Self::ORDER.len() as isize) as usize]
    }
}

#[derive(Clone)]
pub struct TxnForm {
    pub editing_id: Option<String>,
    pub date: LineEdit,
    pub description: LineEdit,
    pub category: LineEdit,
    pub kind: TransactionKind,
    pub amount: LineEdit,
    pub focus: TxnField,
    pub error: Option<String>,
}

impl TxnForm {
    fn blank() -> Self {
        Self {
            editing_id: None,
            date: LineEdit::with(iso(&today())),
            description: LineEdit::default(),
            category: LineEdit::default(),
            kind: TransactionKind::Expense,
            amount: LineEdit::default(),
            focus: TxnField::Date,
            error: None,
        }
    }

    fn from_transaction(tx: &Transaction) -> Self {
        Self {
            editing_id: Some(tx.id.clone()),
            date: LineEdit::with(iso(&tx.date)),
            description: LineEdit::with(tx.description.clone()),
            category: LineEdit::with(tx.category.clone()),
            kind: tx.kind,
            amount: LineEdit::with(tx.amount.to_string()),
            focus: TxnField::Description,
            error: None,
        }
    }

    fn field_mut(&mut self, field: TxnField) -> Option<&mut LineEdit> {
        match field {
            TxnField::Date => Some(&mut self.date),
            TxnField::Description => Some(&mut self.description),
            TxnField::Category => Some(&mut self.category),
            TxnField::Amount => Some(&mut self.amount),
            TxnField::Kind => None,
        }
    }

    /// All fields are required, as in the web form.
    pub fn to_request(&self) -> Result<NewTransaction, String> {
        let date = parse_date_any(&self.date.value).ok_or("Date format: YYYY-MM-DD")?;
        if self.description.trimmed().is_empty() {
            return Err("Description is required".into());
        }
        if self.category.trimmed().is_empty() {
            return Err("Category is required".into());
        }
        if self.amount.trimmed().is_empty() {
            return Err("Amount cannot be empty".into());
        }
        let amount = parse_money(&self.amount.value).ok_or("Invalid amount format")?;
        Ok(NewTransaction {
            date,
            description: self.description.trimmed().to_string(),
            category: self.category.trimmed().to_string(),
            kind: self.kind,
            amount,
        })
    }
}

#[derive(Default)]
pub struct TxnPage {
    pub list: Vec<Transaction>,
    pub tsel: TableState,
    pub form: Option<TxnForm>,
}

// ============= Budget & goals =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetField {
    Category,
    Limit,
}

#[derive(Default)]
pub struct BudgetPage {
    pub list: Vec<Budget>,
    pub sel: ListState,
    pub category: LineEdit,
    pub limit: LineEdit,
    pub editing: Option<BudgetField>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalField {
    Title,
    Target,
    Contribution,
}

#[derive(Default)]
pub struct GoalsPage {
    pub list: Vec<Goal>,
    pub sel: ListState,
    pub title: LineEdit,
    pub target: LineEdit,
    pub contribution: LineEdit,
    pub editing: Option<GoalField>,
    pub error: Option<String>,
}

// ============= Settings =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Name,
    Email,
    Phone,
    Currency,
    Timezone,
    Language,
    EmailNotifications,
    PushNotifications,
    BudgetAlerts,
    MonthlyReports,
    ProfileVisible,
    DataSharing,
    MonthlyLimit,
    DailyLimit,
}

impl SettingsField {
    pub const ALL: [SettingsField; 14] = [
        SettingsField::Name,
        SettingsField::Email,
        SettingsField::Phone,
        SettingsField::Currency,
        SettingsField::Timezone,
        SettingsField::Language,
        SettingsField::EmailNotifications,
        SettingsField::PushNotifications,
        SettingsField::BudgetAlerts,
        SettingsField::MonthlyReports,
        SettingsField::ProfileVisible,
        SettingsField::DataSharing,
        SettingsField::MonthlyLimit,
        SettingsField::DailyLimit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Currency => "Currency",
            Self::Timezone => "Timezone",
            Self::Language => "Language",
            Self::EmailNotifications => "Email notifications",
            Self::PushNotifications => "Push notifications",
            Self::BudgetAlerts => "Budget alerts",
            Self::MonthlyReports => "Monthly reports",
            Self::ProfileVisible => "Profile visible",
            Self::DataSharing => "Data sharing",
            Self::MonthlyLimit => "Monthly limit",
            Self::DailyLimit => "Daily limit",
        }
    }

    pub fn value(&self, s: &UserSettings) -> String {
        let flag = |b: bool| if b { "on" } else { "off" }.to_string();
        match self {
            Self::Name => s.name.clone(),
            Self::Email => s.email.clone(),
            Self::Phone => s.phone.clone(),
            Self::Currency => format!("{} ({})", s.currency, s.currency_symbol()),
            Self::Timezone => s.timezone.clone(),
            Self::Language => s.language.clone(),
            Self::EmailNotifications => flag(s.notifications.email),
            Self::PushNotifications => flag(s.notifications.push),
            Self::BudgetAlerts => flag(s.notifications.budget_alerts),
            Self::MonthlyReports => flag(s.notifications.monthly_reports),
            Self::ProfileVisible => flag(s.privacy.profile_visible),
            Self::DataSharing => flag(s.privacy.data_sharing),
            Self::MonthlyLimit => s.budget_limits.monthly.to_string(),
            Self::DailyLimit => s.budget_limits.daily.to_string(),
        }
    }

    fn is_text(&self) -> bool {
        matches!(
            self,
            Self::Name | Self::Email | Self::Phone | Self::MonthlyLimit | Self::DailyLimit
        )
    }
}

fn cycle_choice(options: &[&str], current: &str, delta: isize) -> String {
    let cur = options.iter().position(|o| *o == current).unwrap_or(0) as isize;
    options[(cur + delta).rem_euclid(options.len() as isize) as usize].to_string()
}

#[derive(Default)]
pub struct SettingsPage {
    pub draft: UserSettings,
    pub sel: ListState,
    pub editing: Option<LineEdit>,
    pub dirty: bool,
    pub error: Option<String>,
}

impl SettingsPage {
    pub fn current_field(&self) -> SettingsField {
        SettingsField::ALL[self.sel.selected().unwrap_or(0).min(SettingsField::ALL.len() - 1)]
    }

    fn adjust(&mut self, field: SettingsField, delta: isize) {
        let s = &mut self.draft;
        match field {
            SettingsField::Currency => s.currency = cycle_choice(&CURRENCIES, &s.currency, delta),
            SettingsField::Timezone => s.timezone = cycle_choice(&TIMEZONES, &s.timezone, delta),
            SettingsField::Language => s.language = cycle_choice(&LANGUAGES, &s.language, delta),
            SettingsField::EmailNotifications => s.notifications.email ^= true,
            SettingsField::PushNotifications => s.notifications.push ^= true,
            SettingsField::BudgetAlerts => s.notifications.budget_alerts ^= true,
            SettingsField::MonthlyReports => s.notifications.monthly_reports ^= true,
            SettingsField::ProfileVisible => s.privacy.profile_visible ^= true,
            SettingsField::DataSharing => s.privacy.data_sharing ^= true,
            _ => return,
        }
        self.dirty = true;
    }

    fn commit_text(&mut self, field: SettingsField, text: &str) -> Result<(), String> {
        let s = &mut self.draft;
        match field {
            SettingsField::Name => s.name = text.trim().to_string(),
            SettingsField::Email => s.email = text.trim().to_string(),
            SettingsField::Phone => s.phone = text.trim().to_string(),
            SettingsField::MonthlyLimit | SettingsField::DailyLimit => {
                let limit = parse_money(text)
                    .filter(|d| !d.is_sign_negative())
                    .ok_or("Limit must be a non-negative number")?;
                if field == SettingsField::MonthlyLimit {
                    s.budget_limits.monthly = limit;
                } else {
                    s.budget_limits.daily = limit;
                }
            }
            _ => {}
        }
        self.dirty = true;
        Ok(())
    }
}

// ============= App =============

pub struct App {
    pub api: Client,
    pub screen: Screen,
    pub tab: Tab,
    pub status: String,
    pub quit: bool,
    pub login: LoginForm,
    pub feed: Option<Feed<Vec<Transaction>>>,
    pub txn: TxnPage,
    pub budget: BudgetPage,
    pub goals: GoalsPage,
    pub settings: SettingsPage,
}

fn move_sel(len: usize, current: Option<usize>, delta: isize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let cur = current.unwrap_or(0) as isize;
    Some((cur + delta).rem_euclid(len as isize) as usize)
}

fn clamp_sel(len: usize, current: Option<usize>) -> Option<usize> {
    match (len, current) {
        (0, _) => None,
        (n, Some(i)) if i >= n => Some(n - 1),
        (_, None) => Some(0),
        (_, x) => x,
    }
}

impl App {
    pub fn new(api: Client) -> Self {
        Self {
            api,
            screen: Screen::Login,
            tab: Tab::Dashboard,
            status: "Sign in to continue | F2 switch to sign up | Esc quit".into(),
            quit: false,
            login: LoginForm::new(),
            feed: None,
            txn: TxnPage::default(),
            budget: BudgetPage::default(),
            goals: GoalsPage::default(),
            settings: SettingsPage::default(),
        }
    }

    /// Applies the newest transaction snapshot if one arrived. The local
    /// list is replaced wholesale.
    pub fn sync_feed(&mut self) {
        let Some(feed) = self.feed.as_mut() else { return };
        match feed.has_changed() {
            Ok(true) => {
                let snapshot = feed.borrow_and_update().clone();
                self.txn.list = snapshot.as_ref().clone();
                let sel = clamp_sel(self.txn.list.len(), self.txn.tsel.selected());
                self.txn.tsel.select(sel);
            }
            Ok(false) => {}
            Err(_) => {
                self.feed = None;
                self.status = "Transaction feed closed".into();
            }
        }
    }

    async fn enter_main(&mut self) -> anyhow::Result<()> {
        let mut feed = self.api.subscribe_transactions().await?;
        self.txn.list = feed.borrow_and_update().as_ref().clone();
        self.feed = Some(feed);
        self.refresh_budgets().await?;
        self.refresh_goals().await?;
        self.settings.draft = self.api.load_settings().await?;
        self.settings.sel.select(Some(0));
        self.settings.dirty = false;

        self.screen = Screen::Main;
        self.tab = Tab::Dashboard;
        let who = self.api.user().map(|u| u.email.clone()).unwrap_or_default();
        self.status = format!("Signed in as {who} | ? help | o sign out | q quit");
        Ok(())
    }

    async fn sign_out(&mut self) {
        if let Err(e) = self.api.sign_out().await {
            tracing::warn!(error = %e, "sign out failed");
        }
        self.feed = None;
        self.txn = TxnPage::default();
        self.budget = BudgetPage::default();
        self.goals = GoalsPage::default();
        self.settings = SettingsPage::default();
        self.login = LoginForm::new();
        self.screen = Screen::Login;
        self.status = "Signed out".into();
    }

    pub async fn refresh_budgets(&mut self) -> anyhow::Result<()> {
        self.budget.list = self.api.list_budgets().await?;
        let sel = clamp_sel(self.budget.list.len(), self.budget.sel.selected());
        self.budget.sel.select(sel);
        Ok(())
    }

    pub async fn refresh_goals(&mut self) -> anyhow::Result<()> {
        self.goals.list = self.api.list_goals().await?;
        let sel = clamp_sel(self.goals.list.len(), self.goals.sel.selected());
        self.goals.sel.select(sel);
        Ok(())
    }

    pub fn current_txn(&self) -> Option<&Transaction> {
        self.txn.list.get(self.txn.tsel.selected()?)
    }

    fn is_editing(&self) -> bool {
        self.txn.form.is_some()
            || self.budget.editing.is_some()
            || self.goals.editing.is_some()
            || self.settings.editing.is_some()
    }

    pub async fn handle_key(&mut self, k: KeyEvent) -> anyhow::Result<()> {
        if k.kind != KeyEventKind::Press {
            return Ok(());
        }
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            self.quit = true;
            return Ok(());
        }

        if self.screen == Screen::Login {
            return self.handle_login_key(k).await;
        }

        if self.is_editing() {
            match self.tab {
                Tab::Transactions => self.handle_txn_form(k).await,
                Tab::Budget => self.handle_budget_input(k).await,
                Tab::Goals => self.handle_goal_input(k).await,
                Tab::Settings => self.handle_settings_input(k),
                _ => {}
            }
            return Ok(());
        }

        match k.code {
            KeyCode::Char('q') => {
                self.quit = true;
                return Ok(());
            }
            KeyCode::Tab => {
                self.tab = self.tab.step(1);
                return Ok(());
            }
            KeyCode::BackTab => {
                self.tab = self.tab.step(-1);
                return Ok(());
            }
            KeyCode::Char(c @ '1'..='6') => {
                self.tab = Tab::ALL[(c as u8 - b'1') as usize];
                return Ok(());
            }
            KeyCode::Char('?') => {
                self.tab = Tab::Help;
                return Ok(());
            }
            KeyCode::Char('o') => {
                self.sign_out().await;
                return Ok(());
            }
            _ => {}
        }

        match self.tab {
            Tab::Dashboard => {
                if k.code == KeyCode::Char('r') {
                    self.refresh_budgets().await?;
                    self.refresh_goals().await?;
                    self.status = "Refreshed".into();
                }
            }
            Tab::Transactions => self.handle_txn_key(k).await,
            Tab::Budget => self.handle_budget_key(k).await,
            Tab::Goals => self.handle_goal_key(k).await,
            Tab::Settings => self.handle_settings_key(k).await,
            Tab::Help => {
                if matches!(k.code, KeyCode::Esc | KeyCode::Char('b')) {
                    self.tab = Tab::Dashboard;
                }
            }
        }
        Ok(())
    }

    async fn handle_login_key(&mut self, k: KeyEvent) -> anyhow::Result<()> {
        match k.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::F(2) => {
                self.login.signing_up = !self.login.signing_up;
                self.login.error = None;
                self.login.focus = Some(LoginField::Email);
            }
            KeyCode::Tab | KeyCode::Down => self.login.cycle(1),
            KeyCode::BackTab | KeyCode::Up => self.login.cycle(-1),
            KeyCode::Enter => self.submit_login().await?,
            code => {
                self.login.focused().handle(code);
            }
        }
        Ok(())
    }

    async fn submit_login(&mut self) -> anyhow::Result<()> {
        let email = self.login.email.trimmed().to_string();
        let password = self.login.password.value.clone();
        if email.is_empty() || password.is_empty() {
            self.login.error = Some("Email and password are required".into());
            return Ok(());
        }

        let result = if self.login.signing_up {
            let name = Some(self.login.name.trimmed().to_string()).filter(|n| !n.is_empty());
            self.api.sign_up(&email, &password, name).await.map(|_| ())
        } else {
            self.api.sign_in(&email, &password).await.map(|_| ())
        };

        match result {
            Ok(()) => {
                self.login.error = None;
                self.enter_main().await?;
            }
            Err(e) => self.login.error = Some(e.to_string()),
        }
        Ok(())
    }

    // ---------- transactions ----------

    async fn handle_txn_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Up => {
                let sel = move_sel(self.txn.list.len(), self.txn.tsel.selected(), -1);
                self.txn.tsel.select(sel);
            }
            KeyCode::Down => {
                let sel = move_sel(self.txn.list.len(), self.txn.tsel.selected(), 1);
                self.txn.tsel.select(sel);
            }
            KeyCode::Char('a') => self.txn.form = Some(TxnForm::blank()),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(tx) = self.current_txn() {
                    self.txn.form = Some(TxnForm::from_transaction(tx));
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                let Some(id) = self.current_txn().map(|t| t.id.clone()) else { return };
                match self.api.delete_transaction(&id).await {
                    Ok(()) => self.status = "Deleted.".into(),
                    Err(e) => self.status = format!("Delete failed: {e}"),
                }
            }
            _ => {}
        }
    }

    async fn handle_txn_form(&mut self, k: KeyEvent) {
        let Some(form) = self.txn.form.as_mut() else { return };
        match k.code {
            KeyCode::Esc => {
                self.txn.form = None;
                return;
            }
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.step(1),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.step(-1),
            KeyCode::Enter => {}
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if form.focus == TxnField::Kind => {
                form.kind = form.kind.toggle();
            }
            code => {
                let focus = form.focus;
                if let Some(field) = form.field_mut(focus) {
                    field.handle(code);
                }
            }
        }
        if k.code == KeyCode::Enter {
            self.submit_txn().await;
        }
    }

    pub async fn submit_txn(&mut self) {
        let Some(form) = self.txn.form.as_mut() else { return };
        let req = match form.to_request() {
            Ok(req) => req,
            Err(msg) => {
                form.error = Some(msg);
                return;
            }
        };

        let result = match form.editing_id.clone() {
            Some(id) => self.api.update_transaction(&id, req).await,
            None => self.api.create_transaction(req).await,
        };

        match result {
            Ok(tx) => {
                self.status = format!("Saved {} ✓", tx.description);
                self.txn.form = None;
            }
            Err(e) => {
                if let Some(form) = self.txn.form.as_mut() {
                    form.error = Some(format!("Save failed: {e}"));
                }
            }
        }
    }

    // ---------- budget ----------

    async fn handle_budget_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Up => {
                let sel = move_sel(self.budget.list.len(), self.budget.sel.selected(), -1);
                self.budget.sel.select(sel);
            }
            KeyCode::Down => {
                let sel = move_sel(self.budget.list.len(), self.budget.sel.selected(), 1);
                self.budget.sel.select(sel);
            }
            KeyCode::Char('a') => {
                self.budget.category.clear();
                self.budget.limit.clear();
                self.budget.error = None;
                self.budget.editing = Some(BudgetField::Category);
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                let Some(id) = self
                    .budget
                    .sel
                    .selected()
                    .and_then(|i| self.budget.list.get(i))
                    .map(|b| b.id.clone())
                else {
                    return;
                };
                match self.api.remove_budget(&id).await {
                    Ok(()) => {
                        self.status = "Budget removed".into();
                        if let Err(e) = self.refresh_budgets().await {
                            self.status = format!("Refresh failed: {e}");
                        }
                    }
                    Err(e) => self.budget.error = Some(e.to_string()),
                }
            }
            _ => {}
        }
    }

    async fn handle_budget_input(&mut self, k: KeyEvent) {
        let Some(field) = self.budget.editing else { return };
        match k.code {
            KeyCode::Esc => self.budget.editing = None,
            KeyCode::Tab | KeyCode::BackTab => {
                self.budget.editing = Some(match field {
                    BudgetField::Category => BudgetField::Limit,
                    BudgetField::Limit => BudgetField::Category,
                });
            }
            KeyCode::Enter => {
                let Some(limit) = parse_money(&self.budget.limit.value) else {
                    self.budget.error = Some("Budget limit must be a number".into());
                    return;
                };
                let new = NewBudget {
                    category: self.budget.category.trimmed().to_string(),
                    limit,
                };
                match self.api.create_budget(new).await {
                    Ok(b) => {
                        self.status = format!("Budget for {} added", b.category);
                        self.budget.editing = None;
                        self.budget.error = None;
                        if let Err(e) = self.refresh_budgets().await {
                            self.status = format!("Refresh failed: {e}");
                        }
                    }
                    Err(e) => self.budget.error = Some(e.to_string()),
                }
            }
            code => {
                let edit = match field {
                    BudgetField::Category => &mut self.budget.category,
                    BudgetField::Limit => &mut self.budget.limit,
                };
                edit.handle(code);
            }
        }
    }

    // ---------- goals ----------

    fn selected_goal_id(&self) -> Option<String> {
        self.goals
            .sel
            .selected()
            .and_then(|i| self.goals.list.get(i))
            .map(|g| g.id.clone())
    }

    async fn handle_goal_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Up => {
                let sel = move_sel(self.goals.list.len(), self.goals.sel.selected(), -1);
                self.goals.sel.select(sel);
            }
            KeyCode::Down => {
                let sel = move_sel(self.goals.list.len(), self.goals.sel.selected(), 1);
                self.goals.sel.select(sel);
            }
            KeyCode::Char('a') => {
                self.goals.title.clear();
                self.goals.target.clear();
                self.goals.error = None;
                self.goals.editing = Some(GoalField::Title);
            }
            KeyCode::Char('c') | KeyCode::Enter if self.selected_goal_id().is_some() => {
                self.goals.contribution.clear();
                self.goals.error = None;
                self.goals.editing = Some(GoalField::Contribution);
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                let Some(id) = self.selected_goal_id() else { return };
                match self.api.delete_goal(&id).await {
                    Ok(()) => {
                        self.status = "Goal deleted".into();
                        if let Err(e) = self.refresh_goals().await {
                            self.status = format!("Refresh failed: {e}");
                        }
                    }
                    Err(e) => self.goals.error = Some(e.to_string()),
                }
            }
            _ => {}
        }
    }

    async fn handle_goal_input(&mut self, k: KeyEvent) {
        let Some(field) = self.goals.editing else { return };
        match k.code {
            KeyCode::Esc => self.goals.editing = None,
            KeyCode::Tab | KeyCode::BackTab if field != GoalField::Contribution => {
                self.goals.editing = Some(match field {
                    GoalField::Title => GoalField::Target,
                    _ => GoalField::Title,
                });
            }
            KeyCode::Enter if field == GoalField::Contribution => self.submit_contribution().await,
            KeyCode::Enter => self.submit_goal().await,
            code => {
                let edit = match field {
                    GoalField::Title => &mut self.goals.title,
                    GoalField::Target => &mut self.goals.target,
                    GoalField::Contribution => &mut self.goals.contribution,
                };
                edit.handle(code);
            }
        }
    }

    async fn submit_goal(&mut self) {
        let Some(target) = parse_money(&self.goals.target.value) else {
            self.goals.error = Some("Target must be a number".into());
            return;
        };
        let new = NewGoal {
            title: self.goals.title.trimmed().to_string(),
            target,
        };
        match self.api.create_goal(new).await {
            Ok(g) => {
                self.status = format!("Goal '{}' added", g.title);
                self.goals.editing = None;
                self.goals.error = None;
                if let Err(e) = self.refresh_goals().await {
                    self.status = format!("Refresh failed: {e}");
                }
                self.goals.sel.select(Some(0));
            }
            Err(e) => self.goals.error = Some(e.to_string()),
        }
    }

    async fn submit_contribution(&mut self) {
        let Some(id) = self.selected_goal_id() else {
            self.goals.editing = None;
            return;
        };
        let Some(amount) = parse_money(&self.goals.contribution.value) else {
            self.goals.error = Some("Enter an amount to add".into());
            return;
        };
        match self.api.contribute(&id, Contribution { amount }).await {
            Ok(g) => {
                self.status = format!("Saved {} towards '{}'", g.saved, g.title);
                self.goals.editing = None;
                self.goals.error = None;
                if let Err(e) = self.refresh_goals().await {
                    self.status = format!("Refresh failed: {e}");
                }
            }
            Err(e) => self.goals.error = Some(e.to_string()),
        }
    }

    // ---------- settings ----------

    async fn handle_settings_key(&mut self, k: KeyEvent) {
        let n = SettingsField::ALL.len();
        let field = self.settings.current_field();
        match k.code {
            KeyCode::Up => {
                let sel = move_sel(n, self.settings.sel.selected(), -1);
                self.settings.sel.select(sel);
            }
            KeyCode::Down => {
                let sel = move_sel(n, self.settings.sel.selected(), 1);
                self.settings.sel.select(sel);
            }
            KeyCode::Enter if field.is_text() => {
                let current = match field {
                    SettingsField::MonthlyLimit => self.settings.draft.budget_limits.monthly.to_string(),
                    SettingsField::DailyLimit => self.settings.draft.budget_limits.daily.to_string(),
                    _ => field.value(&self.settings.draft),
                };
                self.settings.editing = Some(LineEdit::with(current));
            }
            KeyCode::Left => self.settings.adjust(field, -1),
            KeyCode::Right | KeyCode::Enter | KeyCode::Char(' ') => self.settings.adjust(field, 1),
            KeyCode::Char('s') => match self.api.save_settings(self.settings.draft.clone()).await {
                Ok(saved) => {
                    self.settings.draft = saved;
                    self.settings.dirty = false;
                    self.settings.error = None;
                    self.status = "Settings saved".into();
                }
                Err(e) => self.settings.error = Some(format!("Failed to update settings: {e}")),
            },
            KeyCode::Char('r') => match self.api.load_settings().await {
                Ok(loaded) => {
                    self.settings.draft = loaded;
                    self.settings.dirty = false;
                    self.settings.error = None;
                }
                Err(e) => self.settings.error = Some(format!("Failed to load settings: {e}")),
            },
            _ => {}
        }
    }

    fn handle_settings_input(&mut self, k: KeyEvent) {
        let field = self.settings.current_field();
        let Some(edit) = self.settings.editing.as_mut() else { return };
        match k.code {
            KeyCode::Esc => self.settings.editing = None,
            KeyCode::Enter => {
                let text = edit.value.clone();
                match self.settings.commit_text(field, &text) {
                    Ok(()) => {
                        self.settings.editing = None;
                        self.settings.error = None;
                    }
                    Err(msg) => self.settings.error = Some(msg),
                }
            }
            code => {
                edit.handle(code);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn txn_form_requires_every_field() {
        let mut form = TxnForm::blank();
        assert_eq!(form.to_request().unwrap_err(), "Description is required");
        form.description.set("Lunch");
        form.category.set("Food");
        assert_eq!(form.to_request().unwrap_err(), "Amount cannot be empty");
        form.amount.set("12x");
        assert_eq!(form.to_request().unwrap_err(), "Invalid amount format");
        form.amount.set("12.5");
        form.date.set("tomorrow");
        assert!(form.to_request().is_err());
        form.date.set("2024-05-01");
        let req = form.to_request().unwrap();
        assert_eq!(req.amount, dec!(12.5));
        assert_eq!(req.kind, TransactionKind::Expense);
    }

    #[test]
    fn settings_choices_wrap_around() {
        assert_eq!(cycle_choice(&CURRENCIES, "GBP", 1), "NGN");
        assert_eq!(cycle_choice(&LANGUAGES, "English", -1), "Spanish");
        assert_eq!(cycle_choice(&TIMEZONES, "unknown", 1), "GMT+1");
    }

    #[test]
    fn settings_limits_reject_negative_values() {
        let mut page = SettingsPage::default();
        assert!(page.commit_text(SettingsField::DailyLimit, "-4").is_err());
        page.commit_text(SettingsField::MonthlyLimit, "2,000").unwrap();
        assert_eq!(page.draft.budget_limits.monthly, dec!(2000));
        assert!(page.dirty);

        page.adjust(SettingsField::DataSharing, 1);
        assert!(page.draft.privacy.data_sharing);
    }

    #[test]
    fn tabs_wrap_in_both_directions() {
        assert_eq!(Tab::Dashboard.step(-1), Tab::Help);
        assert_eq!(Tab::Help.step(1), Tab::Dashboard);
        assert_eq!(Tab::Goals.index(), 3);
    }

    #[test]
    fn selection_helpers_stay_in_bounds() {
        assert_eq!(move_sel(0, Some(3), 1), None);
        assert_eq!(move_sel(3, Some(2), 1), Some(0));
        assert_eq!(clamp_sel(2, Some(5)), Some(1));
        assert_eq!(clamp_sel(2, None), Some(0));
    }
}
