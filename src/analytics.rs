//! Aggregation over a user's records: totals, category breakdown, the
//! seven-day spending trend and budget/goal progress.
//!
//! Everything here is a pure single pass over in-memory slices.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::database::models::{Budget, BudgetPeriod, Goal, Transaction, UserSettings};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
    /// Share of all expenses, 0..=100
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub day: String,
    pub date: NaiveDate,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetProgress {
    #[serde(flatten)]
    pub budget: Budget,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub percent: f64,
    pub over_limit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    #[serde(flatten)]
    pub goal: Goal,
    pub remaining: Decimal,
    pub percent: f64,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlerts {
    pub enabled: bool,
    pub spent_today: Decimal,
    pub spent_this_month: Decimal,
    pub daily_exceeded: bool,
    pub monthly_exceeded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub summary: Summary,
    pub breakdown: Vec<CategoryTotal>,
    pub trend: Vec<TrendPoint>,
    pub budgets: Vec<BudgetProgress>,
    pub goals: Vec<GoalProgress>,
    pub alerts: BudgetAlerts,
}

/// `part / whole * 100`, capped at 100 and rounded to two places. A ratio
/// too large to represent counts as 100.
fn capped_percent(part: Decimal, whole: Decimal) -> f64 {
    if whole <= Decimal::ZERO || part <= Decimal::ZERO {
        return 0.0;
    }
    let pct = part
        .checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(Decimal::ONE_HUNDRED, |pct| pct.min(Decimal::ONE_HUNDRED));
    pct.round_dp(2).to_f64().unwrap_or(0.0)
}

/// Sum that saturates at `Decimal::MAX` instead of panicking.
fn total(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    amounts.fold(Decimal::ZERO, Decimal::saturating_add)
}

pub fn summarize(transactions: &[Transaction]) -> Summary {
    let income = total(transactions.iter().filter(|tx| tx.is_income()).map(|tx| tx.amount));
    let expenses = total(transactions.iter().filter(|tx| tx.is_expense()).map(|tx| tx.amount));

    Summary {
        income,
        expenses,
        balance: income.saturating_sub(expenses),
    }
}

/// Expense totals per category, largest first.
pub fn category_breakdown(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_expense()) {
        let sum = totals.entry(tx.category.as_str()).or_insert(Decimal::ZERO);
        *sum = sum.saturating_add(tx.amount);
    }

    let all = total(totals.values().copied());
    let mut out: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category: category.to_string(),
            amount,
            percent: capped_percent(amount, all),
        })
        .collect();

    // BTreeMap already gave name order, so a stable sort keeps it for ties
    out.sort_by(|a, b| b.amount.cmp(&a.amount));
    out
}

pub fn weekday_label(date: NaiveDate) -> &'static str {
    match date.weekday() {
        chrono::Weekday::Mon => "Mon",
        chrono::Weekday::Tue => "Tue",
        chrono::Weekday::Wed => "Wed",
        chrono::Weekday::Thu => "Thu",
        chrono::Weekday::Fri => "Fri",
        chrono::Weekday::Sat => "Sat",
        chrono::Weekday::Sun => "Sun",
    }
}

/// Expenses per day for the seven days ending on `today`, oldest first.
/// Fails when the window would start before the earliest representable date.
pub fn spending_trend(transactions: &[Transaction], today: NaiveDate) -> AppResult<Vec<TrendPoint>> {
    let start = today
        .checked_sub_signed(Duration::days(6))
        .ok_or_else(|| AppError::validation(format!("date {today} is out of range")))?;
    let mut buckets = [Decimal::ZERO; 7];

    for tx in transactions.iter().filter(|tx| tx.is_expense()) {
        let offset = (tx.date - start).num_days();
        if (0..7).contains(&offset) {
            let bucket = &mut buckets[offset as usize];
            *bucket = bucket.saturating_add(tx.amount);
        }
    }

    Ok(start
        .iter_days()
        .zip(buckets)
        .map(|(date, amount)| TrendPoint {
            day: weekday_label(date).to_string(),
            date,
            amount,
        })
        .collect())
}

/// Expense total for one category; matching is exact, as typed.
pub fn spent_in_category(transactions: &[Transaction], category: &str) -> Decimal {
    let amounts = transactions
        .iter()
        .filter(|tx| tx.is_expense() && tx.category == category)
        .map(|tx| tx.amount);
    total(amounts)
}

pub fn budget_progress(budget: &Budget, transactions: &[Transaction]) -> BudgetProgress {
    let spent = spent_in_category(transactions, &budget.category);
    BudgetProgress {
        budget: budget.clone(),
        spent,
        remaining: budget.limit.saturating_sub(spent).max(Decimal::ZERO),
        percent: capped_percent(spent, budget.limit),
        over_limit: spent > budget.limit,
    }
}

pub fn goal_progress(goal: &Goal) -> GoalProgress {
    GoalProgress {
        goal: goal.clone(),
        remaining: goal.target.saturating_sub(goal.saved).max(Decimal::ZERO),
        percent: capped_percent(goal.saved, goal.target),
        completed: goal.saved >= goal.target,
    }
}

pub fn spent_on(transactions: &[Transaction], day: NaiveDate) -> Decimal {
    total(
        transactions
            .iter()
            .filter(|tx| tx.is_expense() && tx.date == day)
            .map(|tx| tx.amount),
    )
}

pub fn spent_in_month(transactions: &[Transaction], day: NaiveDate) -> Decimal {
    total(
        transactions
            .iter()
            .filter(|tx| tx.is_expense() && tx.date.year() == day.year() && tx.date.month() == day.month())
            .map(|tx| tx.amount),
    )
}

pub fn budget_alerts(
    settings: &UserSettings,
    transactions: &[Transaction],
    today: NaiveDate,
) -> BudgetAlerts {
    let spent_today = spent_on(transactions, today);
    let spent_this_month = spent_in_month(transactions, today);
    BudgetAlerts {
        enabled: settings.notifications.budget_alerts,
        spent_today,
        spent_this_month,
        daily_exceeded: settings.is_budget_exceeded(spent_today, BudgetPeriod::Daily),
        monthly_exceeded: settings.is_budget_exceeded(spent_this_month, BudgetPeriod::Monthly),
    }
}

pub fn dashboard(
    transactions: &[Transaction],
    budgets: &[Budget],
    goals: &[Goal],
    settings: &UserSettings,
    today: NaiveDate,
) -> AppResult<Dashboard> {
    Ok(Dashboard {
        summary: summarize(transactions),
        breakdown: category_breakdown(transactions),
        trend: spending_trend(transactions, today)?,
        budgets: budgets.iter().map(|b| budget_progress(b, transactions)).collect(),
        goals: goals.iter().map(goal_progress).collect(),
        alerts: budget_alerts(settings, transactions, today),
    })
}
