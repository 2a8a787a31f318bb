use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::Income => Self::Expense,
            Self::Expense => Self::Income,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("income") {
            Ok(Self::Income)
        } else if s.eq_ignore_ascii_case("expense") {
            Ok(Self::Expense)
        } else {
            Err(AppError::validation(format!("unknown transaction type: {s}")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }
}

/// Fields a user fills in when adding or editing a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
}

impl NewTransaction {
    /// Trims the free-text fields and rejects blank or negative input.
    pub fn normalized(mut self) -> AppResult<Self> {
        self.description = self.description.trim().to_string();
        self.category = self.category.trim().to_string();
        if self.description.is_empty() {
            return Err(AppError::validation("description is required"));
        }
        if self.category.is_empty() {
            return Err(AppError::validation("category is required"));
        }
        if self.amount.is_sign_negative() {
            return Err(AppError::validation("amount must not be negative"));
        }
        super::ensure_within_max("amount", self.amount)?;
        Ok(self)
    }
}

impl From<&Transaction> for NewTransaction {
    fn from(tx: &Transaction) -> Self {
        Self {
            date: tx.date,
            description: tx.description.clone(),
            category: tx.category.clone(),
            kind: tx.kind,
            amount: tx.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> NewTransaction {
        NewTransaction {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: "  Groceries ".into(),
            category: " Food".into(),
            kind: TransactionKind::Expense,
            amount: dec!(42.50),
        }
    }

    #[test]
    fn normalized_trims_text_fields() {
        let tx = sample().normalized().unwrap();
        assert_eq!(tx.description, "Groceries");
        assert_eq!(tx.category, "Food");
    }

    #[test]
    fn blank_category_is_rejected() {
        let mut tx = sample();
        tx.category = "   ".into();
        assert!(matches!(tx.normalized(), Err(AppError::Validation(_))));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let mut tx = sample();
        tx.amount = dec!(-1);
        assert!(tx.normalized().is_err());
    }

    #[test]
    fn amounts_above_the_cap_are_rejected() {
        let mut tx = sample();
        tx.amount = crate::database::models::MAX_AMOUNT;
        assert!(tx.clone().normalized().is_ok());
        tx.amount = Decimal::from_i128_with_scale(10i128.pow(27), 0);
        assert!(matches!(tx.normalized(), Err(AppError::Validation(_))));
    }

    #[test]
    fn kind_parses_case_insensitively_and_uses_type_key() {
        assert_eq!("income".parse::<TransactionKind>().unwrap(), TransactionKind::Income);
        assert!("transfer".parse::<TransactionKind>().is_err());

        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "Expense");
        assert_eq!(json["amount"], 42.5);
    }
}
