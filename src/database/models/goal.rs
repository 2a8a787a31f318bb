use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub target: Decimal,
    pub saved: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Saved amount after adding `amount`, never above the target.
    pub fn saved_after(&self, amount: Decimal) -> Decimal {
        self.saved.saturating_add(amount).min(self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGoal {
    pub title: String,
    pub target: Decimal,
}

impl NewGoal {
    pub fn normalized(mut self) -> AppResult<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(AppError::validation("goal title is required"));
        }
        if self.target <= Decimal::ZERO {
            return Err(AppError::validation("target amount must be greater than zero"));
        }
        super::ensure_within_max("target amount", self.target)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub amount: Decimal,
}

impl Contribution {
    pub fn validate(&self) -> AppResult<()> {
        if self.amount <= Decimal::ZERO {
            return Err(AppError::validation("contribution must be greater than zero"));
        }
        super::ensure_within_max("contribution", self.amount)?;
        Ok(())
    }
}
