use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Spending limit for one category. What has been spent is derived from the
/// transaction list whenever it is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub category: String,
    pub limit: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBudget {
    pub category: String,
    pub limit: Decimal,
}

impl NewBudget {
    pub fn normalized(mut self) -> AppResult<Self> {
        self.category = self.category.trim().to_string();
        if self.category.is_empty() {
            return Err(AppError::validation("category is required"));
        }
        if self.limit <= Decimal::ZERO {
            return Err(AppError::validation("budget limit must be greater than zero"));
        }
        super::ensure_within_max("budget limit", self.limit)?;
        Ok(self)
    }
}
