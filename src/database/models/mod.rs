pub mod budget;
pub mod goal;
pub mod settings;
pub mod transaction;
pub mod user;

pub use budget::{Budget, NewBudget};
pub use goal::{Contribution, Goal, NewGoal};
pub use settings::{BudgetLimits, BudgetPeriod, Notifications, Privacy, SettingsPatch, UserSettings};
pub use transaction::{NewTransaction, Transaction, TransactionKind};
pub use user::{User, UserCredentials};

use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};

/// Largest value any money field accepts (10^15). Keeps every total the
/// aggregation code computes far inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

pub(crate) fn ensure_within_max(what: &str, amount: Decimal) -> AppResult<()> {
    if amount > MAX_AMOUNT {
        return Err(AppError::validation(format!("{what} must not exceed {MAX_AMOUNT}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn max_amount_is_one_quadrillion() {
        assert_eq!(MAX_AMOUNT, Decimal::from(1_000_000_000_000_000i64));
        assert!(ensure_within_max("amount", MAX_AMOUNT).is_ok());
        assert!(ensure_within_max("amount", MAX_AMOUNT + dec!(0.01)).is_err());
    }
}
