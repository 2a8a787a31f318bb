//! The per-user preferences document.
//!
//! Stored and loaded as a single JSON document. Keys are camelCase so the
//! document keeps the same shape clients already send.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::User;

pub const CURRENCIES: [&str; 4] = ["NGN", "USD", "EUR", "GBP"];
pub const TIMEZONES: [&str; 4] = ["GMT+0", "GMT+1", "GMT+2", "GMT+3"];
pub const LANGUAGES: [&str; 3] = ["English", "French", "Spanish"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Notifications {
    pub email: bool,
    pub push: bool,
    pub budget_alerts: bool,
    pub monthly_reports: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            budget_alerts: true,
            monthly_reports: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Privacy {
    pub profile_visible: bool,
    pub data_sharing: bool,
}

impl Default for Privacy {
    fn default() -> Self {
        Self {
            profile_visible: true,
            data_sharing: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetLimits {
    pub monthly: Decimal,
    pub daily: Decimal,
    pub category_limits: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Daily,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub name: String,
    pub email: String,
    pub currency: String,
    pub phone: String,
    pub timezone: String,
    pub language: String,
    pub avatar: String,
    pub notifications: Notifications,
    pub privacy: Privacy,
    pub budget_limits: BudgetLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            currency: "NGN".into(),
            phone: String::new(),
            timezone: "GMT+1".into(),
            language: "English".into(),
            avatar: String::new(),
            notifications: Notifications::default(),
            privacy: Privacy::default(),
            budget_limits: BudgetLimits::default(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl UserSettings {
    /// Defaults for a user who never saved preferences.
    pub fn initial_for(user: &User) -> Self {
        Self {
            name: user.display_name.clone().unwrap_or_default(),
            email: user.email.clone(),
            ..Self::default()
        }
    }

    pub fn currency_symbol(&self) -> &'static str {
        match self.currency.as_str() {
            "USD" => "$",
            "EUR" => "€",
            "GBP" => "£",
            _ => "₦",
        }
    }

    pub fn format_amount(&self, amount: Decimal) -> String {
        format!("{}{}", self.currency_symbol(), group_thousands(amount))
    }

    /// A zero limit means "no limit".
    pub fn is_budget_exceeded(&self, amount: Decimal, period: BudgetPeriod) -> bool {
        let limit = match period {
            BudgetPeriod::Daily => self.budget_limits.daily,
            BudgetPeriod::Monthly => self.budget_limits.monthly,
        };
        limit > Decimal::ZERO && amount > limit
    }
}

/// Partial update; fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub currency: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub language: Option<String>,
    pub avatar: Option<String>,
    pub notifications: Option<Notifications>,
    pub privacy: Option<Privacy>,
    pub budget_limits: Option<BudgetLimits>,
}

impl SettingsPatch {
    pub fn apply(self, settings: &mut UserSettings) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    settings.$field = value;
                })*
            };
        }
        overlay!(
            name,
            email,
            currency,
            phone,
            timezone,
            language,
            avatar,
            notifications,
            privacy,
            budget_limits
        );
    }
}

impl From<UserSettings> for SettingsPatch {
    fn from(s: UserSettings) -> Self {
        Self {
            name: Some(s.name),
            email: Some(s.email),
            currency: Some(s.currency),
            phone: Some(s.phone),
            timezone: Some(s.timezone),
            language: Some(s.language),
            avatar: Some(s.avatar),
            notifications: Some(s.notifications),
            privacy: Some(s.privacy),
            budget_limits: Some(s.budget_limits),
        }
    }
}

/// `1234567.5` -> `1,234,567.5`; at most two decimals.
pub fn group_thousands(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
