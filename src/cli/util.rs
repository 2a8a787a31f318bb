use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

pub fn parse_money(s: &str) -> Option<Decimal> {
    let s = s.trim().replace(',', "");
    Decimal::from_str(&s).ok()
}

pub fn parse_date_any(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .ok()
}

pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

pub fn iso(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// `Mar 4`
pub fn short_date(d: &NaiveDate) -> String {
    d.format("%b %-d").to_string()
}

/// Text gauge such as `[######----]`.
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}
