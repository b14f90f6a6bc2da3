//! Per-table row transforms
//!
//! Column meaning is positional. Each transform documents its layout and
//! returns `None` for rows it cannot turn into a valid record.

use super::parse::{amount, currency, date, is_header_or_sentinel, percent, text};
use super::to_record;
use crate::types::{JsonValue, Record};
use serde::Serialize;

/// `Date | Category | Amount`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetWorthRow {
    pub date: String,
    pub category: String,
    pub amount: f64,
}

pub fn net_worth(row: &[JsonValue]) -> Option<Record> {
    if is_header_or_sentinel(row, "Date") {
        return None;
    }
    to_record(&NetWorthRow {
        date: date(row.first())?,
        category: text(row.get(1))?,
        amount: amount(row.get(2))?,
    })
}

/// `Date | EUR/USD | GBP/USD | CHF/USD`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRateRow {
    pub date: String,
    pub eur_usd: Option<f64>,
    pub gbp_usd: Option<f64>,
    pub chf_usd: Option<f64>,
}

pub fn exchange_rates(row: &[JsonValue]) -> Option<Record> {
    if is_header_or_sentinel(row, "Date") {
        return None;
    }
    let rates = ExchangeRateRow {
        date: date(row.first())?,
        eur_usd: amount(row.get(1)),
        gbp_usd: amount(row.get(2)),
        chf_usd: amount(row.get(3)),
    };
    if rates.eur_usd.is_none() && rates.gbp_usd.is_none() && rates.chf_usd.is_none() {
        return None;
    }
    to_record(&rates)
}

/// `Date | Account | Category | Institution | Balance | Currency`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceRow {
    pub date: String,
    pub account: String,
    pub category: String,
    pub institution: String,
    pub balance: f64,
    pub currency: Option<String>,
}

pub fn balances(row: &[JsonValue]) -> Option<Record> {
    if is_header_or_sentinel(row, "Date") {
        return None;
    }
    to_record(&BalanceRow {
        date: date(row.first())?,
        account: text(row.get(1))?,
        category: text(row.get(2))?,
        institution: text(row.get(3))?,
        balance: amount(row.get(4))?,
        currency: currency(row.get(5)),
    })
}

/// `Month | Income | Expenses | Savings | Savings Rate`
///
/// Savings and the rate are derived from income and expenses when blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummaryRow {
    pub month: String,
    pub income: Option<f64>,
    pub expenses: Option<f64>,
    pub savings: Option<f64>,
    pub savings_rate: Option<f64>,
}

pub fn monthly_summary(row: &[JsonValue]) -> Option<Record> {
    if is_header_or_sentinel(row, "Month") {
        return None;
    }
    let month = date(row.first())?;
    let income = amount(row.get(1));
    let expenses = amount(row.get(2)).map(f64::abs);
    let savings = amount(row.get(3)).or_else(|| Some(income? - expenses?));
    let savings_rate = percent(row.get(4)).or_else(|| {
        let income = income.filter(|i| *i > 0.0)?;
        Some(savings? / income)
    });
    if income.is_none() && expenses.is_none() && savings.is_none() {
        return None;
    }
    to_record(&MonthlySummaryRow {
        month,
        income,
        expenses,
        savings,
        savings_rate,
    })
}

/// `Asset Class | Value | Target % | Actual %`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationRow {
    pub asset_class: Option<String>,
    pub value: Option<f64>,
    pub target_pct: Option<f64>,
    pub actual_pct: Option<f64>,
}

pub fn asset_allocation(row: &[JsonValue]) -> Option<Record> {
    if is_header_or_sentinel(row, "Asset Class") {
        return None;
    }
    to_record(&AllocationRow {
        asset_class: text(row.first()),
        value: amount(row.get(1)),
        target_pct: percent(row.get(2)),
        actual_pct: percent(row.get(3)),
    })
}

/// `Category | Budgeted | Spent`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetRow {
    pub category: String,
    pub budgeted: f64,
    pub spent: f64,
    pub remaining: f64,
}

pub fn budget(row: &[JsonValue]) -> Option<Record> {
    if is_header_or_sentinel(row, "Category") {
        return None;
    }
    let budgeted = amount(row.get(1))?;
    let spent = amount(row.get(2)).map_or(0.0, f64::abs);
    to_record(&BudgetRow {
        category: text(row.first())?,
        budgeted,
        spent,
        remaining: budgeted - spent,
    })
}

/// Billing cadence of a recurring payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Parse a free-text cadence, defaulting to monthly
    pub fn parse(value: Option<&JsonValue>) -> Self {
        let Some(raw) = text(value) else {
            return Self::Monthly;
        };
        match raw.to_lowercase().as_str() {
            "weekly" | "week" | "w" => Self::Weekly,
            "quarterly" | "quarter" | "q" => Self::Quarterly,
            "yearly" | "annual" | "annually" | "year" | "y" => Self::Yearly,
            _ => Self::Monthly,
        }
    }

    /// Number of charges per year
    pub fn per_year(self) -> f64 {
        match self {
            Self::Weekly => 52.0,
            Self::Monthly => 12.0,
            Self::Quarterly => 4.0,
            Self::Yearly => 1.0,
        }
    }
}

/// `Name | Category | Frequency | Amount`
///
/// The amount is per charge; both monthly and annual equivalents are stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringRow {
    pub name: String,
    pub category: Option<String>,
    pub frequency: String,
    pub monthly_amount: f64,
    pub annual_amount: f64,
}

pub fn recurring(row: &[JsonValue]) -> Option<Record> {
    if is_header_or_sentinel(row, "Name") {
        return None;
    }
    let frequency = Frequency::parse(row.get(2));
    let per_charge = amount(row.get(3))?.abs();
    let annual_amount = per_charge * frequency.per_year();
    to_record(&RecurringRow {
        name: text(row.first())?,
        category: text(row.get(1)),
        frequency: format!("{frequency:?}").to_lowercase(),
        monthly_amount: annual_amount / 12.0,
        annual_amount,
    })
}

/// `Date | Description | Category | Amount | Account`
///
/// Currency comes from the account label, e.g. `EUR Savings`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRow {
    pub date: String,
    pub description: String,
    pub category: Option<String>,
    pub amount: f64,
    pub account: Option<String>,
    pub currency: Option<String>,
}

pub fn transactions(row: &[JsonValue]) -> Option<Record> {
    if is_header_or_sentinel(row, "Date") {
        return None;
    }
    to_record(&TransactionRow {
        date: date(row.first())?,
        description: text(row.get(1))?,
        category: text(row.get(2)),
        amount: amount(row.get(3))?,
        account: text(row.get(4)),
        currency: currency(row.get(4)),
    })
}
