//! Cell parsers
//!
//! Spreadsheet cells arrive as JSON scalars: numbers for unformatted numeric
//! and date cells, strings for everything a human typed. Every parser returns
//! `None` on anything it does not understand.

use crate::types::JsonValue;
use chrono::{Duration, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Optional accounting parens, sign, currency symbol, digits, scale suffix
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<open>\()?\s*(?P<sign1>[-+])?\s*(?P<sym>[$€£¥])?\s*(?P<sign2>[-+])?\s*(?P<num>[0-9][0-9,]*(?:\.[0-9]*)?|\.[0-9]+)\s*(?P<scale>[kKmM])?\s*(?P<close>\))?$",
    )
    .unwrap()
});

static MONTH_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap());

/// Day zero of spreadsheet serial dates
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial accepted (9999-12-31)
const MAX_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Currency codes recognized in free text, matched by prefix
const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "CHF", "CAD", "JPY"];

/// Labels marking a totals row
const SENTINELS: &[&str] = &["total", "grand total", "totals"];

/// Trimmed, non-empty text of a cell. Numbers are rendered, bools and
/// nulls are not text.
pub fn text(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a currency amount.
///
/// Accepts `1200`, `"1,200.50"`, `"$1.2K"`, `"€3m"`, `"(1,200)"`, `"-$40"`.
pub fn amount(value: Option<&JsonValue>) -> Option<f64> {
    match value? {
        JsonValue::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        JsonValue::String(s) => amount_str(s),
        _ => None,
    }
}

fn amount_str(raw: &str) -> Option<f64> {
    let caps = AMOUNT.captures(raw.trim())?;
    let parens = caps.name("open").is_some();
    if parens != caps.name("close").is_some() {
        return None;
    }
    if caps.name("sign1").is_some() && caps.name("sign2").is_some() {
        return None;
    }

    let digits: String = caps["num"].chars().filter(|c| *c != ',').collect();
    let mut value: f64 = digits.parse().ok()?;

    value *= match caps.name("scale").map(|m| m.as_str()) {
        Some("k" | "K") => 1_000.0,
        Some("m" | "M") => 1_000_000.0,
        _ => 1.0,
    };

    let minus = caps
        .name("sign1")
        .or_else(|| caps.name("sign2"))
        .is_some_and(|m| m.as_str() == "-");
    if parens || minus {
        value = -value;
    }
    value.is_finite().then_some(value)
}

/// Parse a date into `YYYY-MM-DD`
pub fn date(value: Option<&JsonValue>) -> Option<String> {
    let parsed = match value? {
        JsonValue::Number(n) => serial_date(n.as_f64()?),
        JsonValue::String(s) => date_str(s.trim()),
        _ => None,
    }?;
    Some(parsed.format("%Y-%m-%d").to_string())
}

fn serial_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    #[allow(clippy::cast_possible_truncation)]
    let days = serial.floor() as i64;
    epoch.checked_add_signed(Duration::days(days))
}

fn date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Some(caps) = MONTH_ONLY.captures(s) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse a percentage into a fraction.
///
/// `"45%"` is 0.45; bare numbers up to 1 are already fractions, larger ones
/// are percent points.
pub fn percent(value: Option<&JsonValue>) -> Option<f64> {
    match value? {
        JsonValue::String(s) if s.trim().ends_with('%') => {
            let number = s.trim().trim_end_matches('%');
            amount_str(number).map(|v| v / 100.0)
        }
        other => amount(Some(other)).map(|v| if v.abs() <= 1.0 { v } else { v / 100.0 }),
    }
}

/// Infer a currency code from free text by case-insensitive prefix
pub fn currency(value: Option<&JsonValue>) -> Option<String> {
    let text = text(value)?.to_uppercase();
    CURRENCIES
        .iter()
        .find(|code| text.starts_with(*code))
        .map(ToString::to_string)
}

/// Normalized business name: trimmed, lowercased, inner whitespace collapsed
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether a row is a repeated header or a totals line
pub fn is_header_or_sentinel(row: &[JsonValue], first_header: &str) -> bool {
    let Some(first) = text(row.first()) else {
        return false;
    };
    let first = normalize_name(&first);
    first == first_header.to_lowercase() || SENTINELS.contains(&first.as_str())
}
