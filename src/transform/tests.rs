//! Tests for the transform layer

use super::parse::{amount, currency, date, is_header_or_sentinel, normalize_name, percent};
use super::tables::{self, Frequency};
use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn row(cells: serde_json::Value) -> Vec<JsonValue> {
    match cells {
        JsonValue::Array(cells) => cells,
        other => panic!("not an array: {other}"),
    }
}

// ============================================================================
// Parser Tests
// ============================================================================

#[test_case(json!(1200), Some(1200.0) ; "plain number")]
#[test_case(json!("1,200.50"), Some(1200.5) ; "thousands separator")]
#[test_case(json!("$1.2K"), Some(1200.0) ; "symbol and k suffix")]
#[test_case(json!("€3m"), Some(3_000_000.0) ; "lowercase m suffix")]
#[test_case(json!(" £ 40 "), Some(40.0) ; "surrounding whitespace")]
#[test_case(json!("(1,200)"), Some(-1200.0) ; "accounting negative")]
#[test_case(json!("-$40"), Some(-40.0) ; "sign before symbol")]
#[test_case(json!("$-40"), Some(-40.0) ; "sign after symbol")]
#[test_case(json!("¥500"), Some(500.0) ; "yen")]
#[test_case(json!("(1,200"), None ; "unbalanced parens")]
#[test_case(json!("abc"), None ; "text")]
#[test_case(json!(""), None ; "empty")]
#[test_case(json!(true), None ; "bool")]
fn test_amount(input: JsonValue, expected: Option<f64>) {
    assert_eq!(amount(Some(&input)), expected);
}

#[test_case(json!("2024-01-15"), Some("2024-01-15") ; "iso")]
#[test_case(json!("2024/01/15"), Some("2024-01-15") ; "slashed iso")]
#[test_case(json!("01/15/2024"), Some("2024-01-15") ; "us")]
#[test_case(json!("2024-03"), Some("2024-03-01") ; "month only")]
#[test_case(json!(45306), Some("2024-01-15") ; "serial")]
#[test_case(json!(45306.75), Some("2024-01-15") ; "serial with time")]
#[test_case(json!("2024-13-01"), None ; "bad month")]
#[test_case(json!("yesterday"), None ; "text")]
#[test_case(json!(-5), None ; "negative serial")]
fn test_date(input: JsonValue, expected: Option<&str>) {
    assert_eq!(date(Some(&input)).as_deref(), expected);
}

#[test_case(json!("45%"), Some(0.45) ; "percent sign")]
#[test_case(json!(0.3), Some(0.3) ; "fraction")]
#[test_case(json!(30), Some(0.3) ; "percent points")]
#[test_case(json!("n/a"), None ; "text")]
fn test_percent(input: JsonValue, expected: Option<f64>) {
    assert_eq!(percent(Some(&input)), expected);
}

#[test_case("USD Checking", Some("USD") ; "upper")]
#[test_case("eur savings", Some("EUR") ; "lower")]
#[test_case("ChF", Some("CHF") ; "mixed")]
#[test_case("Main account", None ; "unknown")]
fn test_currency(input: &str, expected: Option<&str>) {
    assert_eq!(currency(Some(&json!(input))).as_deref(), expected);
}

#[test]
fn test_normalize_name() {
    assert_eq!(normalize_name("  Netflix   Premium "), "netflix premium");
    assert_eq!(normalize_name("NETFLIX\tpremium"), "netflix premium");
}

#[test]
fn test_header_and_sentinel_detection() {
    assert!(is_header_or_sentinel(&row(json!(["date", "x"])), "Date"));
    assert!(is_header_or_sentinel(&row(json!(["Grand  Total", 10])), "Date"));
    assert!(!is_header_or_sentinel(&row(json!(["2024-01-01", 10])), "Date"));
    assert!(!is_header_or_sentinel(&[], "Date"));
}

// ============================================================================
// Table Transform Tests
// ============================================================================

#[test]
fn test_net_worth_row() {
    let record = apply(
        tables::net_worth,
        &row(json!(["2024-01-31", "Cash", "$12.5K"])),
    )
    .unwrap();
    assert_eq!(
        JsonValue::Object(record),
        json!({"date": "2024-01-31", "category": "Cash", "amount": 12500.0})
    );
}

#[test]
fn test_net_worth_fails_closed() {
    assert!(apply(tables::net_worth, &row(json!(["not a date", "Cash", 1]))).is_none());
    assert!(apply(tables::net_worth, &row(json!(["2024-01-31", "", 1]))).is_none());
    assert!(apply(tables::net_worth, &row(json!(["2024-01-31", "Cash", "lots"]))).is_none());
    assert!(apply(tables::net_worth, &row(json!(["Total", "", 1]))).is_none());
    assert!(apply(tables::net_worth, &row(json!(["2024-01-31"]))).is_none());
}

#[test]
fn test_exchange_rates_requires_a_rate() {
    assert!(apply(tables::exchange_rates, &row(json!(["2024-01-01", "", ""]))).is_none());
    let record = apply(tables::exchange_rates, &row(json!(["2024-01-01", 1.09]))).unwrap();
    assert_eq!(record["eur_usd"], json!(1.09));
    assert_eq!(record["gbp_usd"], JsonValue::Null);
}

#[test]
fn test_balances_row() {
    let record = apply(
        tables::balances,
        &row(json!(["2024-02-01", "Checking", "Cash", "Ally", "(250)", "usd"])),
    )
    .unwrap();
    assert_eq!(record["balance"], json!(-250.0));
    assert_eq!(record["currency"], json!("USD"));
    assert!(apply(
        tables::balances,
        &row(json!(["2024-02-01", "Checking", "Cash", "", 10]))
    )
    .is_none());
}

#[test]
fn test_monthly_summary_derives_savings() {
    let record = apply(
        tables::monthly_summary,
        &row(json!(["2024-01", 5000, "-3,000", "", ""])),
    )
    .unwrap();
    assert_eq!(record["month"], json!("2024-01-01"));
    assert_eq!(record["expenses"], json!(3000.0));
    assert_eq!(record["savings"], json!(2000.0));
    assert_eq!(record["savings_rate"], json!(0.4));
}

#[test]
fn test_monthly_summary_without_figures_is_skipped() {
    assert!(apply(tables::monthly_summary, &row(json!(["2024-01", "", ""]))).is_none());
}

#[test]
fn test_allocation_whole_row_emptiness() {
    assert!(apply(tables::asset_allocation, &row(json!(["", "n/a", "", "  "]))).is_none());
    assert!(apply(tables::asset_allocation, &row(json!([]))).is_none());

    let record = apply(
        tables::asset_allocation,
        &row(json!(["Equities", "$60K", "60%", 0.55])),
    )
    .unwrap();
    assert_eq!(record["target_pct"], json!(0.6));
    assert_eq!(record["actual_pct"], json!(0.55));
}

#[test]
fn test_budget_spent_is_absolute() {
    let record = apply(tables::budget, &row(json!(["Groceries", 600, "-450"]))).unwrap();
    assert_eq!(record["spent"], json!(450.0));
    assert_eq!(record["remaining"], json!(150.0));
}

#[test_case(json!("Monthly"), 10.0, 10.0, 120.0 ; "monthly")]
#[test_case(json!("yearly"), 120.0, 10.0, 120.0 ; "yearly")]
#[test_case(json!("Quarterly"), 30.0, 10.0, 120.0 ; "quarterly")]
#[test_case(json!(""), 10.0, 10.0, 120.0 ; "blank defaults to monthly")]
fn test_recurring_scaling(freq: JsonValue, charge: f64, monthly: f64, annual: f64) {
    let record = apply(tables::recurring, &[json!("Gym"), json!("Health"), freq, json!(-charge)])
        .unwrap();
    assert_eq!(record["monthly_amount"], json!(monthly));
    assert_eq!(record["annual_amount"], json!(annual));
}

#[test]
fn test_frequency_parse() {
    assert_eq!(Frequency::parse(Some(&json!("Weekly"))), Frequency::Weekly);
    assert_eq!(Frequency::parse(None), Frequency::Monthly);
    assert_eq!(Frequency::Weekly.per_year(), 52.0);
}

#[test]
fn test_transactions_keep_sign_and_infer_currency() {
    let record = apply(
        tables::transactions,
        &row(json!(["2024-03-02", "Coffee", "Food", -4.5, "EUR Card"])),
    )
    .unwrap();
    assert_eq!(record["amount"], json!(-4.5));
    assert_eq!(record["currency"], json!("EUR"));

    let record = apply(
        tables::transactions,
        &row(json!(["2024-03-02", "Coffee", "Food", -4.5, "Wallet"])),
    )
    .unwrap();
    assert_eq!(record["currency"], JsonValue::Null);
}
