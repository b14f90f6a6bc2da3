//! Tests for the batch fetch adapter

use super::*;
use crate::error::FailureKind;
use crate::registry::{by_table, REGISTRY};
use crate::source::FixtureSource;
use serde_json::json;

fn budget_grid() -> ValueGrid {
    vec![
        vec![json!("Category"), json!("Budgeted"), json!("Spent")],
        vec![json!("Food"), json!(500), json!(120)],
        vec![json!("Total"), json!(500), json!(120)],
        vec![json!("Rent"), json!("lots"), json!(0)],
    ]
}

fn specs(tables: &[&str]) -> Vec<SyncSpec> {
    tables.iter().map(|t| *by_table(t).unwrap()).collect()
}

#[tokio::test]
async fn test_batch_tier_and_outcomes() {
    let source = FixtureSource::new()
        .with_range("Budget", budget_grid())
        .with_range("Allocation", vec![vec![json!("Asset Class")]])
        .with_range("MonthlySummary", vec![]);

    let report = BatchFetcher::new(&source)
        .fetch(&specs(&["budget_categories", "asset_allocation", "monthly_summary", "transactions"]))
        .await
        .unwrap();

    assert_eq!(report.tier, Some(FetchTier::Batch));
    assert_eq!(source.batch_calls(), 1);
    assert_eq!(source.single_calls(), 0);

    match report.outcome("budget_categories") {
        Some(FetchOutcome::Rows(rows)) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0]["category"], json!("Food"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.skipped_rows, 2);
    assert_eq!(
        report.outcome("asset_allocation"),
        Some(&FetchOutcome::NoData { tab_present: true })
    );
    assert_eq!(
        report.outcome("monthly_summary"),
        Some(&FetchOutcome::NoData { tab_present: true })
    );
    assert_eq!(
        report.outcome("transactions"),
        Some(&FetchOutcome::NoData { tab_present: false })
    );
}

#[tokio::test]
async fn test_all_rows_invalid_is_no_data() {
    let source = FixtureSource::new().with_range(
        "NetWorth",
        vec![
            vec![json!("Date"), json!("Category"), json!("Amount")],
            vec![json!("soon"), json!("Cash"), json!(1)],
        ],
    );

    let report = BatchFetcher::new(&source)
        .fetch(&specs(&["net_worth_history"]))
        .await
        .unwrap();

    assert_eq!(
        report.outcome("net_worth_history"),
        Some(&FetchOutcome::NoData { tab_present: true })
    );
}

#[tokio::test]
async fn test_per_range_fallback_isolates_failures() {
    let source = FixtureSource::new()
        .with_range("Budget", budget_grid())
        .with_range("Recurring", vec![vec![json!("Name")], vec![json!("Gym"), json!(""), json!("monthly"), json!(40)]])
        .failing_range("Recurring");

    let report = BatchFetcher::new(&source)
        .fetch(&specs(&["budget_categories", "recurring_payments"]))
        .await
        .unwrap();

    assert_eq!(report.tier, Some(FetchTier::PerRange));
    assert_eq!(source.batch_calls(), 1);
    assert_eq!(source.single_calls(), 2);
    assert!(matches!(report.outcome("budget_categories"), Some(FetchOutcome::Rows(_))));
    match report.outcome("recurring_payments") {
        Some(FetchOutcome::FetchError(message)) => assert!(message.contains("Recurring")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_combined_fetch_failure_falls_back_for_every_range() {
    let source = FixtureSource::new()
        .with_range("Budget", budget_grid())
        .with_range(
            "Recurring",
            vec![
                vec![json!("Name"), json!("Category"), json!("Frequency"), json!("Amount")],
                vec![json!("Gym"), json!("Health"), json!("Monthly"), json!(40)],
            ],
        )
        .failing_batch();

    let report = BatchFetcher::new(&source)
        .fetch(&specs(&["budget_categories", "recurring_payments"]))
        .await
        .unwrap();

    assert_eq!(report.tier, Some(FetchTier::PerRange));
    assert_eq!(source.batch_calls(), 1);
    assert_eq!(source.single_calls(), 2);
    assert!(matches!(report.outcome("budget_categories"), Some(FetchOutcome::Rows(_))));
    assert!(matches!(report.outcome("recurring_payments"), Some(FetchOutcome::Rows(_))));
}

#[tokio::test]
async fn test_nothing_present_skips_fetching() {
    let source = FixtureSource::new().with_range("Notes", vec![]);

    let report = BatchFetcher::new(&source).fetch(REGISTRY).await.unwrap();

    assert_eq!(report.tier, None);
    assert_eq!(source.batch_calls(), 0);
    assert_eq!(report.outcomes.len(), REGISTRY.len());
    assert!(report
        .outcomes
        .iter()
        .all(|(_, o)| *o == FetchOutcome::NoData { tab_present: false }));
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let source = FixtureSource::new().failing_listing();

    let err = BatchFetcher::new(&source).fetch(REGISTRY).await.unwrap_err();
    assert_eq!(err.failure_kind(), FailureKind::SourceAccess);
}
