//! Tests for the registry

use super::*;
use std::collections::HashSet;

#[test]
fn test_names_are_unique() {
    let tables: HashSet<_> = REGISTRY.iter().map(|s| s.table).collect();
    let ranges: HashSet<_> = REGISTRY.iter().map(|s| s.source_range).collect();
    assert_eq!(tables.len(), REGISTRY.len());
    assert_eq!(ranges.len(), REGISTRY.len());
}

#[test]
fn test_global_tables_never_replace() {
    for spec in REGISTRY.iter().filter(|s| s.global) {
        assert!(
            matches!(spec.strategy, WriteStrategy::Upsert { .. }),
            "{} is global but not upsert",
            spec.table
        );
    }
}

#[test]
fn test_tenant_tables_key_on_tenant() {
    for spec in REGISTRY.iter().filter(|s| !s.global) {
        let key = match spec.strategy {
            WriteStrategy::Upsert { conflict_key }
            | WriteStrategy::StaleSiblingUpsert { conflict_key, .. } => conflict_key,
            _ => continue,
        };
        assert!(key.contains(&TENANT_COLUMN), "{} key lacks tenant", spec.table);
    }
}

#[test]
fn test_lookup() {
    assert_eq!(by_table("transactions").map(|s| s.source_range), Some("Transactions"));
    assert_eq!(by_range("Balances").map(|s| s.table), Some("account_balances"));
    assert!(by_table("nope").is_none());
}

#[test]
fn test_is_replace() {
    assert!(WriteStrategy::Replace.is_replace());
    assert!(by_table("recurring_payments").unwrap().strategy.is_replace());
    assert!(by_table("transactions").unwrap().strategy.is_replace());
    assert!(!by_table("net_worth_history").unwrap().strategy.is_replace());
    assert!(!by_table("account_balances").unwrap().strategy.is_replace());
}

#[test]
fn test_select_tables() {
    assert_eq!(select(None).unwrap().len(), REGISTRY.len());
    assert_eq!(select(Some(" ")).unwrap().len(), REGISTRY.len());

    let picked = select(Some("transactions, budget_categories")).unwrap();
    let tables: Vec<_> = picked.iter().map(|s| s.table).collect();
    assert_eq!(tables, vec!["transactions", "budget_categories"]);

    let err = select(Some("transactions,nope")).unwrap_err();
    assert!(err.to_string().contains("nope"));
}

#[test]
fn test_describe() {
    let info = describe();
    assert_eq!(info.len(), REGISTRY.len());
    let rates = info.iter().find(|i| i.table == "exchange_rates").unwrap();
    assert_eq!(rates.strategy, "upsert");
    assert!(rates.global);
}
