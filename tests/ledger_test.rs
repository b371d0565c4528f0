//! Property-based tests for customer aggregation.
//!
//! These check invariants that should hold for any log of valid
//! transactions, whatever its order.

mod common;

use common::{customer_record, make_transaction, reported_customer};
use khata::domain::{
    Aggregates, Transaction, TransactionKind, aggregate, aggregate_all, rank_outstanding, verify,
};
use proptest::prelude::*;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

fn arb_kind() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![Just(TransactionKind::Credit), Just(TransactionKind::Debit)]
}

/// A positive amount between 0.01 and 10,000,000.00
fn arb_amount() -> impl Strategy<Value = i64> {
    1i64..=1_000_000_000i64
}

/// A log spread over three customers
fn arb_log() -> impl Strategy<Value = Vec<Transaction>> {
    prop::collection::vec((1i64..=3, arb_kind(), arb_amount()), 0..60).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (customer_id, kind, amount))| {
                make_transaction(i as i64 + 1, customer_id, kind, amount, "2024-01-01")
            })
            .collect()
    })
}

fn totals(transactions: &[Transaction], customer_id: i64, kind: TransactionKind) -> i64 {
    transactions
        .iter()
        .filter(|t| t.customer_id == customer_id && t.kind == kind)
        .map(|t| t.amount)
        .sum()
}

// =============================================================================
// Aggregation Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Balance always equals credit minus debit, and each total is the sum
    /// of that kind's amounts.
    #[test]
    fn balance_is_credit_minus_debit(log in arb_log()) {
        for customer_id in 1..=3 {
            let aggregates = aggregate(customer_id, &log).unwrap();

            prop_assert_eq!(
                aggregates.total_credit(),
                totals(&log, customer_id, TransactionKind::Credit)
            );
            prop_assert_eq!(
                aggregates.total_debit(),
                totals(&log, customer_id, TransactionKind::Debit)
            );
            prop_assert_eq!(
                aggregates.balance(),
                aggregates.total_credit() - aggregates.total_debit()
            );
        }
    }

    /// The order of the log never changes the result.
    #[test]
    fn aggregation_ignores_order(log in arb_log()) {
        let mut reversed = log.clone();
        reversed.reverse();

        let mut rotated = log.clone();
        if !rotated.is_empty() {
            rotated.rotate_left(log.len() / 2);
        }

        for customer_id in 1..=3 {
            let forward = aggregate(customer_id, &log).unwrap();
            prop_assert_eq!(forward, aggregate(customer_id, &reversed).unwrap());
            prop_assert_eq!(forward, aggregate(customer_id, &rotated).unwrap());
        }
    }

    /// Folding the whole log at once agrees with per-customer aggregation.
    #[test]
    fn aggregate_all_matches_aggregate(log in arb_log()) {
        let all = aggregate_all(&log).unwrap();

        for customer_id in 1..=3 {
            let expected = aggregate(customer_id, &log).unwrap();
            let found = all.get(&customer_id).copied().unwrap_or(Aggregates::ZERO);
            prop_assert_eq!(found, expected);
        }
    }

    /// Appending one transaction moves exactly one total and the balance by its amount.
    #[test]
    fn appending_moves_totals_by_amount(
        log in arb_log(),
        kind in arb_kind(),
        amount in arb_amount(),
    ) {
        let before = aggregate(1, &log).unwrap();

        let mut extended = log.clone();
        extended.push(make_transaction(10_000, 1, kind, amount, "2024-02-01"));
        let after = aggregate(1, &extended).unwrap();

        match kind {
            TransactionKind::Credit => {
                prop_assert_eq!(after.total_credit(), before.total_credit() + amount);
                prop_assert_eq!(after.total_debit(), before.total_debit());
                prop_assert_eq!(after.balance(), before.balance() + amount);
            }
            TransactionKind::Debit => {
                prop_assert_eq!(after.total_debit(), before.total_debit() + amount);
                prop_assert_eq!(after.total_credit(), before.total_credit());
                prop_assert_eq!(after.balance(), before.balance() - amount);
            }
        }

        // Other customers are untouched
        prop_assert_eq!(aggregate(2, &log).unwrap(), aggregate(2, &extended).unwrap());
    }

    /// Outstanding customers come largest absolute balance first and settled
    /// customers are left out.
    #[test]
    fn outstanding_is_ordered_by_absolute_balance(
        balances in prop::collection::vec((0i64..1_000_000, 0i64..1_000_000), 0..30),
    ) {
        let customers: Vec<_> = balances
            .iter()
            .enumerate()
            .map(|(i, (credit, debit))| {
                reported_customer(i as i64 + 1, "Customer", *credit, *debit)
            })
            .collect();

        let ranked = rank_outstanding(&customers);

        prop_assert_eq!(
            ranked.len(),
            customers.iter().filter(|c| c.balance() != 0).count()
        );
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].balance().abs() >= pair[1].balance().abs());
        }
    }
}

// =============================================================================
// Examples
// =============================================================================

#[test]
fn test_asha_example() {
    let log = vec![
        make_transaction(1, 1, TransactionKind::Credit, 50_000, "2024-01-01"),
        make_transaction(2, 1, TransactionKind::Debit, 20_000, "2024-01-02"),
        make_transaction(3, 1, TransactionKind::Credit, 10_000, "2024-01-03"),
    ];

    let aggregates = aggregate(1, &log).unwrap();
    assert_eq!(aggregates.total_credit(), 60_000);
    assert_eq!(aggregates.total_debit(), 20_000);
    assert_eq!(aggregates.balance(), 40_000);

    let asha = customer_record(1, "Asha", 60_000, 20_000, 40_000);
    assert!(verify(&asha, &log).is_ok());

    let stale = customer_record(1, "Asha", 50_000, 20_000, 30_000);
    assert!(verify(&stale, &log).is_err());
}

#[test]
fn test_customer_without_transactions_is_zero() {
    let log = vec![make_transaction(
        1,
        2,
        TransactionKind::Credit,
        5_000,
        "2024-01-01",
    )];

    assert_eq!(aggregate(1, &log).unwrap(), Aggregates::ZERO);
    assert!(verify(&customer_record(1, "Nobody", 0, 0, 0), &log).is_ok());
}

#[test]
fn test_negative_balance_ranks_by_magnitude() {
    let customers = vec![
        reported_customer(1, "Owes us", 30_000, 0),
        reported_customer(2, "We owe", 0, 45_000),
        reported_customer(3, "Settled", 10_000, 10_000),
    ];

    let ranked = rank_outstanding(&customers);
    let ids: Vec<i64> = ranked.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[test]
fn test_positive_balance_ranks_ahead_of_smaller_negative() {
    // Asha owes 400.00, the store owes Ravi 50.00
    let customers = vec![
        reported_customer(2, "Ravi", 0, 5_000),
        reported_customer(1, "Asha", 60_000, 20_000),
    ];

    let ranked = rank_outstanding(&customers);
    let names: Vec<&str> = ranked.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Asha", "Ravi"]);
    assert_eq!(ranked[0].balance(), 40_000);
    assert_eq!(ranked[1].balance(), -5_000);
}

#[test]
fn test_overflow_is_an_error() {
    let log = vec![
        make_transaction(1, 1, TransactionKind::Credit, i64::MAX, "2024-01-01"),
        make_transaction(2, 1, TransactionKind::Credit, 1, "2024-01-02"),
    ];

    assert!(aggregate(1, &log).is_err());
}
