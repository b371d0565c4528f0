mod common;

use anyhow::Result;
use chrono::Local;
use common::{
    FlakyBackend, StaleBackend, customer_record, date, make_transaction, test_repository,
    test_repository_with_url, test_service,
};
use khata::domain::{BalanceDirection, LedgerError, NewCustomer, NewTransaction, TransactionKind};
use khata::statement::RenderOptions;
use khata::{AppError, LedgerBackend, LedgerService, Repository};

#[tokio::test]
async fn test_end_to_end_balances_and_ranking() -> Result<()> {
    let (mut service, _temp) = test_service().await?;

    let asha = service.create_customer("Asha", "555-0100").await?;
    let ravi = service.create_customer("Ravi", "555-0101").await?;

    service
        .create_transaction(
            NewTransaction::new(asha.id, TransactionKind::Credit, 50_000).on(date("2024-01-01")),
        )
        .await?;
    service
        .create_transaction(
            NewTransaction::new(asha.id, TransactionKind::Debit, 20_000).on(date("2024-01-02")),
        )
        .await?;
    let recorded = service
        .create_transaction(
            NewTransaction::new(asha.id, TransactionKind::Credit, 10_000).on(date("2024-01-03")),
        )
        .await?;
    service
        .create_transaction(
            NewTransaction::new(ravi.id, TransactionKind::Debit, 5_000).on(date("2024-01-03")),
        )
        .await?;

    assert_eq!(recorded.customer.total_credit(), 60_000);
    assert_eq!(recorded.customer.total_debit(), 20_000);
    assert_eq!(recorded.customer.balance(), 40_000);

    let asha = service.customer(asha.id)?;
    assert_eq!(asha.balance(), 40_000);
    assert_eq!(asha.direction(), BalanceDirection::OwesYou);

    let ravi = service.customer(ravi.id)?;
    assert_eq!(ravi.balance(), -5_000);
    assert_eq!(ravi.direction(), BalanceDirection::YouOwe);

    let ranked: Vec<&str> = service
        .state()
        .outstanding()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(ranked, vec!["Asha", "Ravi"]);

    let summary = service.state().summary()?;
    assert_eq!(summary.total_credit, 60_000);
    assert_eq!(summary.total_debit, 25_000);
    assert_eq!(summary.net_balance, 35_000);
    assert_eq!(summary.customers_owing, 1);
    assert_eq!(summary.customers_owed, 1);

    // Most recent first
    let history: Vec<i64> = service
        .state()
        .customer_transactions(asha.id)
        .iter()
        .map(|t| t.amount)
        .collect();
    assert_eq!(history, vec![10_000, 20_000, 50_000]);

    Ok(())
}

#[tokio::test]
async fn test_larger_negative_balance_ranks_first() -> Result<()> {
    let (mut service, _temp) = test_service().await?;

    let a = service.create_customer("A", "555-0001").await?;
    let b = service.create_customer("B", "555-0002").await?;
    service.create_customer("C", "555-0003").await?;

    service
        .create_transaction(NewTransaction::new(a.id, TransactionKind::Credit, 30_000))
        .await?;
    service
        .create_transaction(NewTransaction::new(b.id, TransactionKind::Debit, 45_000))
        .await?;

    let ranked: Vec<i64> = service.state().outstanding().iter().map(|c| c.id).collect();
    assert_eq!(ranked, vec![b.id, a.id]);

    Ok(())
}

#[tokio::test]
async fn test_missing_date_defaults_to_today() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let asha = service.create_customer("Asha", "555-0100").await?;

    let recorded = service
        .create_transaction(NewTransaction::new(asha.id, TransactionKind::Credit, 1_000))
        .await?;

    assert_eq!(recorded.transaction.transaction_date, Local::now().date_naive());
    Ok(())
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let asha = service.create_customer("Asha", "555-0100").await?;

    let result = service.create_customer("   ", "555-0199").await;
    assert!(matches!(result, Err(AppError::InvalidCustomer(_))));

    let result = service.create_customer("Ravi", "").await;
    assert!(matches!(result, Err(AppError::InvalidCustomer(_))));

    let result = service
        .create_transaction(NewTransaction::new(asha.id, TransactionKind::Credit, 0))
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    let result = service
        .create_transaction(NewTransaction::new(99, TransactionKind::Credit, 1_000))
        .await;
    assert!(matches!(result, Err(AppError::CustomerNotFound(99))));

    assert!(service.state().transactions().is_empty());
    assert_eq!(service.state().customers().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_customer_created_elsewhere_is_picked_up() -> Result<()> {
    let (mut service, _temp) = test_service().await?;

    // Another client adds a customer behind our back
    let remote = service
        .backend()
        .create_customer(&NewCustomer::new("Meena", "555-0300"))
        .await?;
    assert!(service.state().customer(remote.id).is_none());

    let recorded = service
        .create_transaction(NewTransaction::new(remote.id, TransactionKind::Credit, 2_500))
        .await?;

    assert_eq!(recorded.customer.name, "Meena");
    assert_eq!(recorded.customer.balance(), 2_500);
    Ok(())
}

#[tokio::test]
async fn test_failed_write_leaves_state_unchanged() -> Result<()> {
    let (repo, _temp) = test_repository().await?;
    let mut service = LedgerService::connect(FlakyBackend::new(repo)).await?;

    let asha = service.create_customer("Asha", "555-0100").await?;
    service
        .create_transaction(NewTransaction::new(asha.id, TransactionKind::Credit, 50_000))
        .await?;

    service.backend().set_fail_writes(true);
    let result = service
        .create_transaction(NewTransaction::new(asha.id, TransactionKind::Debit, 20_000))
        .await;

    assert!(matches!(result, Err(AppError::Backend(_))));
    assert_eq!(service.state().transactions().len(), 1);
    assert_eq!(service.customer(asha.id)?.balance(), 50_000);

    let result = service.create_customer("Ravi", "555-0101").await;
    assert!(matches!(result, Err(AppError::Backend(_))));
    assert_eq!(service.state().customers().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_state() -> Result<()> {
    let (repo, _temp) = test_repository().await?;
    let mut service = LedgerService::connect(FlakyBackend::new(repo)).await?;
    let asha = service.create_customer("Asha", "555-0100").await?;

    service.backend().set_fail_reads(true);
    assert!(service.refresh().await.is_err());

    assert_eq!(service.state().customers().len(), 1);
    assert_eq!(service.customer(asha.id)?.name, "Asha");
    Ok(())
}

#[tokio::test]
async fn test_failed_refresh_after_write_keeps_local_aggregates() -> Result<()> {
    let (repo, _temp) = test_repository().await?;
    let mut service = LedgerService::connect(FlakyBackend::new(repo)).await?;
    let asha = service.create_customer("Asha", "555-0100").await?;
    service
        .create_transaction(NewTransaction::new(asha.id, TransactionKind::Credit, 50_000))
        .await?;

    // The write lands but the follow-up read does not
    service.backend().set_fail_reads(true);
    let recorded = service
        .create_transaction(NewTransaction::new(asha.id, TransactionKind::Debit, 20_000))
        .await?;

    assert_eq!(recorded.customer.total_credit(), 50_000);
    assert_eq!(recorded.customer.total_debit(), 20_000);
    assert_eq!(recorded.customer.balance(), 30_000);
    assert_eq!(service.state().transactions().len(), 2);

    service.backend().set_fail_reads(false);
    service.refresh().await?;
    assert_eq!(service.customer(asha.id)?.balance(), 30_000);

    Ok(())
}

#[tokio::test]
async fn test_stale_backend_totals_are_reconciled() -> Result<()> {
    let backend = StaleBackend::with_data(
        vec![customer_record(1, "Asha", 0, 0, 0)],
        vec![make_transaction(1, 1, TransactionKind::Credit, 50_000, "2024-01-01")],
    );
    let mut service = LedgerService::connect(backend).await?;

    // The log wins over the reported totals
    assert_eq!(service.customer(1)?.balance(), 50_000);

    let report = service.check_integrity().await?;
    assert!(!report.is_ok());
    assert_eq!(report.customers_checked, 1);
    assert_eq!(report.transactions_checked, 1);
    assert!(matches!(
        report.problems.as_slice(),
        [LedgerError::Drift { customer_id: 1, .. }]
    ));

    let recorded = service
        .create_transaction(NewTransaction::new(1, TransactionKind::Debit, 20_000))
        .await?;
    assert_eq!(recorded.customer.balance(), 30_000);
    assert_eq!(service.customer(1)?.total_debit(), 20_000);

    Ok(())
}

#[tokio::test]
async fn test_inconsistent_stored_totals_are_reported_per_customer() -> Result<()> {
    let (repo, db_url, _temp) = test_repository_with_url().await?;
    let mut service = LedgerService::connect(repo).await?;
    let asha = service.create_customer("Asha", "555-0100").await?;
    let ravi = service.create_customer("Ravi", "555-0101").await?;
    service
        .create_transaction(NewTransaction::new(asha.id, TransactionKind::Credit, 50_000))
        .await?;

    // Someone edits the stored balance by hand
    let pool = sqlx::SqlitePool::connect(&db_url).await?;
    sqlx::query("UPDATE customers SET balance_cents = 1 WHERE id = ?")
        .bind(asha.id)
        .execute(&pool)
        .await?;

    // Loading still works and the log wins
    service.refresh().await?;
    assert_eq!(service.state().customers().len(), 2);
    assert_eq!(service.customer(asha.id)?.balance(), 50_000);
    assert_eq!(service.customer(ravi.id)?.balance(), 0);

    let report = service.check_integrity().await?;
    assert_eq!(report.customers_checked, 2);
    assert!(matches!(
        report.problems.as_slice(),
        [LedgerError::InconsistentAggregates { customer_id: Some(id), balance: 1, .. }]
            if *id == asha.id
    ));

    // The check doesn't need a loaded state
    let unloaded = LedgerService::new(Repository::connect(&db_url).await?);
    let report = unloaded.check_integrity().await?;
    assert_eq!(report.problems.len(), 1);
    assert!(unloaded.state().customers().is_empty());

    // The next write recomputes the stored totals
    service
        .create_transaction(NewTransaction::new(asha.id, TransactionKind::Debit, 20_000))
        .await?;
    assert!(service.check_integrity().await?.is_ok());

    Ok(())
}

#[tokio::test]
async fn test_non_positive_logged_amount_does_not_block_loading() -> Result<()> {
    let backend = StaleBackend::with_data(
        vec![
            customer_record(1, "Asha", 0, 0, 0),
            customer_record(2, "Ravi", 5_000, 0, 5_000),
        ],
        vec![
            make_transaction(1, 1, TransactionKind::Credit, -500, "2024-01-01"),
            make_transaction(2, 2, TransactionKind::Credit, 5_000, "2024-01-02"),
        ],
    );
    let service = LedgerService::connect(backend).await?;

    assert_eq!(service.customer(1)?.balance(), 0);
    assert_eq!(service.customer(2)?.balance(), 5_000);

    let report = service.check_integrity().await?;
    assert_eq!(report.customers_checked, 2);
    assert_eq!(
        report.problems,
        vec![LedgerError::NonPositiveAmount {
            transaction_id: Some(1),
            amount: -500
        }]
    );

    Ok(())
}

#[tokio::test]
async fn test_integrity_check_passes_on_local_store() -> Result<()> {
    let (mut service, _temp) = test_service().await?;
    let asha = service.create_customer("Asha", "555-0100").await?;
    service
        .create_transaction(NewTransaction::new(asha.id, TransactionKind::Credit, 12_345))
        .await?;

    let report = service.check_integrity().await?;
    assert!(report.is_ok());
    assert_eq!(report.customers_checked, 1);
    assert_eq!(report.transactions_checked, 1);

    Ok(())
}

#[tokio::test]
async fn test_export_statement_writes_pdf() -> Result<()> {
    let (mut service, temp) = test_service().await?;
    let asha = service.create_customer("Asha Rao", "555-0100").await?;
    service
        .create_transaction(
            NewTransaction::new(asha.id, TransactionKind::Credit, 50_000)
                .with_description("Monthly groceries"),
        )
        .await?;

    let out_dir = temp.path().join("statements");
    std::fs::create_dir(&out_dir)?;
    let path = service.export_statement(asha.id, &out_dir, &RenderOptions::default())?;

    let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("Asha_Rao_transactions_"));
    assert!(file_name.ends_with(".pdf"));
    assert!(std::fs::read(&path)?.starts_with(b"%PDF-"));

    let result = service.export_statement(99, &out_dir, &RenderOptions::default());
    assert!(matches!(result, Err(AppError::CustomerNotFound(99))));

    Ok(())
}
