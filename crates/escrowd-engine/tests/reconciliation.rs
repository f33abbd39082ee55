//! Read-only reconciliation: wallet balances against the transaction set,
//! and per-transaction anomaly scans. Nothing here mutates state.

use std::sync::Arc;

use rust_decimal::Decimal;

use escrowd_engine::EscrowEngine;
use escrowd_types::{EngineConfig, EscrowdError, TxRef, TxStatus, UserId};

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn engine_with_funded_buyer() -> (Arc<EscrowEngine>, UserId, UserId) {
    let engine = Arc::new(EscrowEngine::new(EngineConfig::default()));
    let buyer = UserId::new();
    let seller = UserId::new();
    engine.ledger().deposit(buyer, money(25_000));
    (engine, buyer, seller)
}

async fn advance(engine: &EscrowEngine, tx_ref: &TxRef, statuses: &[TxStatus]) {
    for status in statuses {
        engine.transition(tx_ref, *status).await.unwrap();
    }
}

#[tokio::test]
async fn funded_wallet_reconciles_mid_trade() {
    let (engine, buyer, seller) = engine_with_funded_buyer();
    let tx_ref = engine.create_transaction(buyer, seller, money(10_000)).unwrap();
    advance(&engine, &tx_ref, &[TxStatus::PaymentReceived]).await;

    let report = engine.diagnose_wallet(buyer);
    assert!(report.balanced());
    assert_eq!(report.balance.escrow, money(10_000));
    assert_eq!(report.expected_escrow, money(10_000));
    assert_eq!(report.discrepancy, Decimal::ZERO);
    assert_eq!(report.transactions.len(), 1);
    assert!(report.transactions[0].holding);
    assert!(!report.transactions[0].overdue);
}

#[tokio::test]
async fn released_wallet_reconciles_at_zero() {
    let (engine, buyer, seller) = engine_with_funded_buyer();
    let tx_ref = engine.create_transaction(buyer, seller, money(10_000)).unwrap();
    advance(
        &engine,
        &tx_ref,
        &[
            TxStatus::PaymentReceived,
            TxStatus::ServiceProvided,
            TxStatus::Verifying,
            TxStatus::Completed,
        ],
    )
    .await;

    let report = engine.diagnose_wallet(buyer);
    assert!(report.balanced());
    assert_eq!(report.balance.escrow, Decimal::ZERO);
    assert_eq!(report.expected_escrow, Decimal::ZERO);
    assert_eq!(report.total_released, money(10_000));
    assert!(!report.transactions[0].holding);
    assert!(report.transactions[0].escrow_released);
}

#[tokio::test]
async fn forced_rollback_shows_as_discrepancy() {
    let (engine, buyer, seller) = engine_with_funded_buyer();
    let tx_ref = engine.create_transaction(buyer, seller, money(10_000)).unwrap();
    advance(&engine, &tx_ref, &[TxStatus::PaymentReceived]).await;

    // A direct write drags the status back while the funds stay locked:
    // stored escrow now has no transaction claiming it.
    engine
        .transactions()
        .force_status(&tx_ref, TxStatus::Created)
        .unwrap();

    let report = engine.diagnose_wallet(buyer);
    assert!(!report.balanced());
    assert_eq!(report.balance.escrow, money(10_000));
    assert_eq!(report.expected_escrow, Decimal::ZERO);
    assert_eq!(report.discrepancy, money(10_000));
}

#[tokio::test]
async fn disputed_funds_stay_held_and_reconcile() {
    let (engine, buyer, seller) = engine_with_funded_buyer();
    let tx_ref = engine.create_transaction(buyer, seller, money(10_000)).unwrap();
    advance(
        &engine,
        &tx_ref,
        &[
            TxStatus::PaymentReceived,
            TxStatus::ServiceProvided,
            TxStatus::Verifying,
            TxStatus::Disputed,
        ],
    )
    .await;

    let report = engine.diagnose_wallet(buyer);
    assert!(report.balanced());
    assert_eq!(report.expected_escrow, money(10_000));
    assert!(report.transactions[0].holding);

    // Disputes freeze the release path entirely.
    let err = engine.remediate(&tx_ref).await.unwrap_err();
    assert!(matches!(err, EscrowdError::NotEligible { .. }));
    assert_eq!(engine.ledger().balance(buyer).escrow, money(10_000));
}

#[tokio::test]
async fn overdue_verifying_is_flagged() {
    let engine = Arc::new(EscrowEngine::new(EngineConfig {
        auto_release_window_secs: 0,
        ..EngineConfig::default()
    }));
    let buyer = UserId::new();
    engine.ledger().deposit(buyer, money(10_000));
    let tx_ref = engine
        .create_transaction(buyer, UserId::new(), money(10_000))
        .unwrap();
    advance(
        &engine,
        &tx_ref,
        &[
            TxStatus::PaymentReceived,
            TxStatus::ServiceProvided,
            TxStatus::Verifying,
        ],
    )
    .await;

    let report = engine.diagnose_wallet(buyer);
    assert!(report.transactions[0].overdue);
    assert!(report.balanced(), "overdue is stuck, not misaccounted");
}

#[tokio::test]
async fn transaction_report_clean_after_release() {
    let (engine, buyer, seller) = engine_with_funded_buyer();
    let tx_ref = engine.create_transaction(buyer, seller, money(10_000)).unwrap();
    advance(
        &engine,
        &tx_ref,
        &[
            TxStatus::PaymentReceived,
            TxStatus::ServiceProvided,
            TxStatus::Verifying,
            TxStatus::Completed,
        ],
    )
    .await;

    let report = engine.diagnose_transaction(&tx_ref).unwrap();
    assert!(report.is_clean(), "anomalies: {:?}", report.anomalies);
    assert_eq!(report.entries.len(), 3); // hold + debit + credit
}

#[tokio::test]
async fn transaction_report_flags_completed_unreleased() {
    let (engine, buyer, seller) = engine_with_funded_buyer();
    let tx_ref = engine.create_transaction(buyer, seller, money(10_000)).unwrap();
    advance(
        &engine,
        &tx_ref,
        &[
            TxStatus::PaymentReceived,
            TxStatus::ServiceProvided,
            TxStatus::Verifying,
        ],
    )
    .await;
    engine
        .transactions()
        .force_status(&tx_ref, TxStatus::Completed)
        .unwrap();

    let report = engine.diagnose_transaction(&tx_ref).unwrap();
    assert!(!report.is_clean());
    assert!(report.anomalies[0].contains("not yet released"));
    assert_eq!(engine.unreleased_completed(), vec![tx_ref.clone()]);

    // The sweep clears the finding; diagnostics itself never repairs.
    engine.run_sweep().await.unwrap();
    assert!(engine.diagnose_transaction(&tx_ref).unwrap().is_clean());
    assert!(engine.unreleased_completed().is_empty());
}

#[tokio::test]
async fn released_not_completed_scan() {
    let (engine, buyer, seller) = engine_with_funded_buyer();
    let tx_ref = engine.create_transaction(buyer, seller, money(10_000)).unwrap();
    advance(
        &engine,
        &tx_ref,
        &[
            TxStatus::PaymentReceived,
            TxStatus::ServiceProvided,
            TxStatus::Verifying,
            TxStatus::Completed,
        ],
    )
    .await;
    assert!(engine.released_not_completed().is_empty());

    // A direct write pulls a released record out of COMPLETED.
    engine
        .transactions()
        .force_status(&tx_ref, TxStatus::Verifying)
        .unwrap();
    assert_eq!(engine.released_not_completed(), vec![tx_ref.clone()]);

    let report = engine.diagnose_transaction(&tx_ref).unwrap();
    assert!(report
        .anomalies
        .iter()
        .any(|a| a.contains("not COMPLETED")));
}

#[tokio::test]
async fn diagnose_unknown_transaction() {
    let engine = EscrowEngine::new(EngineConfig::default());
    let err = engine
        .diagnose_transaction(&TxRef::generate("P2P"))
        .unwrap_err();
    assert!(matches!(err, EscrowdError::TxNotFound(_)));
}

#[tokio::test]
async fn empty_wallet_reconciles() {
    let engine = EscrowEngine::new(EngineConfig::default());
    let report = engine.diagnose_wallet(UserId::new());
    assert!(report.balanced());
    assert_eq!(report.expected_escrow, Decimal::ZERO);
    assert!(report.transactions.is_empty());
}
