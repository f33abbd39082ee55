//! Read-only reconciliation and diagnostics.
//!
//! Answers "does the money add up?" without mutating anything: stored wallet
//! escrow versus the escrow implied by the transaction set, plus anomaly
//! scans for the states the release guarantee exists to prevent. Repairing
//! what these reports find is [`EscrowEngine::remediate`]'s job, never this
//! module's.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use escrowd_types::{
    EntryKind, EscrowTransaction, LedgerEntry, Result, TxRef, TxStatus, UserId, WalletBalance,
    constants,
};

use crate::engine::EscrowEngine;

fn tolerance() -> Decimal {
    Decimal::new(constants::RECON_TOLERANCE_CENTS, constants::FIAT_SCALE)
}

/// One transaction's line in a wallet report.
#[derive(Debug, Clone, Serialize)]
pub struct TxLine {
    pub tx_ref: TxRef,
    pub status: TxStatus,
    pub escrow_amount: Decimal,
    pub escrow_released: bool,
    /// Whether this transaction should currently be holding escrow.
    pub holding: bool,
    /// VERIFYING past its auto-release deadline: stuck, and the next sweep's
    /// business.
    pub overdue: bool,
}

/// Reconciliation of one wallet's stored escrow against its transactions.
#[derive(Debug, Clone, Serialize)]
pub struct WalletReport {
    pub user: UserId,
    pub balance: WalletBalance,
    /// Escrow implied by the user's buy-side transactions that should be
    /// holding funds.
    pub expected_escrow: Decimal,
    /// `balance.escrow - expected_escrow`. Positive means funds are stuck in
    /// escrow with no transaction claiming them.
    pub discrepancy: Decimal,
    /// Total escrow ever debited out of this wallet, per the journal.
    pub total_released: Decimal,
    pub transactions: Vec<TxLine>,
}

impl WalletReport {
    /// Whether stored and expected escrow agree within tolerance.
    #[must_use]
    pub fn balanced(&self) -> bool {
        self.discrepancy.abs() <= tolerance()
    }
}

/// Deep-dive on one transaction: its record, its ledger trail, and any
/// inconsistencies between them.
#[derive(Debug, Clone, Serialize)]
pub struct TxReport {
    pub transaction: EscrowTransaction,
    pub entries: Vec<LedgerEntry>,
    /// Human-readable inconsistencies. Empty means the record and the
    /// journal tell the same story.
    pub anomalies: Vec<String>,
}

impl TxReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

impl EscrowEngine {
    /// Reconcile one wallet. Strictly read-only.
    #[must_use]
    pub fn diagnose_wallet(&self, user: UserId) -> WalletReport {
        let now = Utc::now();
        let balance = self.ledger().balance(user);
        let txs = self.transactions().for_buyer(user);

        let mut expected_escrow = Decimal::ZERO;
        let mut lines = Vec::with_capacity(txs.len());
        for tx in &txs {
            let holding = tx.holds_escrow();
            if holding {
                expected_escrow += tx.escrow_amount;
            }
            lines.push(TxLine {
                tx_ref: tx.reference.clone(),
                status: tx.status,
                escrow_amount: tx.escrow_amount,
                escrow_released: tx.escrow_released,
                holding,
                overdue: tx.status == TxStatus::Verifying && tx.deadline_elapsed(now),
            });
        }

        let report = WalletReport {
            user,
            discrepancy: balance.escrow - expected_escrow,
            total_released: self.ledger().escrow_outflow(user),
            balance,
            expected_escrow,
            transactions: lines,
        };
        if !report.balanced() {
            tracing::warn!(
                %user,
                stored = %report.balance.escrow,
                expected = %report.expected_escrow,
                discrepancy = %report.discrepancy,
                "wallet escrow discrepancy"
            );
        }
        report
    }

    /// Deep-dive one transaction against its ledger trail. Strictly
    /// read-only.
    ///
    /// # Errors
    /// Returns `TxNotFound` for an unknown reference.
    pub fn diagnose_transaction(&self, tx_ref: &TxRef) -> Result<TxReport> {
        let transaction = self.transactions().get(tx_ref)?;
        let entries = self.ledger().entries_for_tx(tx_ref);
        let mut anomalies = Vec::new();

        if transaction.escrow_released && transaction.status != TxStatus::Completed {
            anomalies.push(format!(
                "escrow released but status is {}, not COMPLETED",
                transaction.status
            ));
        }
        if transaction.is_release_eligible() {
            anomalies.push("COMPLETED but escrow not yet released".to_string());
        }
        let has_hold = entries.iter().any(|e| e.kind == EntryKind::EscrowHold);
        let has_debit = entries.iter().any(|e| e.kind == EntryKind::EscrowDebit);
        let has_credit = entries.iter().any(|e| e.kind == EntryKind::EscrowCredit);
        if transaction.holds_escrow() && !has_hold {
            anomalies.push("holding status but no hold entry in the journal".to_string());
        }
        if transaction.escrow_released && !(has_debit && has_credit) {
            anomalies
                .push("marked released but the journal has no debit/credit pair".to_string());
        }
        if !transaction.escrow_released && (has_debit || has_credit) {
            anomalies
                .push("journal shows a release movement but the flag is unset".to_string());
        }

        Ok(TxReport {
            transaction,
            entries,
            anomalies,
        })
    }

    /// References of transactions stuck COMPLETED without a release — what
    /// the next sweep's safety net will act on.
    #[must_use]
    pub fn unreleased_completed(&self) -> Vec<TxRef> {
        self.transactions().completed_unreleased()
    }

    /// References where the released flag is set on a non-COMPLETED record.
    /// Should always be empty; anything here was written outside the engine.
    #[must_use]
    pub fn released_not_completed(&self) -> Vec<TxRef> {
        self.transactions()
            .all()
            .into_iter()
            .filter(|tx| tx.escrow_released && tx.status != TxStatus::Completed)
            .map(|tx| tx.reference)
            .collect()
    }
}
