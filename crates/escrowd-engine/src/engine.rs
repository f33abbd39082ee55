//! # EscrowEngine — the release guarantee core
//!
//! One engine instance owns the transaction store, the ledger, the release
//! lock table, and the audit log. Three redundant trigger paths converge on
//! the same release operator:
//!
//! ```text
//!   transition(.., COMPLETED) ──▶ on-write hook ──┐
//!   run_sweep()  (deadline + safety-net passes) ──┼──▶ release_escrow()
//!   remediate()  (operator command)             ──┘      (idempotent)
//! ```
//!
//! Any one path is sufficient; any subset may fire for the same transaction
//! in any order and the funds still move exactly once.

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use escrowd_ledger::LedgerStore;
use escrowd_types::{
    EngineConfig, EscrowTransaction, EscrowdError, ReleaseOutcome, ReleaseTrigger, Result, TxRef,
    TxStatus, UserId,
};

use crate::audit::AuditLog;
use crate::notify::{NoopNotifier, Notifier};
use crate::tx_store::TxStore;

/// The escrow release engine. Cheap to share behind an [`Arc`]; every
/// method takes `&self`.
pub struct EscrowEngine {
    config: EngineConfig,
    ledger: LedgerStore,
    txs: TxStore,
    /// Per-transaction release locks, created lazily on first release
    /// attempt. Serializes concurrent triggers for one reference without
    /// blocking releases of unrelated transactions.
    pub(crate) locks: DashMap<TxRef, Arc<Mutex<()>>>,
    /// Held for the whole of a sweep run; `try_lock` failure is how an
    /// overlapping run detects it should skip.
    pub(crate) sweep_gate: Mutex<()>,
    pub(crate) audit: AuditLog,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl EscrowEngine {
    /// Engine with the given config and no notification transport.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_notifier(config, Arc::new(NoopNotifier))
    }

    /// Engine with a notification transport wired in.
    #[must_use]
    pub fn with_notifier(config: EngineConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            ledger: LedgerStore::new(),
            txs: TxStore::new(),
            locks: DashMap::new(),
            sweep_gate: Mutex::new(()),
            audit: AuditLog::new(),
            notifier,
        }
    }

    // =================================================================
    // Transaction lifecycle
    // =================================================================

    /// Create a new escrow transaction in CREATED status. No funds move
    /// until the transition to PAYMENT_RECEIVED.
    ///
    /// # Errors
    /// Returns `InvalidTransaction` for a non-positive amount or a
    /// self-trade, `DuplicateTx` on a reference collision.
    pub fn create_transaction(
        &self,
        buyer: UserId,
        seller: UserId,
        amount: Decimal,
    ) -> Result<TxRef> {
        let tx = EscrowTransaction::new(buyer, seller, amount)?;
        let tx_ref = tx.reference.clone();
        self.txs.insert(tx)?;
        tracing::info!(tx_ref = %tx_ref, %buyer, %seller, %amount, "transaction created");
        Ok(tx_ref)
    }

    /// The single entry point for status changes.
    ///
    /// Moving to PAYMENT_RECEIVED locks the buyer's funds into escrow inside
    /// the same store closure as the status write; if funding fails the
    /// status does not change.
    ///
    /// A transition to COMPLETED commits the status first and then fires the
    /// on-write release hook. A hook failure surfaces as this method's error
    /// but never rolls the status back — the transaction stays COMPLETED and
    /// unreleased, where the sweep's safety net will find it.
    ///
    /// # Errors
    /// Returns `TxNotFound`, `InvalidTransition`, ledger errors when funding
    /// escrow, or the release hook's error.
    pub async fn transition(&self, tx_ref: &TxRef, target: TxStatus) -> Result<()> {
        self.apply_status(tx_ref, target)?;
        if target == TxStatus::Completed {
            self.release_with_retry(tx_ref, ReleaseTrigger::StatusHook)
                .await?;
        }
        Ok(())
    }

    /// Validate and persist a status change without firing the release hook.
    /// Shared by [`Self::transition`] and the sweep's deadline pass (which
    /// releases under its own trigger tag).
    pub(crate) fn apply_status(&self, tx_ref: &TxRef, target: TxStatus) -> Result<()> {
        let window = self.config.auto_release_window();
        self.txs.with_mut(tx_ref, |tx| {
            if !tx.status.can_transition_to(target) {
                return Err(EscrowdError::InvalidTransition {
                    from: tx.status,
                    to: target,
                });
            }
            // Funding before the status write keeps the pair all-or-nothing:
            // a ledger refusal leaves the transaction untouched.
            if target == TxStatus::PaymentReceived {
                self.ledger
                    .fund_escrow(&tx.reference, tx.buyer, tx.escrow_amount)?;
            }
            tx.transition(target, window)
        })?;
        tracing::info!(tx_ref = %tx_ref, status = %target, "status transition");
        Ok(())
    }

    /// Operator remediation: force a release attempt for one transaction.
    ///
    /// Goes through the same operator as every other trigger, so running it
    /// against an already-released transaction is a reported no-op.
    ///
    /// # Errors
    /// Same surface as [`Self::release_escrow`].
    pub async fn remediate(&self, tx_ref: &TxRef) -> Result<ReleaseOutcome> {
        tracing::info!(tx_ref = %tx_ref, "manual remediation requested");
        self.release_escrow(tx_ref, ReleaseTrigger::Manual).await
    }

    // =================================================================
    // Accessors
    // =================================================================

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    #[must_use]
    pub fn transactions(&self) -> &TxStore {
        &self.txs
    }

    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }
}

impl std::fmt::Debug for EscrowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowEngine")
            .field("transactions", &self.txs.len())
            .field("ledger_entries", &self.ledger.entry_count())
            .field("audit_records", &self.audit.len())
            .finish_non_exhaustive()
    }
}
