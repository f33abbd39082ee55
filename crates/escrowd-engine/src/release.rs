//! The release operator.
//!
//! All three trigger paths end here. Written so that calling it any number
//! of times, concurrently, from any trigger, moves the escrow exactly once:
//!
//! 1. acquire the per-transaction lock (bounded wait);
//! 2. re-read the transaction **under the lock** and short-circuit
//!    `AlreadyReleased` — this re-read is the idempotency guarantee, not the
//!    caller's stale view;
//! 3. refuse anything not COMPLETED;
//! 4. commit the unit: ledger debit/credit pair plus the released flag,
//!    inside one store closure;
//! 5. audit and notify only after the unit committed.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use escrowd_types::{
    EscrowdError, NotifyEvent, NotifyKind, ReleaseOutcome, ReleaseTrigger, Result, TxRef, TxStatus,
};

use crate::audit::AuditAction;
use crate::engine::EscrowEngine;

impl EscrowEngine {
    /// Release a transaction's escrow to the seller, exactly once.
    ///
    /// Safe to call redundantly: a release that already happened returns
    /// `Ok(AlreadyReleased)` with zero side effects on balances or the
    /// journal.
    ///
    /// # Errors
    /// - `TxNotFound` for an unknown reference.
    /// - `NotEligible` when the transaction is not COMPLETED.
    /// - `LockTimeout` when another trigger holds the lock past the
    ///   configured wait; retryable.
    /// - Ledger errors when the commit unit refuses (these indicate an
    ///   upstream bug and are never retried away).
    pub async fn release_escrow(
        &self,
        tx_ref: &TxRef,
        trigger: ReleaseTrigger,
    ) -> Result<ReleaseOutcome> {
        self.audit.record(tx_ref, trigger, AuditAction::Attempted, "");

        let lock = self.release_lock(tx_ref);
        let guard = tokio::time::timeout(self.config().lock_timeout(), lock.lock()).await;
        let Ok(_guard) = guard else {
            self.audit
                .record(tx_ref, trigger, AuditAction::Failed, "lock timeout");
            return Err(EscrowdError::LockTimeout(tx_ref.clone()));
        };

        // Authoritative re-read under the lock. A concurrent trigger that
        // won the lock first has already flipped the flag by now.
        let tx = self.transactions().get(tx_ref)?;
        if tx.escrow_released {
            self.audit
                .record(tx_ref, trigger, AuditAction::AlreadyReleased, "");
            tracing::debug!(tx_ref = %tx_ref, trigger = %trigger, "escrow already released");
            return Ok(ReleaseOutcome::AlreadyReleased);
        }
        if tx.status != TxStatus::Completed {
            self.audit.record(
                tx_ref,
                trigger,
                AuditAction::NotEligible,
                tx.status.to_string(),
            );
            return Err(EscrowdError::NotEligible { status: tx.status });
        }

        // The commit unit. The ledger refusing (insufficient escrow, bad
        // amount) aborts before the flag is touched; `mark_released` cannot
        // fail here because the flag was false under this same lock.
        let commit = self.transactions().with_mut(tx_ref, |tx| {
            self.ledger()
                .commit_release(&tx.reference, tx.buyer, tx.seller, tx.escrow_amount)?;
            tx.mark_released(Utc::now())
        });
        if let Err(e) = commit {
            self.audit
                .record(tx_ref, trigger, AuditAction::Failed, e.to_string());
            tracing::error!(tx_ref = %tx_ref, trigger = %trigger, error = %e, "escrow release failed");
            return Err(e);
        }

        self.audit.record(
            tx_ref,
            trigger,
            AuditAction::Released,
            tx.escrow_amount.to_string(),
        );
        tracing::info!(
            tx_ref = %tx_ref,
            trigger = %trigger,
            amount = %tx.escrow_amount,
            seller = %tx.seller,
            "escrow released"
        );

        // Best-effort, post-commit only.
        self.notifier
            .notify(NotifyEvent {
                user: tx.buyer,
                kind: NotifyKind::EscrowReleased,
                tx_ref: tx_ref.clone(),
                amount: tx.escrow_amount,
            })
            .await;
        self.notifier
            .notify(NotifyEvent {
                user: tx.seller,
                kind: NotifyKind::PaymentReceived,
                tx_ref: tx_ref.clone(),
                amount: tx.escrow_amount,
            })
            .await;

        Ok(ReleaseOutcome::Released)
    }

    /// [`Self::release_escrow`] with bounded retries on transient errors.
    ///
    /// Only errors classified retryable (lock timeouts) are retried;
    /// eligibility and ledger refusals surface immediately.
    ///
    /// # Errors
    /// The final attempt's error.
    pub async fn release_with_retry(
        &self,
        tx_ref: &TxRef,
        trigger: ReleaseTrigger,
    ) -> Result<ReleaseOutcome> {
        let mut attempt = 1u32;
        loop {
            match self.release_escrow(tx_ref, trigger).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < self.config().release_retry_attempts => {
                    tracing::warn!(
                        tx_ref = %tx_ref,
                        trigger = %trigger,
                        attempt,
                        error = %e,
                        "release attempt failed; retrying"
                    );
                    tokio::time::sleep(self.config().release_retry_backoff()).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn release_lock(&self, tx_ref: &TxRef) -> Arc<Mutex<()>> {
        self.locks
            .entry(tx_ref.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use escrowd_types::{EngineConfig, UserId};

    use super::*;

    /// A COMPLETED, funded, unreleased transaction — release-eligible
    /// without the hook having fired.
    async fn eligible_tx(engine: &EscrowEngine) -> TxRef {
        let buyer = UserId::new();
        engine.ledger().deposit(buyer, Decimal::new(10000, 2));
        let tx_ref = engine
            .create_transaction(buyer, UserId::new(), Decimal::new(10000, 2))
            .unwrap();
        engine
            .transition(&tx_ref, TxStatus::PaymentReceived)
            .await
            .unwrap();
        engine
            .transition(&tx_ref, TxStatus::ServiceProvided)
            .await
            .unwrap();
        engine.transition(&tx_ref, TxStatus::Verifying).await.unwrap();
        engine
            .transactions()
            .force_status(&tx_ref, TxStatus::Completed)
            .unwrap();
        tx_ref
    }

    #[tokio::test]
    async fn lock_timeout_when_lock_is_held() {
        let config = EngineConfig {
            lock_timeout_ms: 10,
            ..EngineConfig::default()
        };
        let engine = EscrowEngine::new(config);
        let tx_ref = eligible_tx(&engine).await;

        let lock = engine
            .locks
            .entry(tx_ref.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let _held = lock.lock().await;

        let err = engine
            .release_escrow(&tx_ref, ReleaseTrigger::Manual)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowdError::LockTimeout(_)));
        assert!(err.is_retryable());
        assert!(!engine.transactions().get(&tx_ref).unwrap().escrow_released);
    }

    #[tokio::test]
    async fn retry_succeeds_after_lock_frees() {
        let config = EngineConfig {
            lock_timeout_ms: 10,
            release_retry_attempts: 5,
            release_retry_backoff_ms: 20,
            ..EngineConfig::default()
        };
        let engine = Arc::new(EscrowEngine::new(config));
        let tx_ref = eligible_tx(&engine).await;

        let lock = engine
            .locks
            .entry(tx_ref.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let held = lock.lock_owned().await;
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            drop(held);
        });

        let outcome = engine
            .release_with_retry(&tx_ref, ReleaseTrigger::Sweep)
            .await
            .unwrap();
        assert_eq!(outcome, ReleaseOutcome::Released);
    }

    #[tokio::test]
    async fn retry_never_masks_eligibility_errors() {
        let engine = EscrowEngine::new(EngineConfig::default());
        let buyer = UserId::new();
        engine.ledger().deposit(buyer, Decimal::ONE);
        let tx_ref = engine
            .create_transaction(buyer, UserId::new(), Decimal::ONE)
            .unwrap();

        let err = engine
            .release_with_retry(&tx_ref, ReleaseTrigger::Manual)
            .await
            .unwrap_err();
        assert!(matches!(err, EscrowdError::NotEligible { .. }));
        // one attempt, no retries
        assert_eq!(engine.audit().count(AuditAction::Attempted), 1);
    }
}
