//! In-memory transaction store keyed by reference.
//!
//! One canonical record per [`TxRef`]. Reads hand out clones; every mutation
//! funnels through [`TxStore::with_mut`] under the store's write lock, so a
//! caller closure observes and updates the record atomically with respect to
//! other store users. The per-transaction *release* serialization lives a
//! level up, in the engine's lock table — this store only guarantees that no
//! two closures interleave on the same map.
//!
//! [`TxStore::force_status`] deliberately skips the state machine. It exists
//! for operator remediation of records damaged by out-of-band writes, and is
//! exactly the kind of write the safety-net sweep pass exists to catch.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use escrowd_types::{EscrowTransaction, EscrowdError, Result, TxRef, TxStatus, UserId};

/// Thread-safe map of all known escrow transactions.
#[derive(Debug, Default)]
pub struct TxStore {
    txs: RwLock<HashMap<TxRef, EscrowTransaction>>,
}

impl TxStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            txs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new transaction.
    ///
    /// # Errors
    /// Returns `DuplicateTx` if the reference is already present.
    pub fn insert(&self, tx: EscrowTransaction) -> Result<()> {
        let mut txs = self.txs.write().expect("tx store lock poisoned");
        if txs.contains_key(&tx.reference) {
            return Err(EscrowdError::DuplicateTx(tx.reference));
        }
        txs.insert(tx.reference.clone(), tx);
        Ok(())
    }

    /// Fetch a snapshot of one transaction.
    ///
    /// # Errors
    /// Returns `TxNotFound` if the reference is unknown.
    pub fn get(&self, tx_ref: &TxRef) -> Result<EscrowTransaction> {
        self.txs
            .read()
            .expect("tx store lock poisoned")
            .get(tx_ref)
            .cloned()
            .ok_or_else(|| EscrowdError::TxNotFound(tx_ref.clone()))
    }

    /// Run a mutating closure against one transaction under the write lock.
    ///
    /// The closure's `Err` propagates and leaves whatever partial mutation it
    /// made — callers that need all-or-nothing must order their own steps
    /// validate-first, the way the release operator does.
    ///
    /// # Errors
    /// Returns `TxNotFound` if the reference is unknown, otherwise whatever
    /// the closure returns.
    pub fn with_mut<T>(
        &self,
        tx_ref: &TxRef,
        f: impl FnOnce(&mut EscrowTransaction) -> Result<T>,
    ) -> Result<T> {
        let mut txs = self.txs.write().expect("tx store lock poisoned");
        let tx = txs
            .get_mut(tx_ref)
            .ok_or_else(|| EscrowdError::TxNotFound(tx_ref.clone()))?;
        f(tx)
    }

    /// Overwrite a transaction's status without consulting the state machine.
    ///
    /// This models a direct datastore write (operator tooling, migration
    /// script) and breaks the hook guarantee on purpose: no release fires.
    /// The sweep's safety-net pass is the backstop for records written this
    /// way.
    ///
    /// # Errors
    /// Returns `TxNotFound` if the reference is unknown.
    pub fn force_status(&self, tx_ref: &TxRef, status: TxStatus) -> Result<()> {
        self.with_mut(tx_ref, |tx| {
            tracing::warn!(
                tx_ref = %tx.reference,
                from = %tx.status,
                to = %status,
                "forcing status outside the state machine"
            );
            tx.status = status;
            tx.updated_at = Utc::now();
            if status == TxStatus::Completed && tx.completed_at.is_none() {
                tx.completed_at = Some(tx.updated_at);
            }
            Ok(())
        })
    }

    /// Snapshot of every transaction, in no particular order.
    #[must_use]
    pub fn all(&self) -> Vec<EscrowTransaction> {
        self.txs
            .read()
            .expect("tx store lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// References of VERIFYING transactions whose auto-release deadline has
    /// passed as of `now`. Sweep pass one's work list.
    #[must_use]
    pub fn overdue_verifying(&self, now: DateTime<Utc>) -> Vec<TxRef> {
        self.txs
            .read()
            .expect("tx store lock poisoned")
            .values()
            .filter(|tx| tx.status == TxStatus::Verifying && tx.deadline_elapsed(now))
            .map(|tx| tx.reference.clone())
            .collect()
    }

    /// References of COMPLETED transactions whose escrow has not been
    /// released. Sweep pass two's (safety net) work list; in a healthy
    /// system this is empty between a completion and its hook firing.
    #[must_use]
    pub fn completed_unreleased(&self) -> Vec<TxRef> {
        self.txs
            .read()
            .expect("tx store lock poisoned")
            .values()
            .filter(|tx| tx.is_release_eligible())
            .map(|tx| tx.reference.clone())
            .collect()
    }

    /// All transactions where `user` is the buyer. Reconciliation input.
    #[must_use]
    pub fn for_buyer(&self, user: UserId) -> Vec<EscrowTransaction> {
        self.txs
            .read()
            .expect("tx store lock poisoned")
            .values()
            .filter(|tx| tx.buyer == user)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.txs.read().expect("tx store lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
