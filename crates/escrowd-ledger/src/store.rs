//! The ledger store — wallets plus journal behind one interior lock.
//!
//! Holding both under a single lock is what makes the release commit an
//! atomic unit: `commit_release` validates everything before touching
//! anything, so a violation leaves zero partial effect, and no reader ever
//! observes the debit without the credit.

use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;

use escrowd_types::{
    EntryKind, EscrowdError, LedgerEntry, Result, TxRef, UserId, WalletBalance,
};

use crate::journal::Journal;

struct Inner {
    wallets: HashMap<UserId, WalletBalance>,
    journal: Journal,
}

/// Source of truth for wallet balances and the append-only movement record.
///
/// Escrow only ever leaves a wallet through [`LedgerStore::commit_release`],
/// and only ever enters one through [`LedgerStore::fund_escrow`]. Everything
/// else is deposits and reads.
pub struct LedgerStore {
    inner: RwLock<Inner>,
}

impl LedgerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                wallets: HashMap::new(),
                journal: Journal::new(),
            }),
        }
    }

    /// Deposit fiat (increases available). Creates the wallet on first touch.
    pub fn deposit(&self, user: UserId, amount: Decimal) {
        let mut inner = self.inner.write().expect("ledger lock poisoned");
        inner.wallets.entry(user).or_default().available += amount;
    }

    /// Deposit crypto. Creates the wallet on first touch.
    pub fn deposit_crypto(&self, user: UserId, amount: Decimal) {
        let mut inner = self.inner.write().expect("ledger lock poisoned");
        inner.wallets.entry(user).or_default().available_crypto += amount;
    }

    /// Lock buyer funds into escrow when payment is received
    /// (available → escrow), writing an `EscrowHold` entry.
    ///
    /// # Errors
    /// - `WalletNotFound` if the buyer has no wallet
    /// - `LedgerInvariantViolation` if `amount <= 0`
    /// - `InsufficientAvailable` if available < amount
    ///
    /// On any error nothing has moved and nothing was journaled.
    pub fn fund_escrow(&self, tx_ref: &TxRef, buyer: UserId, amount: Decimal) -> Result<LedgerEntry> {
        if amount <= Decimal::ZERO {
            return Err(EscrowdError::LedgerInvariantViolation {
                reason: format!("escrow hold amount must be > 0, got {amount} for {tx_ref}"),
            });
        }

        let mut inner = self.inner.write().expect("ledger lock poisoned");
        let wallet = inner
            .wallets
            .get_mut(&buyer)
            .ok_or(EscrowdError::WalletNotFound(buyer))?;

        if wallet.available < amount {
            return Err(EscrowdError::InsufficientAvailable {
                needed: amount,
                available: wallet.available,
            });
        }

        wallet.available -= amount;
        wallet.escrow += amount;

        let entry = LedgerEntry::record(tx_ref.clone(), buyer, EntryKind::EscrowHold, amount);
        inner.journal.append(entry.clone());
        Ok(entry)
    }

    /// The release unit: debit buyer escrow, credit seller available, and
    /// journal the pair — atomically, or not at all.
    ///
    /// Only the release operator calls this, under its per-transaction
    /// lock, after its own eligibility and idempotency checks.
    ///
    /// # Errors
    /// - `LedgerInvariantViolation` if `amount <= 0`, or the debit would
    ///   drive the buyer's escrow balance negative (signals double-funding
    ///   or a corrupted escrow amount — operator investigation, not retry)
    /// - `WalletNotFound` if the buyer has no wallet
    ///
    /// On any error the unit has zero effect: validation completes before
    /// the first mutation.
    pub fn commit_release(
        &self,
        tx_ref: &TxRef,
        buyer: UserId,
        seller: UserId,
        amount: Decimal,
    ) -> Result<(LedgerEntry, LedgerEntry)> {
        if amount <= Decimal::ZERO {
            return Err(EscrowdError::LedgerInvariantViolation {
                reason: format!("release amount must be > 0, got {amount} for {tx_ref}"),
            });
        }

        let mut inner = self.inner.write().expect("ledger lock poisoned");

        let wallet = inner
            .wallets
            .get_mut(&buyer)
            .ok_or(EscrowdError::WalletNotFound(buyer))?;
        if wallet.escrow < amount {
            return Err(EscrowdError::LedgerInvariantViolation {
                reason: format!(
                    "escrow debit for {tx_ref} would go negative: escrow {escrow}, required {amount}",
                    escrow = wallet.escrow,
                ),
            });
        }

        // Validation done; from here the unit cannot fail.
        wallet.escrow -= amount;
        inner.wallets.entry(seller).or_default().available += amount;

        let debit = LedgerEntry::record(tx_ref.clone(), buyer, EntryKind::EscrowDebit, -amount);
        let credit = LedgerEntry::record(tx_ref.clone(), seller, EntryKind::EscrowCredit, amount);
        inner.journal.append(debit.clone());
        inner.journal.append(credit.clone());

        tracing::debug!(
            tx_ref = %tx_ref,
            %buyer,
            %seller,
            %amount,
            "ledger release unit committed"
        );

        Ok((debit, credit))
    }

    /// Current balance for a user. Zero if no wallet exists yet.
    #[must_use]
    pub fn balance(&self, user: UserId) -> WalletBalance {
        self.inner
            .read()
            .expect("ledger lock poisoned")
            .wallets
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }

    /// All journal entries caused by a transaction.
    #[must_use]
    pub fn entries_for_tx(&self, tx_ref: &TxRef) -> Vec<LedgerEntry> {
        self.inner
            .read()
            .expect("ledger lock poisoned")
            .journal
            .for_tx(tx_ref)
    }

    /// All journal entries affecting a wallet.
    #[must_use]
    pub fn entries_for_wallet(&self, user: UserId) -> Vec<LedgerEntry> {
        self.inner
            .read()
            .expect("ledger lock poisoned")
            .journal
            .for_wallet(user)
    }

    /// Cumulative escrow outflow for a wallet, reconstructed from the journal.
    #[must_use]
    pub fn escrow_outflow(&self, user: UserId) -> Decimal {
        self.inner
            .read()
            .expect("ledger lock poisoned")
            .journal
            .escrow_outflow(user)
    }

    /// Cumulative escrow inflow (release credits) for a wallet.
    #[must_use]
    pub fn escrow_inflow(&self, user: UserId) -> Decimal {
        self.inner
            .read()
            .expect("ledger lock poisoned")
            .journal
            .escrow_inflow(user)
    }

    /// Number of journal entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.inner.read().expect("ledger lock poisoned").journal.len()
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}
