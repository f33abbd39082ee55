//! Append-only journal of ledger entries.
//!
//! Entries are pushed and never updated or deleted. Reads are by
//! transaction reference or by wallet, which is all diagnostics needs to
//! reconstruct expected balances independent of the cached wallet fields.

use rust_decimal::Decimal;

use escrowd_types::{EntryKind, LedgerEntry, TxRef, UserId};

/// The append-only record of balance-affecting movements.
///
/// Owned by [`crate::LedgerStore`] behind its interior lock; the journal
/// itself carries no synchronization.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<LedgerEntry>,
}

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry. Write-once: the journal never mutates past records.
    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// All entries caused by one transaction, in write order.
    #[must_use]
    pub fn for_tx(&self, tx_ref: &TxRef) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| &e.tx_ref == tx_ref)
            .cloned()
            .collect()
    }

    /// All entries affecting one wallet, in write order.
    #[must_use]
    pub fn for_wallet(&self, wallet: UserId) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.wallet == wallet)
            .cloned()
            .collect()
    }

    /// Cumulative escrow outflow for a wallet: the magnitude of all
    /// `EscrowDebit` entries against it.
    #[must_use]
    pub fn escrow_outflow(&self, wallet: UserId) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.wallet == wallet && e.kind == EntryKind::EscrowDebit)
            .map(|e| -e.amount)
            .sum()
    }

    /// Cumulative escrow inflow for a wallet: the sum of all
    /// `EscrowCredit` entries in its favor.
    #[must_use]
    pub fn escrow_inflow(&self, wallet: UserId) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.wallet == wallet && e.kind == EntryKind::EscrowCredit)
            .map(|e| e.amount)
            .sum()
    }

    /// Number of entries recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
