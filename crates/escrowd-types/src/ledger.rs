//! Ledger entry types — the append-only audit record of balance movements.
//!
//! Entries are write-once. The funding step writes an `EscrowHold`; the
//! release operator writes an `EscrowDebit`/`EscrowCredit` pair. Nothing
//! else touches the journal, and nothing ever updates or deletes an entry.
//! Diagnostics reconstructs expected balances from these records,
//! independent of the cached wallet fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EntryId, TxRef, UserId};

/// What kind of balance movement an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Buyer funds moved available → escrow when payment locked.
    EscrowHold,
    /// Buyer escrow debited on release.
    EscrowDebit,
    /// Seller available credited on release.
    EscrowCredit,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EscrowHold => write!(f, "ESCROW_HOLD"),
            Self::EscrowDebit => write!(f, "ESCROW_DEBIT"),
            Self::EscrowCredit => write!(f, "ESCROW_CREDIT"),
        }
    }
}

/// An immutable record of one balance-affecting movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    /// The transaction that caused this movement.
    pub tx_ref: TxRef,
    /// The wallet affected.
    pub wallet: UserId,
    pub kind: EntryKind,
    /// Signed amount: negative for debits, positive for credits and holds.
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Build an entry stamped now.
    #[must_use]
    pub fn record(tx_ref: TxRef, wallet: UserId, kind: EntryKind, amount: Decimal) -> Self {
        Self {
            id: EntryId::new(),
            tx_ref,
            wallet,
            kind,
            amount,
            created_at: Utc::now(),
        }
    }

    /// Whether this entry moves escrow out of a wallet.
    #[must_use]
    pub fn is_debit(&self) -> bool {
        self.kind == EntryKind::EscrowDebit
    }
}
