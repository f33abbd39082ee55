//! # escrowd-ledger
//!
//! **Ledger Store**: wallet balances (available, crypto, escrow)
//! and the append-only journal of balance-affecting movements.
//!
//! ## Contract
//!
//! The escrow debit and the seller credit are only ever performed as a
//! pair, inside one atomic unit, by the release operator calling
//! [`LedgerStore::commit_release`]. Each unit validates its amounts and
//! resulting balances **before** any mutation; a violation aborts the unit
//! with no partial effect. Journal entries are write-once and readable by
//! transaction or by wallet, so diagnostics can reconstruct expected
//! balances without trusting the cached wallet fields.

pub mod journal;
pub mod store;

pub use journal::Journal;
pub use store::LedgerStore;
