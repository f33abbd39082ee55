//! # escrowd-engine
//!
//! The escrow release guarantee engine. Holds the transaction store and
//! ledger, and guarantees that a buyer's escrowed funds reach the seller
//! **exactly once** after a trade completes — even when individual trigger
//! paths fail.
//!
//! The guarantee comes from redundancy over one idempotent operator:
//!
//! - **On-write hook** ([`EscrowEngine::transition`]) fires the release the
//!   moment a transaction is persisted COMPLETED.
//! - **Periodic sweep** ([`EscrowEngine::run_sweep`], [`spawn_sweeper`])
//!   completes overdue VERIFYING trades and, as a safety net, releases
//!   anything COMPLETED-but-unreleased regardless of how it got that way.
//! - **Manual remediation** ([`EscrowEngine::remediate`]) lets an operator
//!   force an attempt.
//!
//! All three call [`EscrowEngine::release_escrow`], which re-checks the
//! released flag under a per-transaction lock, so redundant and concurrent
//! triggers are safe by construction.
//!
//! [`EscrowEngine::diagnose_wallet`] and friends provide the read-only
//! reconciliation surface.

pub mod audit;
pub mod engine;
pub mod notify;
pub mod recon;
mod release;
pub mod sweep;
pub mod tx_store;

pub use audit::{AuditAction, AuditLog, AuditRecord};
pub use engine::EscrowEngine;
pub use notify::{MemoryNotifier, NoopNotifier, Notifier};
pub use recon::{TxLine, TxReport, WalletReport};
pub use sweep::{spawn_sweeper, SweepReport};
pub use tx_store::TxStore;
