//! # escrowd-types
//!
//! Shared types, errors, and configuration for the **escrowd** release
//! guarantee engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`TxRef`], [`EntryId`]
//! - **Transaction model**: [`EscrowTransaction`], [`TxStatus`]
//! - **Balance model**: [`WalletBalance`]
//! - **Ledger model**: [`LedgerEntry`], [`EntryKind`]
//! - **Release model**: [`ReleaseOutcome`], [`ReleaseTrigger`]
//! - **Notification model**: [`NotifyEvent`], [`NotifyKind`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`EscrowdError`] with `ESD_ERR_` prefix codes
//! - **Constants**: system-wide defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod ledger;
pub mod release;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use escrowd_types::{EscrowTransaction, TxStatus, ReleaseOutcome, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use ledger::*;
pub use release::*;
pub use transaction::*;

// Constants are accessed via `escrowd_types::constants::FOO`
// (not re-exported to avoid name collisions).
