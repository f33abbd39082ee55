//! Error types for the escrowd engine.
//!
//! All errors use the `ESD_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Transaction errors
//! - 2xx: Ledger / balance errors
//! - 3xx: Release errors
//! - 4xx: Concurrency / sweep errors
//! - 9xx: General / internal errors
//!
//! Note that "already released" is deliberately **not** an error: it is a
//! defined success outcome ([`crate::ReleaseOutcome::AlreadyReleased`]) that
//! every trigger must treat identically to a fresh release.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{TxRef, TxStatus};

/// Central error enum for all escrowd operations.
#[derive(Debug, Error)]
pub enum EscrowdError {
    // =================================================================
    // Transaction Errors (1xx)
    // =================================================================
    /// The requested transaction was not found in the store.
    #[error("ESD_ERR_100: Transaction not found: {0}")]
    TxNotFound(TxRef),

    /// The transaction failed validation (same buyer/seller, bad amount, etc.).
    #[error("ESD_ERR_101: Invalid transaction: {reason}")]
    InvalidTransaction { reason: String },

    /// The requested status change is not permitted by the state machine.
    #[error("ESD_ERR_102: Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TxStatus, to: TxStatus },

    /// A transaction with this reference already exists.
    #[error("ESD_ERR_103: Duplicate transaction reference: {0}")]
    DuplicateTx(TxRef),

    // =================================================================
    // Ledger / Balance Errors (2xx)
    // =================================================================
    /// Not enough available balance to fund escrow.
    #[error("ESD_ERR_200: Insufficient available balance: need {needed}, have {available}")]
    InsufficientAvailable { needed: Decimal, available: Decimal },

    /// A ledger mutation would break an invariant: non-positive amount, or a
    /// debit that would drive a balance negative. Fatal to the attempt and
    /// never silently ignored; signals an upstream bug (incorrect escrow
    /// amount or double-funding) requiring operator investigation.
    #[error("ESD_ERR_201: Ledger invariant violation: {reason}")]
    LedgerInvariantViolation { reason: String },

    /// The referenced wallet does not exist.
    #[error("ESD_ERR_202: Wallet not found for user {0}")]
    WalletNotFound(crate::UserId),

    // =================================================================
    // Release Errors (3xx)
    // =================================================================
    /// Release requested before the transaction reached COMPLETED.
    /// Non-fatal trigger misuse; wait for the status to change.
    #[error("ESD_ERR_300: Release not eligible: transaction is {status}, not COMPLETED")]
    NotEligible { status: TxStatus },

    // =================================================================
    // Concurrency / Sweep Errors (4xx)
    // =================================================================
    /// The per-transaction release lock could not be acquired in time.
    /// Transient; retry with bounded backoff, or let the sweep catch it.
    #[error("ESD_ERR_400: Timed out acquiring release lock for {0}")]
    LockTimeout(TxRef),

    /// A sweep run was requested while another sweep is still active.
    #[error("ESD_ERR_401: Sweep already running")]
    SweepAlreadyRunning,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("ESD_ERR_900: Internal error: {0}")]
    Internal(String),
}

impl EscrowdError {
    /// Whether a caller may retry the failed operation with the same
    /// arguments and expect it to eventually succeed.
    ///
    /// Retrying is always safe (the release operator is idempotent); this
    /// only answers whether it is *useful*.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout(_) | Self::SweepAlreadyRunning)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowdError>;
