//! System-wide constants for the escrowd engine.

/// Fiat amounts are fixed-point with 2 decimal places.
pub const FIAT_SCALE: u32 = 2;

/// Default window between entering VERIFYING and automatic release (seconds).
pub const DEFAULT_AUTO_RELEASE_WINDOW_SECS: u64 = 3600;

/// Default interval between scheduled sweep runs (seconds).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Default timeout when acquiring a per-transaction release lock (milliseconds).
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Default number of attempts for a release call before giving up.
///
/// Giving up is safe: the sweep's safety-net pass retries on its own cycle.
pub const DEFAULT_RELEASE_RETRY_ATTEMPTS: u32 = 3;

/// Default backoff between release retry attempts (milliseconds).
pub const DEFAULT_RELEASE_RETRY_BACKOFF_MS: u64 = 50;

/// Reconciliation tolerance in cents: stored vs. recomputed escrow
/// balances within 0.01 are considered equal.
pub const RECON_TOLERANCE_CENTS: i64 = 1;

/// Prefix for generated transaction references.
pub const TX_REF_PREFIX: &str = "P2P";
