//! Release operator outcome and trigger types.

use serde::{Deserialize, Serialize};

/// The two success outcomes of a release call.
///
/// `AlreadyReleased` is what makes every trigger safe to fire redundantly:
/// callers must treat it identically to `Released` for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseOutcome {
    /// This call performed the ledger movement and flipped the flag.
    Released,
    /// Some earlier call already did; this one was a no-op.
    AlreadyReleased,
}

impl ReleaseOutcome {
    /// True regardless of which call did the work — after either outcome
    /// the escrow is with the seller.
    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released | Self::AlreadyReleased)
    }
}

/// Which of the redundant trigger paths invoked the release operator.
///
/// Purely an audit tag — all three run the identical code path with
/// identical guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseTrigger {
    /// Synchronous on-write hook fired when status was persisted COMPLETED.
    StatusHook,
    /// The periodic sweep (deadline pass or safety-net pass).
    Sweep,
    /// Operator-invoked manual remediation.
    Manual,
}

impl std::fmt::Display for ReleaseTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatusHook => write!(f, "status_hook"),
            Self::Sweep => write!(f, "sweep"),
            Self::Manual => write!(f, "manual"),
        }
    }
}
