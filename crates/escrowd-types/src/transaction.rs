//! # EscrowTransaction — the P2P trade and its state machine
//!
//! One `EscrowTransaction` exists per peer-to-peer trade. The buyer's funds
//! are locked into escrow when payment is received and move to the seller
//! exactly once when the trade completes.
//!
//! ## State Machine
//!
//! ```text
//!   CREATED ──▶ PAYMENT_RECEIVED ──▶ SERVICE_PROVIDED ──▶ VERIFYING ──▶ COMPLETED
//!      │                                                      │
//!      ▼                                                      ▼
//!   CANCELLED                                             DISPUTED
//! ```
//!
//! Cancellation is only possible from CREATED — once payment locks funds
//! into escrow, the trade must run to a terminal state through the machine.
//! COMPLETED, CANCELLED, and DISPUTED are terminal.
//!
//! ## Release invariants
//!
//! - `escrow_released` is **monotonic**: false → true exactly once, never back.
//! - `escrow_released == true` implies `status == Completed`. The converse
//!   holds within one release-trigger cycle, not instantaneously.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, EscrowdError, Result, TxRef, UserId};

/// Lifecycle status of an escrow transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    /// Trade agreed, no funds locked yet.
    Created,
    /// Buyer's funds are locked in escrow.
    PaymentReceived,
    /// Seller has delivered the service / trade goods.
    ServiceProvided,
    /// Buyer is verifying delivery; the auto-release deadline is ticking.
    Verifying,
    /// Trade done. The single release-eligibility signal.
    Completed,
    /// Buyer raised a dispute during verification. Escrow stays held
    /// pending out-of-band resolution.
    Disputed,
    /// Trade called off before funds were locked.
    Cancelled,
}

impl TxStatus {
    /// Can this status transition to the given target?
    ///
    /// This table is the whole state machine; every status write in the
    /// system goes through it.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::PaymentReceived | Self::Cancelled)
                | (Self::PaymentReceived, Self::ServiceProvided)
                | (Self::ServiceProvided, Self::Verifying)
                | (Self::Verifying, Self::Completed | Self::Disputed)
        )
    }

    /// Terminal statuses admit no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Disputed)
    }

    /// Whether a transaction in this status is holding the buyer's funds
    /// in escrow (assuming release has not occurred).
    ///
    /// DISPUTED counts: the funds stay locked until resolution.
    #[must_use]
    pub fn holds_escrow(&self) -> bool {
        matches!(
            self,
            Self::PaymentReceived | Self::ServiceProvided | Self::Verifying | Self::Disputed
        )
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::PaymentReceived => write!(f, "PAYMENT_RECEIVED"),
            Self::ServiceProvided => write!(f, "SERVICE_PROVIDED"),
            Self::Verifying => write!(f, "VERIFYING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A peer-to-peer escrow transaction.
///
/// `escrow_amount` and the parties are fixed at creation; only `status`,
/// the release flags, and the deadline mutate afterwards — and the release
/// flags only through the release operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowTransaction {
    /// Unique, immutable reference.
    pub reference: TxRef,
    /// The paying party; their wallet holds the escrow.
    pub buyer: UserId,
    /// The receiving party; credited on release.
    pub seller: UserId,
    /// Amount held in escrow. Fixed at creation, always > 0, 2dp fiat.
    pub escrow_amount: Decimal,
    /// Current lifecycle status.
    pub status: TxStatus,
    /// Whether escrow has been released to the seller. Monotonic.
    pub escrow_released: bool,
    /// When escrow was released. Set exactly once, with the flag.
    pub escrow_released_at: Option<DateTime<Utc>>,
    /// Deadline after which buyer inaction itself triggers release.
    /// Set when entering VERIFYING.
    pub auto_release_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EscrowTransaction {
    /// Create a new transaction in CREATED status with a generated reference.
    ///
    /// # Errors
    /// Returns `InvalidTransaction` if the amount is not positive or buyer
    /// and seller are the same user.
    pub fn new(buyer: UserId, seller: UserId, escrow_amount: Decimal) -> Result<Self> {
        if buyer == seller {
            return Err(EscrowdError::InvalidTransaction {
                reason: "buyer and seller must be distinct users".into(),
            });
        }
        if escrow_amount <= Decimal::ZERO {
            return Err(EscrowdError::InvalidTransaction {
                reason: format!("escrow amount must be > 0, got {escrow_amount}"),
            });
        }
        let now = Utc::now();
        Ok(Self {
            reference: TxRef::generate(constants::TX_REF_PREFIX),
            buyer,
            seller,
            escrow_amount: escrow_amount.round_dp(constants::FIAT_SCALE),
            status: TxStatus::Created,
            escrow_released: false,
            escrow_released_at: None,
            auto_release_deadline: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Apply a status transition, stamping the timestamps the new status
    /// owns. The caller supplies the auto-release window so the deadline is
    /// configuration-driven rather than baked in.
    ///
    /// # Errors
    /// Returns `InvalidTransition` if the state machine forbids the move.
    pub fn transition(&mut self, target: TxStatus, auto_release_window: Duration) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(EscrowdError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        let now = Utc::now();
        match target {
            TxStatus::Verifying => self.auto_release_deadline = Some(now + auto_release_window),
            TxStatus::Completed => self.completed_at = Some(now),
            _ => {}
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    /// Mark escrow as released. Monotonic; only the release operator calls
    /// this, under the per-reference lock.
    ///
    /// # Errors
    /// Returns `Internal` if called twice — the operator's idempotency check
    /// must short-circuit before reaching this point.
    pub fn mark_released(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.escrow_released {
            return Err(EscrowdError::Internal(format!(
                "mark_released called twice for {}",
                self.reference
            )));
        }
        self.escrow_released = true;
        self.escrow_released_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Whether the release operator would act on this transaction right now.
    #[must_use]
    pub fn is_release_eligible(&self) -> bool {
        self.status == TxStatus::Completed && !self.escrow_released
    }

    /// Whether the buyer's wallet should currently be holding this
    /// transaction's escrow amount.
    #[must_use]
    pub fn holds_escrow(&self) -> bool {
        self.status.holds_escrow() && !self.escrow_released
    }

    /// Whether the auto-release deadline has passed as of `now`.
    #[must_use]
    pub fn deadline_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.auto_release_deadline.is_some_and(|d| d <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Duration {
        Duration::seconds(3600)
    }

    fn make_tx() -> EscrowTransaction {
        EscrowTransaction::new(UserId::new(), UserId::new(), Decimal::new(10000, 2)).unwrap()
    }

    #[test]
    fn happy_path_transitions() {
        let mut tx = make_tx();
        assert_eq!(tx.status, TxStatus::Created);
        tx.transition(TxStatus::PaymentReceived, window()).unwrap();
        tx.transition(TxStatus::ServiceProvided, window()).unwrap();
        tx.transition(TxStatus::Verifying, window()).unwrap();
        assert!(tx.auto_release_deadline.is_some());
        tx.transition(TxStatus::Completed, window()).unwrap();
        assert!(tx.completed_at.is_some());
        assert!(tx.is_release_eligible());
    }

    #[test]
    fn verifying_can_dispute() {
        let mut tx = make_tx();
        tx.transition(TxStatus::PaymentReceived, window()).unwrap();
        tx.transition(TxStatus::ServiceProvided, window()).unwrap();
        tx.transition(TxStatus::Verifying, window()).unwrap();
        tx.transition(TxStatus::Disputed, window()).unwrap();
        assert!(tx.status.is_terminal());
        assert!(tx.holds_escrow(), "disputed funds stay in escrow");
    }

    #[test]
    fn cancel_only_before_payment() {
        let mut tx = make_tx();
        tx.transition(TxStatus::PaymentReceived, window()).unwrap();
        let err = tx.transition(TxStatus::Cancelled, window()).unwrap_err();
        assert!(matches!(err, EscrowdError::InvalidTransition { .. }));

        let mut fresh = make_tx();
        fresh.transition(TxStatus::Cancelled, window()).unwrap();
        assert!(!fresh.holds_escrow());
    }

    #[test]
    fn no_exit_from_terminal_states() {
        for terminal in [TxStatus::Completed, TxStatus::Cancelled, TxStatus::Disputed] {
            for target in [
                TxStatus::Created,
                TxStatus::PaymentReceived,
                TxStatus::ServiceProvided,
                TxStatus::Verifying,
                TxStatus::Completed,
                TxStatus::Disputed,
                TxStatus::Cancelled,
            ] {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} -> {target} must be forbidden"
                );
            }
        }
    }

    #[test]
    fn no_skipping_states() {
        assert!(!TxStatus::Created.can_transition_to(TxStatus::Completed));
        assert!(!TxStatus::PaymentReceived.can_transition_to(TxStatus::Verifying));
        assert!(!TxStatus::ServiceProvided.can_transition_to(TxStatus::Completed));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let err =
            EscrowTransaction::new(UserId::new(), UserId::new(), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, EscrowdError::InvalidTransaction { .. }));
        let err =
            EscrowTransaction::new(UserId::new(), UserId::new(), Decimal::new(-100, 2)).unwrap_err();
        assert!(matches!(err, EscrowdError::InvalidTransaction { .. }));
    }

    #[test]
    fn rejects_self_trade() {
        let user = UserId::new();
        let err = EscrowTransaction::new(user, user, Decimal::ONE).unwrap_err();
        assert!(matches!(err, EscrowdError::InvalidTransaction { .. }));
    }

    #[test]
    fn amount_normalized_to_two_decimals() {
        let tx =
            EscrowTransaction::new(UserId::new(), UserId::new(), Decimal::new(100_005, 3)).unwrap();
        assert_eq!(tx.escrow_amount, Decimal::new(10000, 2));
    }

    #[test]
    fn mark_released_is_monotonic() {
        let mut tx = make_tx();
        let now = Utc::now();
        tx.mark_released(now).unwrap();
        assert!(tx.escrow_released);
        assert_eq!(tx.escrow_released_at, Some(now));
        assert!(tx.mark_released(Utc::now()).is_err(), "second call must fail");
        assert_eq!(tx.escrow_released_at, Some(now), "timestamp must not move");
    }

    #[test]
    fn deadline_elapsed() {
        let mut tx = make_tx();
        tx.transition(TxStatus::PaymentReceived, window()).unwrap();
        tx.transition(TxStatus::ServiceProvided, window()).unwrap();
        tx.transition(TxStatus::Verifying, Duration::seconds(0)).unwrap();
        assert!(tx.deadline_elapsed(Utc::now() + Duration::seconds(1)));

        let mut slow = make_tx();
        slow.transition(TxStatus::PaymentReceived, window()).unwrap();
        slow.transition(TxStatus::ServiceProvided, window()).unwrap();
        slow.transition(TxStatus::Verifying, window()).unwrap();
        assert!(!slow.deadline_elapsed(Utc::now()));
    }

    #[test]
    fn status_display() {
        assert_eq!(format!("{}", TxStatus::PaymentReceived), "PAYMENT_RECEIVED");
        assert_eq!(format!("{}", TxStatus::Completed), "COMPLETED");
    }

    #[test]
    fn serde_roundtrip() {
        let tx = make_tx();
        let json = serde_json::to_string(&tx).unwrap();
        let back: EscrowTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx.reference, back.reference);
        assert_eq!(tx.escrow_amount, back.escrow_amount);
        assert_eq!(tx.status, back.status);
    }
}
