//! Notification event types.
//!
//! Notifications are best-effort and fire-and-forget: they are emitted only
//! after the release unit commits, and a delivery failure never rolls a
//! release back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{TxRef, UserId};

/// What happened, from the notified user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyKind {
    /// Buyer-side: your escrow for this trade has been released.
    EscrowReleased,
    /// Seller-side: payment has landed in your available balance.
    PaymentReceived,
}

/// A notification addressed to one party of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyEvent {
    pub user: UserId,
    pub kind: NotifyKind,
    pub tx_ref: TxRef,
    pub amount: Decimal,
}
