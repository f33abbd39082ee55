//! Release audit trail.
//!
//! Every call into the release operator leaves records here regardless of
//! outcome — attempted, released, already-released, not-eligible, failed —
//! so an operator can reconstruct which trigger acted on a transaction and
//! when. Each record is also emitted as a structured tracing event.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use escrowd_types::{ReleaseTrigger, TxRef};

/// What a release attempt's record says happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditAction {
    /// The operator was invoked; paired with exactly one outcome record.
    Attempted,
    /// This call moved the funds and flipped the flag.
    Released,
    /// The flag was already set; the call was a no-op.
    AlreadyReleased,
    /// The transaction was not COMPLETED; nothing happened.
    NotEligible,
    /// The attempt errored. `detail` carries the error text.
    Failed,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attempted => write!(f, "attempted"),
            Self::Released => write!(f, "released"),
            Self::AlreadyReleased => write!(f, "already_released"),
            Self::NotEligible => write!(f, "not_eligible"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One audit trail record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub tx_ref: TxRef,
    pub trigger: ReleaseTrigger,
    pub action: AuditAction,
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Append-only in-memory audit log.
#[derive(Debug, Default)]
pub struct AuditLog {
    records: RwLock<Vec<AuditRecord>>,
}

impl AuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Append a record and emit it as a tracing event.
    pub fn record(
        &self,
        tx_ref: &TxRef,
        trigger: ReleaseTrigger,
        action: AuditAction,
        detail: impl Into<String>,
    ) {
        let record = AuditRecord {
            tx_ref: tx_ref.clone(),
            trigger,
            action,
            detail: detail.into(),
            at: Utc::now(),
        };
        tracing::info!(
            tx_ref = %record.tx_ref,
            trigger = %record.trigger,
            action = %record.action,
            detail = %record.detail,
            "release audit"
        );
        self.records
            .write()
            .expect("audit log lock poisoned")
            .push(record);
    }

    /// All records for one transaction, in write order.
    #[must_use]
    pub fn for_tx(&self, tx_ref: &TxRef) -> Vec<AuditRecord> {
        self.records
            .read()
            .expect("audit log lock poisoned")
            .iter()
            .filter(|r| &r.tx_ref == tx_ref)
            .cloned()
            .collect()
    }

    /// Count of records carrying the given action.
    #[must_use]
    pub fn count(&self, action: AuditAction) -> usize {
        self.records
            .read()
            .expect("audit log lock poisoned")
            .iter()
            .filter(|r| r.action == action)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().expect("audit log lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
