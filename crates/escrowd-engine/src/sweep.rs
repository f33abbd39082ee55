//! Periodic sweep: the scheduled trigger and the safety net.
//!
//! A run makes two passes over the store:
//!
//! 1. **Deadline pass** — VERIFYING transactions whose auto-release deadline
//!    has elapsed are completed through the state machine and released.
//! 2. **Safety-net pass** — anything COMPLETED and unreleased, however it
//!    got that way (hook failure, crash between the status write and the
//!    release, a direct datastore write that skipped the state machine), is
//!    released now.
//!
//! Runs never overlap: a second run while one is active gets
//! `SweepAlreadyRunning` and nothing else happens. One transaction failing
//! never aborts the rest of the run.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use escrowd_types::{EscrowdError, ReleaseOutcome, ReleaseTrigger, Result, TxStatus};

use crate::engine::EscrowEngine;

/// What one sweep run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Deadline pass: overdue VERIFYING transactions completed and released.
    pub auto_released: usize,
    /// Safety-net pass: COMPLETED-but-unreleased transactions caught.
    pub safety_net_released: usize,
    /// Transactions that errored in either pass; they stay eligible for the
    /// next run.
    pub failures: usize,
}

impl SweepReport {
    /// Whether this run changed or tried to change anything.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.auto_released == 0 && self.safety_net_released == 0 && self.failures == 0
    }
}

impl EscrowEngine {
    /// Execute one sweep run.
    ///
    /// # Errors
    /// Returns `SweepAlreadyRunning` if another run holds the gate.
    /// Per-transaction errors are counted in the report, not returned.
    pub async fn run_sweep(&self) -> Result<SweepReport> {
        let Ok(_gate) = self.sweep_gate.try_lock() else {
            return Err(EscrowdError::SweepAlreadyRunning);
        };

        let now = Utc::now();
        let mut report = SweepReport::default();

        // Deadline pass. Completion goes through the state machine like any
        // other transition; the release carries the sweep's trigger tag.
        for tx_ref in self.transactions().overdue_verifying(now) {
            let result = match self.apply_status(&tx_ref, TxStatus::Completed) {
                Ok(()) => {
                    self.release_with_retry(&tx_ref, ReleaseTrigger::Sweep)
                        .await
                        .map(|_| ())
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    tracing::info!(tx_ref = %tx_ref, "auto-released overdue transaction");
                    report.auto_released += 1;
                }
                Err(e) => {
                    tracing::warn!(tx_ref = %tx_ref, error = %e, "sweep deadline pass failed");
                    report.failures += 1;
                }
            }
        }

        // Safety-net pass. The work list is recomputed here, so anything the
        // deadline pass just released is already off it.
        for tx_ref in self.transactions().completed_unreleased() {
            match self.release_with_retry(&tx_ref, ReleaseTrigger::Sweep).await {
                Ok(ReleaseOutcome::Released) => {
                    tracing::warn!(
                        tx_ref = %tx_ref,
                        "safety net released escrow missed by the primary triggers"
                    );
                    report.safety_net_released += 1;
                }
                // Lost a benign race with another trigger between the list
                // scan and the lock.
                Ok(ReleaseOutcome::AlreadyReleased) => {}
                Err(e) => {
                    tracing::warn!(tx_ref = %tx_ref, error = %e, "sweep safety-net pass failed");
                    report.failures += 1;
                }
            }
        }

        if !report.is_noop() {
            tracing::info!(
                auto_released = report.auto_released,
                safety_net_released = report.safety_net_released,
                failures = report.failures,
                "sweep complete"
            );
        }
        Ok(report)
    }
}

/// Run the sweep on a fixed interval until the task is aborted.
///
/// Ticks that would overlap a still-running sweep are skipped, not queued.
pub fn spawn_sweeper(engine: Arc<EscrowEngine>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(engine.config().sweep_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match engine.run_sweep().await {
                Ok(_) => {}
                Err(EscrowdError::SweepAlreadyRunning) => {
                    tracing::debug!("sweep still running; skipping tick");
                }
                Err(e) => {
                    tracing::error!(error = %e, "sweep run failed");
                }
            }
        }
    })
}
