//! Notification dispatch.
//!
//! The engine emits [`NotifyEvent`]s to both parties after a release unit
//! commits — never before. Delivery is best-effort: the trait returns no
//! error, and a dispatcher that drops an event cannot roll back a release.

use std::sync::Mutex;

use async_trait::async_trait;

use escrowd_types::NotifyEvent;

/// Delivery seam for release notifications.
///
/// Implementations carry the transport (push, e-mail, message queue); the
/// engine only knows this trait.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotifyEvent);
}

/// Discards every event. The default when no transport is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: NotifyEvent) {}
}

/// Captures events in memory. For tests and local demos.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<NotifyEvent>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<NotifyEvent> {
        self.sent.lock().expect("notifier lock poisoned").clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.sent.lock().expect("notifier lock poisoned").len()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, event: NotifyEvent) {
        self.sent.lock().expect("notifier lock poisoned").push(event);
    }
}
