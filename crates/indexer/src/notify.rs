//! Local change notifications
//!
//! Fire-and-forget fan-out for downstream consumers such as live UI
//! updates. Emitting never blocks and never fails the indexing path.

use tokio::sync::broadcast;

/// A materialized state change worth telling local consumers about
#[derive(Debug, Clone)]
pub enum Notification {
    /// A membership converged to active
    MembershipActivated {
        member_did: String,
        coop_did: String,
        roles: Vec<String>,
    },
    /// An agreement signature record changed state
    AgreementSignature {
        agreement: String,
        signer_did: String,
        status: String,
    },
}

/// Broadcast channel for local notifications
pub struct ChangeNotifier {
    tx: broadcast::Sender<Notification>,
}

impl ChangeNotifier {
    /// Create a notifier with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Emit a notification; dropped silently when nobody listens
    pub fn emit(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}
