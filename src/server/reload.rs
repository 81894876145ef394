// src/server/reload.rs

use tokio::sync::broadcast;

/// Payload-free "reload now" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSignal;

/// Broadcast side of the live-reload channel.
///
/// Cheap to clone. Every connected browser session holds one subscription.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: broadcast::Sender<ReloadSignal>,
}

impl Default for ReloadHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHandle {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Fire-and-forget reload to every connected session. Returns the number
    /// of sessions reached.
    pub fn notify_reload(&self) -> usize {
        self.tx.send(ReloadSignal).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    /// Number of currently connected sessions.
    pub fn sessions(&self) -> usize {
        self.tx.receiver_count()
    }
}
