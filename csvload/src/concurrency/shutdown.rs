//! Broadcast shutdown signal.
//!
//! The producer checks it between records and stops dispatching once it is set; workers keep
//! running until the queue is closed and drained.

use tokio::sync::watch;

/// Sending side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

/// Receiving side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

/// Creates a shutdown channel in the running state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);

    (ShutdownTx(tx), ShutdownRx(rx))
}

impl ShutdownTx {
    /// Requests shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

impl ShutdownRx {
    /// Returns whether shutdown was requested, without waiting.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }
}
