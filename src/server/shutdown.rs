//! Shutdown coordination
//!
//! A cloneable controller that any task can trip. The serve loop waits on
//! [`ShutdownController::triggered`]; once tripped the listener stops
//! accepting connections and in-flight requests drain. For fatal faults
//! the process then exits non-zero.

use tokio::sync::watch;

/// Why the server is shutting down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Operator-initiated (Ctrl-C / SIGTERM).
    Signal,
    /// Unrecoverable asynchronous fault; exits non-zero after draining.
    Fatal(String),
}

/// Coordinator for graceful shutdown. The first trigger wins.
#[derive(Clone)]
pub struct ShutdownController {
    tx: watch::Sender<Option<ShutdownReason>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Trip the controller because of an unrecoverable asynchronous fault.
    pub fn fatal(&self, reason: impl Into<String>) {
        self.trigger(ShutdownReason::Fatal(reason.into()));
    }

    /// Trip the controller. Later triggers are ignored.
    pub fn trigger(&self, reason: ShutdownReason) {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }

    /// Resolve once shutdown has been triggered, yielding the reason.
    pub async fn triggered(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        loop {
            {
                let current = rx.borrow_and_update();
                if let Some(reason) = current.as_ref() {
                    return reason.clone();
                }
            }
            if rx.changed().await.is_err() {
                // Sender gone without a trigger; treat as an orderly stop.
                return ShutdownReason::Signal;
            }
        }
    }

    /// The recorded reason, if shutdown has been triggered.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.tx.borrow().clone()
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
