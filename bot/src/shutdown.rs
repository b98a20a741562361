//! Graceful shutdown for the bot's tasks.
//!
//! SIGINT/SIGTERM (or [`ShutdownController::shutdown`]) is broadcast to the
//! watchdog, the daily report and the HTTP listener. Verification sessions
//! already running are not cancelled; they end at their own deadlines.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tokio::sync::broadcast;

/// What ended the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownCause {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::Interrupt => f.write_str("SIGINT"),
            ShutdownCause::Terminate => f.write_str("SIGTERM"),
        }
    }
}

pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    /// A receiver that fires on shutdown. Subscribing after shutdown has
    /// been triggered yields a receiver that fires immediately.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        let rx = self.tx.subscribe();
        if self.is_triggered() {
            let _ = self.tx.send(());
        }
        rx
    }

    pub fn shutdown(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!("shutdown triggered");
        }
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) -> ShutdownCause {
        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let cause = tokio::select! {
            _ = signal::ctrl_c() => ShutdownCause::Interrupt,
            _ = terminate => ShutdownCause::Terminate,
        };
        tracing::info!(signal = %cause, "shutting down");
        self.shutdown();
        cause
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_task_sees_the_shutdown() {
        let controller = ShutdownController::new();
        let mut watchdog = controller.subscribe();
        let mut listener = controller.subscribe();
        controller.shutdown();
        assert!(watchdog.recv().await.is_ok());
        assert!(listener.recv().await.is_ok());
    }

    #[tokio::test]
    async fn late_subscriber_still_stops() {
        let controller = ShutdownController::default();
        controller.shutdown();
        assert!(controller.is_triggered());
        let mut late = controller.subscribe();
        assert!(late.recv().await.is_ok());
    }

    #[test]
    fn cause_names_the_signal() {
        assert_eq!(ShutdownCause::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownCause::Terminate.to_string(), "SIGTERM");
    }
}
