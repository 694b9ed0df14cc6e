//! Shutdown signalling
//!
//! OS interrupts (SIGINT/SIGTERM, Ctrl+C on Windows) are turned into a single
//! shutdown notification broadcast to every component holding a
//! [`ShutdownSignal`]. Only the first interrupt triggers shutdown; later ones
//! are logged and otherwise ignored.

use tokio::sync::watch;
use tracing::{info, warn};

/// Receiving side of the shutdown notification
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                // Sender dropped, treat as shutdown
                break;
            }
        }
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Sending side of the shutdown notification
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    /// Trigger shutdown
    ///
    /// Returns true if this call started the shutdown, false if it was
    /// already in progress.
    pub fn shutdown(&self) -> bool {
        let started = self.sender.send_if_modified(|down| {
            let first = !*down;
            *down = true;
            first
        });
        if started {
            info!("Shutdown signal sent");
        }
        started
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Registered OS interrupt handlers
///
/// Registering up front means a failure surfaces at startup instead of
/// leaving a server that can never be stopped gracefully.
pub struct InterruptListener {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
}

impl InterruptListener {
    #[cfg(unix)]
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next interrupt and return its name
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to wait for Ctrl+C, treating as interrupt");
        }
        "CTRL_C"
    }

    /// Trigger `controller` on the first interrupt and absorb any later ones
    ///
    /// Runs until the process exits; spawn it as a background task.
    pub async fn forward_to(mut self, controller: ShutdownController) {
        let signal = self.recv().await;
        info!(signal = signal, "Initiating graceful shutdown");
        controller.shutdown();

        loop {
            let signal = self.recv().await;
            warn!(signal = signal, "Shutdown already in progress, ignoring signal");
        }
    }
}
