use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Single-fire shutdown trigger shared across subsystems.
///
/// Subscribers get a child token that trips when shutdown starts. However
/// many signals arrive, only the first `trigger` call wins; a second
/// shutdown sequence is never started concurrently with the first.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    shutdown_token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            shutdown_token: CancellationToken::new(),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    /// Starts shutdown. Returns true for the first caller only.
    pub fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.shutdown_token.cancel();
        true
    }

    #[allow(dead_code)]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks until a termination signal arrives.
///
/// Handlers are installed before the first await, so a signal delivered
/// while the caller is still starting up is not missed. SIGHUP could
/// drive an in-place reconfiguration one day; for now it shuts down like
/// the others.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut hangup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = interrupt.recv() => {
            debug!("received SIGINT signal");
        },
        _ = terminate.recv() => {
            debug!("received SIGTERM signal");
        },
        _ = hangup.recv() => {
            debug!("received SIGHUP signal");
        },
    }
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    debug!("received Ctrl+C signal");
}
