use std::collections::{hash_map, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A provider's cleanup operation. Invoked at most once, during shutdown.
pub type ShutdownFn = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send>;

/// Action taken when the shutdown deadline elapses. The default exits the
/// process; tests inject their own so they can observe the forced path
/// without dying.
pub type TerminateFn = Arc<dyn Fn() + Send + Sync>;

/// Maps provider names to their shutdown operations. Written once during
/// application assembly, consumed by the orchestrator on shutdown.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ShutdownFn>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named shutdown operation. Names are unique; registering
    /// the same name twice keeps the last operation.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, op: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let op: ShutdownFn = Box::new(move || Box::pin(op()));
        if self.providers.insert(name.clone(), op).is_some() {
            warn!(provider = name, "replacing registered shutdown provider");
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn into_entries(self) -> hash_map::IntoIter<String, ShutdownFn> {
        self.providers.into_iter()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys())
            .finish()
    }
}

/// Armed deadline that forces the process down if cleanup overruns.
struct Deadline {
    handle: JoinHandle<()>,
}

/// Schedules `on_expire` to run after `timeout` unless disarmed first.
fn arm(timeout: Duration, on_expire: TerminateFn) -> Deadline {
    let handle = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        warn!(
            timeout_ms = timeout.as_millis() as u64,
            "shutdown deadline elapsed, forcing exit"
        );
        on_expire();
    });
    Deadline { handle }
}

impl Deadline {
    fn disarm(self) {
        self.handle.abort();
    }
}

/// Runs every registered shutdown operation concurrently, bounded by a
/// hard deadline.
///
/// Each provider's outcome is logged under its name; one provider failing
/// or stalling never blocks a sibling, only the overall join. If the
/// deadline elapses before all providers report, the terminate action
/// fires and any still-running operations are abandoned. Completion
/// carries no payload: callers cannot tell a fully clean shutdown from
/// one with logged provider failures.
pub struct ShutdownOrchestrator {
    timeout: Duration,
    terminate: TerminateFn,
}

impl ShutdownOrchestrator {
    pub fn new(timeout: Duration) -> Self {
        Self::with_terminate(timeout, Arc::new(|| std::process::exit(1)))
    }

    pub fn with_terminate(timeout: Duration, terminate: TerminateFn) -> Self {
        Self { timeout, terminate }
    }

    pub async fn run(self, registry: ProviderRegistry) {
        if registry.is_empty() {
            debug!("no shutdown providers registered");
            return;
        }
        info!(providers = registry.len(), "shutting down");

        let deadline = arm(self.timeout, self.terminate);

        let tasks: Vec<JoinHandle<()>> = registry
            .into_entries()
            .map(|(name, op)| {
                tokio::spawn(async move {
                    info!(provider = name, "cleaning up");
                    match op().await {
                        Ok(()) => info!(provider = name, "shutdown gracefully"),
                        Err(err) => warn!(provider = name, error = %err, "clean up failed"),
                    }
                })
            })
            .collect();

        for joined in join_all(tasks).await {
            if let Err(err) = joined {
                warn!(error = %err, "shutdown task panicked");
            }
        }

        deadline.disarm();
        info!("shutdown complete");
    }
}
