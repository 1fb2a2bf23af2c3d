// src/utils/shutdown.rs

//! Process interrupt signal.
//!
//! The watcher polls [`Shutdown::is_requested`] between discrete steps and
//! races [`Shutdown::requested`] against its inter-pass sleep. Network calls
//! already in flight are never cancelled; a second interrupt exits the
//! process at once.

use std::future::Future;
use std::io;

use tokio::sync::watch;
use tracing::instrument::WithSubscriber;
use tracing::{info, warn};

/// Exit status after a forced interrupt (128 + SIGINT).
pub const FORCED_EXIT_CODE: i32 = 130;

/// Cloneable view of the shutdown flag.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

/// Owning side; dropping it never triggers shutdown.
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl Shutdown {
    /// New signal plus the handle that fires it.
    pub fn new() -> (ShutdownTrigger, Shutdown) {
        let (sender, receiver) = watch::channel(false);
        (ShutdownTrigger { sender }, Shutdown { receiver })
    }

    /// A signal that never fires.
    pub fn never() -> Shutdown {
        let (_trigger, shutdown) = Self::new();
        shutdown
    }

    /// Listen for Ctrl-C in the background, logging to the current subscriber.
    ///
    /// The first Ctrl-C requests a graceful stop. A second one terminates
    /// the process with [`FORCED_EXIT_CODE`].
    pub fn on_ctrl_c() -> Shutdown {
        let (trigger, shutdown) = Self::new();
        tokio::spawn(
            async move {
                if relay_interrupts(tokio::signal::ctrl_c, &trigger).await {
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
            .with_current_subscriber(),
        );
        shutdown
    }

    pub fn is_requested(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown is requested.
    pub async fn requested(&mut self) {
        if self.receiver.wait_for(|fired| *fired).await.is_err() {
            // Trigger dropped without firing: nothing will ever request shutdown.
            std::future::pending::<()>().await;
        }
    }
}

impl ShutdownTrigger {
    pub fn fire(&self) {
        let _ = self.sender.send(true);
    }
}

/// Fire `trigger` on the first interrupt and wait for a second one.
///
/// Returns true when a second interrupt arrived, false when the signal
/// source failed first.
async fn relay_interrupts<F, Fut>(mut next_interrupt: F, trigger: &ShutdownTrigger) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        warn!(error = %e, "Cannot listen for interrupts");
        return false;
    }
    info!("Interrupt received, stopping after the current step (press Ctrl-C again to force)");
    trigger.fire();

    match next_interrupt().await {
        Ok(()) => {
            warn!("Second interrupt received, exiting immediately");
            true
        }
        Err(e) => {
            warn!(error = %e, "Stopped listening for interrupts");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fire_is_observed() {
        let (trigger, mut shutdown) = Shutdown::new();
        assert!(!shutdown.is_requested());

        trigger.fire();
        assert!(shutdown.is_requested());
        tokio::time::timeout(Duration::from_secs(1), shutdown.requested())
            .await
            .unwrap();
    }

    fn interrupts(
        outcomes: Vec<io::Result<()>>,
    ) -> impl FnMut() -> std::future::Ready<io::Result<()>> {
        let mut outcomes = outcomes.into_iter();
        move || {
            std::future::ready(
                outcomes
                    .next()
                    .unwrap_or_else(|| Err(io::Error::other("no more interrupts"))),
            )
        }
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let (trigger, shutdown) = Shutdown::new();
        let forced = relay_interrupts(interrupts(vec![Ok(()), Ok(())]), &trigger).await;
        assert!(forced);
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn test_single_interrupt_only_requests_shutdown() {
        let (trigger, shutdown) = Shutdown::new();
        let forced = relay_interrupts(interrupts(vec![Ok(())]), &trigger).await;
        assert!(!forced);
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn test_signal_failure_never_fires() {
        let (trigger, shutdown) = Shutdown::new();
        let forced = relay_interrupts(
            interrupts(vec![Err(io::Error::other("unsupported"))]),
            &trigger,
        )
        .await;
        assert!(!forced);
        assert!(!shutdown.is_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_pends() {
        let mut shutdown = Shutdown::never();
        let waited = tokio::time::timeout(Duration::from_secs(5), shutdown.requested()).await;
        assert!(waited.is_err());
        assert!(!shutdown.is_requested());
    }
}
