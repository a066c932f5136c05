//! Cooperative shutdown signal.
//!
//! One `ShutdownTrigger` flips a watch channel; every clone of `Shutdown`
//! observes it. Worker loops stop taking new items and the fetch layer stops
//! starting new requests once it is set.

use tokio::sync::watch;

/// Sending half: requests shutdown.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half, cheap to clone into every worker.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a linked trigger/receiver pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    /// A signal that is never raised.
    pub fn never() -> Self {
        channel().1
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested.
    pub async fn requested(&self) {
        let mut rx = self.rx.clone();
        // trigger dropped without firing: nothing will ever request shutdown
        if rx.wait_for(|requested| *requested).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Raise the trigger on the first Ctrl+C; exit immediately on the second.
pub fn listen_for_ctrl_c(trigger: ShutdownTrigger) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!(
                "Received Ctrl+C, finishing in-flight work. Press Ctrl+C again to force quit"
            );
            trigger.trigger();

            if tokio::signal::ctrl_c().await.is_ok() {
                log::error!("Force quit requested, exiting immediately");
                std::process::exit(130);
            }
        }
    });
}
