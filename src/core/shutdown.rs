//! Cooperative cancellation shared by the transport client and the workers.

use std::sync::Arc;

use tokio::sync::watch;

/// Fires the paired [`ShutdownSignal`]s.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

/// Observed at every blocking point; cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger/signal pair.
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    pub fn cancel(&self) {
        // send_replace succeeds even with no live receivers
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the trigger fires.
    ///
    /// If the trigger is dropped without firing, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let trigger_dropped = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if trigger_dropped {
            std::future::pending::<()>().await;
        }
    }

    /// Derive a pair that fires when either this signal or the new trigger fires.
    ///
    /// Must be called from within a tokio runtime.
    pub fn child(&self) -> (ShutdownTrigger, ShutdownSignal) {
        let (trigger, signal) = channel();
        if self.is_cancelled() {
            trigger.cancel();
            return (trigger, signal);
        }

        let parent = self.clone();
        let forward = Arc::clone(&trigger.tx);
        tokio::spawn(async move {
            tokio::select! {
                _ = parent.cancelled() => {
                    forward.send_replace(true);
                }
                _ = forward.closed() => {}
            }
        });

        (trigger, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_is_seen_by_every_clone() {
        let (trigger, signal) = channel();
        let other = signal.clone();
        assert!(!signal.is_cancelled());

        trigger.cancel();

        assert!(signal.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), other.cancelled())
            .await
            .expect("clone should observe cancellation");
    }

    #[tokio::test]
    async fn child_follows_parent() {
        let (parent_trigger, parent) = channel();
        let (_child_trigger, child) = parent.child();

        parent_trigger.cancel();

        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .expect("child should fire with parent");
    }

    #[tokio::test]
    async fn child_cancel_leaves_parent_alone() {
        let (_parent_trigger, parent) = channel();
        let (child_trigger, child) = parent.child();

        child_trigger.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn never_signal_stays_pending() {
        let signal = ShutdownSignal::never();
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
        assert!(!signal.is_cancelled());
    }
}
