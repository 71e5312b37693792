use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Notify;

/// Shared stop switch for the slave actors.
#[derive(Debug, Clone)]
pub struct SlaveControl {
    running: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl SlaveControl {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Request the actors to stop at their next suspension point
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolves once `stop` has been called.
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for SlaveControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_stop_flag() {
        let control = SlaveControl::new();
        let handle = control.clone();
        assert!(control.is_running());
        handle.stop();
        assert!(!control.is_running());
    }

    #[test]
    fn test_stopped_returns_after_stop() {
        let control = SlaveControl::new();
        control.stop();
        // already stopped: must not wait for a notification
        tokio_test::block_on(control.stopped());
    }

    #[tokio::test]
    async fn test_stopped_wakes_waiter() {
        let control = SlaveControl::new();
        let waiter = {
            let control = control.clone();
            tokio::spawn(async move { control.stopped().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        control.stop();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
