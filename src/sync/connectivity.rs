//! Push-based connectivity state.
//!
//! The engine subscribes to online/offline transitions instead of polling.
//! Whatever detects connectivity (a platform network monitor, a heartbeat,
//! a manual toggle in tests) owns a [`ConnectivityMonitor`] and publishes
//! state changes through it.

use tokio::sync::watch;

/// Publisher side of the connectivity state.
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state.
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// Publish the current connectivity state.
    ///
    /// Subscribers only observe transitions; publishing an unchanged state
    /// emits nothing.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    /// Current state as last published.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe to transition events.
    #[must_use]
    pub fn subscribe(&self) -> ConnectivityEvents {
        ConnectivityEvents {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Subscriber side: a stream of online/offline transitions.
pub struct ConnectivityEvents {
    rx: watch::Receiver<bool>,
}

impl ConnectivityEvents {
    /// Wait for the next transition and return the new state.
    ///
    /// Returns `None` once the monitor has been dropped.
    pub async fn next_transition(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Current state without waiting.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_transition_is_delivered() {
        let monitor = ConnectivityMonitor::new(false);
        let mut events = monitor.subscribe();

        monitor.set_online(true);
        assert_eq!(events.next_transition().await, Some(true));

        monitor.set_online(false);
        assert_eq!(events.next_transition().await, Some(false));
    }

    #[tokio::test]
    async fn test_unchanged_state_emits_nothing() {
        let monitor = ConnectivityMonitor::new(false);
        let mut events = monitor.subscribe();

        monitor.set_online(false);

        let waited =
            tokio::time::timeout(Duration::from_millis(20), events.next_transition()).await;
        assert!(waited.is_err(), "no transition should have been emitted");
    }

    #[tokio::test]
    async fn test_none_after_monitor_dropped() {
        let monitor = ConnectivityMonitor::new(false);
        let mut events = monitor.subscribe();

        drop(monitor);
        assert_eq!(events.next_transition().await, None);
    }

    #[test]
    fn test_is_online_reflects_last_publish() {
        let monitor = ConnectivityMonitor::new(false);
        assert!(!monitor.is_online());

        monitor.set_online(true);
        assert!(monitor.is_online());
        assert!(monitor.subscribe().is_online());
    }
}
