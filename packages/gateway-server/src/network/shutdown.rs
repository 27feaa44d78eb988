//! Process health state and in-flight flow tracking for graceful shutdown.
//!
//! Health state lives in an `ArcSwap` so health checks read it without locking.
//! Each request flow holds an [`InFlightGuard`]; the last guard to drop
//! during a drain wakes [`ShutdownController::wait_for_drain`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{watch, Notify};

/// Gateway health, as reported to probes.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Starting,
    Ready,
    /// Shutdown signalled; in-flight flows are finishing.
    Draining,
    Stopped,
}

impl HealthState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Default)]
struct InFlight {
    count: AtomicU64,
    drained: Notify,
}

/// Coordinates shutdown between the HTTP server, request flows, and the
/// process lifecycle.
#[derive(Debug)]
pub struct ShutdownController {
    shutdown_signal: watch::Sender<bool>,
    in_flight: Arc<InFlight>,
    health_state: ArcSwap<HealthState>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shutdown_signal: tx,
            in_flight: Arc::new(InFlight::default()),
            health_state: ArcSwap::from_pointee(HealthState::Starting),
        }
    }

    pub fn set_ready(&self) {
        self.health_state.store(Arc::new(HealthState::Ready));
    }

    /// Receiver notified once shutdown is triggered.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_signal.subscribe()
    }

    /// Moves to `Draining` and signals every receiver. Idempotent.
    pub fn trigger_shutdown(&self) {
        self.health_state.store(Arc::new(HealthState::Draining));
        // Receivers may already be gone.
        let _ = self.shutdown_signal.send(true);
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.health_state.load()
    }

    /// Marks one flow as in flight until the guard is dropped.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Waits until no flow is in flight, or `timeout` expires.
    ///
    /// Returns `true` and moves to `Stopped` when drained; returns `false`
    /// and stays `Draining` on timeout.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let notified = self.in_flight.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent final drop is not missed.
            notified.as_mut().enable();

            if self.in_flight_count() == 0 {
                self.health_state.store(Arc::new(HealthState::Stopped));
                return true;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight count on drop, including during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.in_flight.drained.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_starting_ready_draining() {
        let controller = ShutdownController::new();
        assert_eq!(controller.health_state(), HealthState::Starting);

        controller.set_ready();
        assert_eq!(controller.health_state(), HealthState::Ready);

        controller.trigger_shutdown();
        controller.trigger_shutdown();
        assert_eq!(controller.health_state(), HealthState::Draining);
    }

    #[test]
    fn guards_track_in_flight_flows() {
        let controller = ShutdownController::new();
        let first = controller.in_flight_guard();
        let second = controller.in_flight_guard();
        assert_eq!(controller.in_flight_count(), 2);

        drop(first);
        assert_eq!(controller.in_flight_count(), 1);
        drop(second);
        assert_eq!(controller.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_receiver_notified() {
        let controller = ShutdownController::new();
        let mut rx = controller.shutdown_receiver();
        assert!(!*rx.borrow());

        controller.trigger_shutdown();

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn drain_with_nothing_in_flight_stops_immediately() {
        let controller = ShutdownController::new();
        controller.set_ready();
        controller.trigger_shutdown();

        assert!(controller.wait_for_drain(Duration::from_secs(1)).await);
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[tokio::test]
    async fn drain_waits_for_last_guard() {
        let controller = ShutdownController::new();
        controller.set_ready();

        let guard = controller.in_flight_guard();
        controller.trigger_shutdown();

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
        });

        assert!(controller.wait_for_drain(Duration::from_secs(2)).await);
        assert_eq!(controller.health_state(), HealthState::Stopped);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn drain_timeout_leaves_state_draining() {
        let controller = ShutdownController::new();
        controller.set_ready();

        let _guard = controller.in_flight_guard();
        controller.trigger_shutdown();

        assert!(!controller.wait_for_drain(Duration::from_millis(50)).await);
        assert_eq!(controller.health_state(), HealthState::Draining);
    }
}
