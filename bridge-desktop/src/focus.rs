//! In-process audio focus arbiter and manual route monitor.
//!
//! Desktop operating systems do not arbitrate audio focus, so producers in
//! the same process share a [`FocusArbiter`]. Each producer gets its own
//! [`DesktopAudioFocus`] handle; granting focus to one handle notifies the
//! previous holder with `PermanentlyLost`. Hosts can also inject transient
//! interruptions (a notification chime, a call) through the arbiter.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    focus::{
        AudioFocusManager, FocusChange, FocusChangeStream, FocusRequestResult,
        OutputRouteMonitor, RouteChange, RouteChangeStream,
    },
};
use core_async::sync::broadcast;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const CHANGE_CAPACITY: usize = 16;

type HolderId = u64;

#[derive(Default)]
struct ArbiterState {
    next_id: HolderId,
    holder: Option<HolderId>,
    /// While set, every request is denied (e.g. during a call).
    blocked: bool,
    listeners: Vec<(HolderId, broadcast::Sender<FocusChange>)>,
}

impl ArbiterState {
    fn notify(&self, id: HolderId, change: FocusChange) {
        if let Some((_, tx)) = self.listeners.iter().find(|(holder, _)| *holder == id) {
            let _ = tx.send(change);
        }
    }
}

/// Shared focus policy for every producer in the process.
#[derive(Clone, Default)]
pub struct FocusArbiter {
    state: Arc<Mutex<ArbiterState>>,
}

impl FocusArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a focus handle for one producer.
    pub fn client(&self) -> DesktopAudioFocus {
        let (tx, _) = broadcast::channel(CHANGE_CAPACITY);
        let id = self.with_state(|state| {
            let id = state.next_id;
            state.next_id += 1;
            state.listeners.push((id, tx.clone()));
            id
        });
        DesktopAudioFocus {
            id,
            arbiter: self.clone(),
            changes: tx,
        }
    }

    /// Deny all focus requests until unblocked.
    pub fn set_blocked(&self, blocked: bool) {
        self.with_state(|state| state.blocked = blocked);
    }

    /// Deliver a transient interruption to the current holder.
    pub fn interrupt(&self, can_duck: bool) {
        let change = if can_duck {
            FocusChange::TransientLossCanDuck
        } else {
            FocusChange::TransientlyLost
        };
        self.with_state(|state| {
            if let Some(holder) = state.holder {
                info!(?change, "Transient focus interruption");
                state.notify(holder, change);
            }
        });
    }

    /// End a transient interruption; the current holder regains focus.
    pub fn end_interruption(&self) {
        self.with_state(|state| {
            if let Some(holder) = state.holder {
                state.notify(holder, FocusChange::Regained);
            }
        });
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ArbiterState) -> R) -> R {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

/// Per-producer [`AudioFocusManager`] backed by a shared [`FocusArbiter`].
pub struct DesktopAudioFocus {
    id: HolderId,
    arbiter: FocusArbiter,
    changes: broadcast::Sender<FocusChange>,
}

impl DesktopAudioFocus {
    /// Standalone handle with its own private arbiter.
    pub fn standalone() -> Self {
        FocusArbiter::new().client()
    }

    pub fn holds_focus(&self) -> bool {
        self.arbiter.with_state(|state| state.holder == Some(self.id))
    }
}

#[async_trait]
impl AudioFocusManager for DesktopAudioFocus {
    async fn request_focus(&self) -> Result<FocusRequestResult> {
        let id = self.id;
        let result = self.arbiter.with_state(|state| {
            if state.blocked {
                return FocusRequestResult::Denied;
            }
            if let Some(previous) = state.holder.filter(|holder| *holder != id) {
                debug!(previous, granted = id, "Focus moved to another producer");
                state.notify(previous, FocusChange::PermanentlyLost);
            }
            state.holder = Some(id);
            FocusRequestResult::Granted
        });
        if result == FocusRequestResult::Denied {
            warn!(holder = id, "Focus request denied");
        }
        Ok(result)
    }

    async fn abandon_focus(&self) -> Result<()> {
        let id = self.id;
        self.arbiter.with_state(|state| {
            if state.holder == Some(id) {
                state.holder = None;
            }
        });
        Ok(())
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn FocusChangeStream>> {
        Ok(Box::new(BroadcastFocusChanges {
            receiver: self.changes.subscribe(),
        }))
    }
}

impl Drop for DesktopAudioFocus {
    fn drop(&mut self) {
        let id = self.id;
        self.arbiter.with_state(|state| {
            state.listeners.retain(|(holder, _)| *holder != id);
            if state.holder == Some(id) {
                state.holder = None;
            }
        });
    }
}

struct BroadcastFocusChanges {
    receiver: broadcast::Receiver<FocusChange>,
}

#[async_trait]
impl FocusChangeStream for BroadcastFocusChanges {
    async fn next(&mut self) -> Option<FocusChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Focus change subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Route monitor driven by the host (e.g. from a device hot-plug callback).
#[derive(Clone)]
pub struct ManualRouteMonitor {
    changes: broadcast::Sender<RouteChange>,
}

impl ManualRouteMonitor {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { changes }
    }

    /// Publish a route change to every subscriber.
    pub fn notify(&self, change: RouteChange) {
        let _ = self.changes.send(change);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

impl Default for ManualRouteMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputRouteMonitor for ManualRouteMonitor {
    async fn subscribe_changes(&self) -> Result<Box<dyn RouteChangeStream>> {
        Ok(Box::new(BroadcastRouteChanges {
            receiver: self.changes.subscribe(),
        }))
    }
}

struct BroadcastRouteChanges {
    receiver: broadcast::Receiver<RouteChange>,
}

#[async_trait]
impl RouteChangeStream for BroadcastRouteChanges {
    async fn next(&mut self) -> Option<RouteChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_producer_takes_focus_from_first() {
        let arbiter = FocusArbiter::new();
        let first = arbiter.client();
        let second = arbiter.client();
        let mut first_changes = first.subscribe_changes().await.unwrap();

        assert_eq!(
            first.request_focus().await.unwrap(),
            FocusRequestResult::Granted
        );
        assert_eq!(
            second.request_focus().await.unwrap(),
            FocusRequestResult::Granted
        );

        assert_eq!(
            first_changes.next().await,
            Some(FocusChange::PermanentlyLost)
        );
        assert!(!first.holds_focus());
        assert!(second.holds_focus());
    }

    #[tokio::test]
    async fn blocked_arbiter_denies() {
        let arbiter = FocusArbiter::new();
        let focus = arbiter.client();
        arbiter.set_blocked(true);
        assert_eq!(
            focus.request_focus().await.unwrap(),
            FocusRequestResult::Denied
        );
        arbiter.set_blocked(false);
        assert!(focus.request_focus().await.unwrap().is_granted());
    }

    #[tokio::test]
    async fn interruptions_reach_current_holder() {
        let arbiter = FocusArbiter::new();
        let focus = arbiter.client();
        let mut changes = focus.subscribe_changes().await.unwrap();
        focus.request_focus().await.unwrap();

        arbiter.interrupt(true);
        arbiter.interrupt(false);
        arbiter.end_interruption();

        assert_eq!(changes.next().await, Some(FocusChange::TransientLossCanDuck));
        assert_eq!(changes.next().await, Some(FocusChange::TransientlyLost));
        assert_eq!(changes.next().await, Some(FocusChange::Regained));
    }

    #[tokio::test]
    async fn abandon_releases_focus() {
        let focus = DesktopAudioFocus::standalone();
        focus.request_focus().await.unwrap();
        focus.abandon_focus().await.unwrap();
        assert!(!focus.holds_focus());
        // Abandoning twice is harmless.
        focus.abandon_focus().await.unwrap();
    }

    #[tokio::test]
    async fn route_monitor_fans_out() {
        let monitor = ManualRouteMonitor::new();
        let mut a = monitor.subscribe_changes().await.unwrap();
        let mut b = monitor.subscribe_changes().await.unwrap();
        monitor.notify(RouteChange::BecomingNoisy);
        assert_eq!(a.next().await, Some(RouteChange::BecomingNoisy));
        assert_eq!(b.next().await, Some(RouteChange::BecomingNoisy));
    }
}
