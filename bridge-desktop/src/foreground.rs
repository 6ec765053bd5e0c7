//! Foreground service for desktop hosts.
//!
//! Desktop processes are never killed for running in the background, so
//! there is no OS service to start. This implementation records the
//! notification the core asked for and logs each transition, which is what
//! a tray icon or an MPRIS bridge would read from.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    foreground::{ForegroundService, MediaNotification},
};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
struct SurfaceState {
    foreground: bool,
    notification: Option<MediaNotification>,
}

/// Tracing-backed [`ForegroundService`].
#[derive(Clone, Default)]
pub struct TracingForegroundService {
    state: Arc<Mutex<SurfaceState>>,
}

impl TracingForegroundService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the process is currently in foreground-visible mode.
    pub fn is_foreground(&self) -> bool {
        self.with_state(|state| state.foreground)
    }

    /// Notification currently posted, if any.
    pub fn notification(&self) -> Option<MediaNotification> {
        self.with_state(|state| state.notification.clone())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SurfaceState) -> R) -> R {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl ForegroundService for TracingForegroundService {
    async fn start_foreground(&self, notification: MediaNotification) -> Result<()> {
        info!(
            title = %notification.title,
            playing = notification.is_playing,
            "Entering foreground mode"
        );
        self.with_state(|state| {
            state.foreground = true;
            state.notification = Some(notification);
        });
        Ok(())
    }

    async fn update_notification(&self, notification: MediaNotification) -> Result<()> {
        self.with_state(|state| {
            if state.notification.is_none() {
                return Err(BridgeError::OperationFailed(
                    "No notification posted to update".to_string(),
                ));
            }
            debug!(
                title = %notification.title,
                playing = notification.is_playing,
                ongoing = notification.ongoing,
                "Updating notification"
            );
            state.notification = Some(notification);
            Ok(())
        })
    }

    async fn stop_foreground(&self, remove_notification: bool) -> Result<()> {
        self.with_state(|state| {
            if state.foreground {
                info!(remove_notification, "Leaving foreground mode");
            }
            state.foreground = false;
            if remove_notification {
                state.notification = None;
            }
        });
        Ok(())
    }
}
