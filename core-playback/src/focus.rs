//! Audio focus ownership and the reaction policy for focus changes.

use crate::error::{PlaybackError, Result};
use bridge_traits::focus::{AudioFocusManager, FocusChange, FocusChangeStream};
use core_runtime::SessionConfig;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the controller must do in response to a focus change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusReaction {
    /// Set the engine volume; playback state is untouched.
    SetVolume(f32),
    /// Pause, optionally arming the delayed stop.
    Pause { arm_delayed_stop: bool },
}

/// Map a focus change onto the session's reaction.
///
/// `Regained` only restores volume; playback never resumes on its own.
pub fn reaction_for(change: FocusChange, config: &SessionConfig) -> FocusReaction {
    match change {
        FocusChange::Regained => FocusReaction::SetVolume(config.full_volume),
        FocusChange::TransientLossCanDuck => FocusReaction::SetVolume(config.duck_volume),
        FocusChange::TransientlyLost => FocusReaction::Pause {
            arm_delayed_stop: false,
        },
        FocusChange::PermanentlyLost => FocusReaction::Pause {
            arm_delayed_stop: true,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusState {
    Released,
    Held,
    /// Lost transiently; the OS must be asked again before output resumes.
    Suspended,
}

/// Tracks whether the session holds focus.
pub struct FocusArbiter {
    manager: Arc<dyn AudioFocusManager>,
    state: FocusState,
}

impl FocusArbiter {
    pub fn new(manager: Arc<dyn AudioFocusManager>) -> Self {
        Self {
            manager,
            state: FocusState::Released,
        }
    }

    pub fn is_held(&self) -> bool {
        self.state == FocusState::Held
    }

    /// Request focus unless it is already held.
    ///
    /// Returns `true` for a fresh grant and `FocusDenied` when refused. A
    /// bridge failure counts as a denial.
    pub async fn request(&mut self) -> Result<bool> {
        if self.state == FocusState::Held {
            return Ok(false);
        }

        match self.manager.request_focus().await {
            Ok(result) if result.is_granted() => {
                debug!("Audio focus granted");
                self.state = FocusState::Held;
                Ok(true)
            }
            Ok(_) => Err(PlaybackError::FocusDenied),
            Err(err) => {
                warn!(error = %err, "Focus request failed");
                Err(PlaybackError::FocusDenied)
            }
        }
    }

    /// Give focus back. Safe to call when not held.
    pub async fn abandon(&mut self) {
        if self.state == FocusState::Released {
            return;
        }
        self.state = FocusState::Released;
        if let Err(err) = self.manager.abandon_focus().await {
            warn!(error = %err, "Failed to abandon audio focus");
        }
    }

    /// Record a change delivered by the manager. Ignored once released.
    pub fn observe(&mut self, change: FocusChange) {
        if self.state == FocusState::Released {
            debug!(?change, "Focus change after release");
            return;
        }
        self.state = match change {
            FocusChange::PermanentlyLost => FocusState::Released,
            FocusChange::TransientlyLost => FocusState::Suspended,
            FocusChange::Regained => FocusState::Held,
            FocusChange::TransientLossCanDuck => self.state,
        };
    }

    pub async fn subscribe(&self) -> Result<Box<dyn FocusChangeStream>> {
        Ok(self.manager.subscribe_changes().await?)
    }
}
