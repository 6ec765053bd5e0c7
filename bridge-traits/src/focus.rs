//! Audio focus and output route bridges.
//!
//! The OS audio policy decides which producer may be audible. The core asks
//! for focus before starting output and listens for asynchronous changes
//! afterwards. Output route changes (headphones unplugged, Bluetooth sink
//! dropped) arrive on a separate stream since hosts surface them through a
//! different API.

use crate::{
    error::Result,
    platform::{PlatformSend, PlatformSendSync},
};
use serde::{Deserialize, Serialize};

/// Outcome of a focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusRequestResult {
    Granted,
    Denied,
}

impl FocusRequestResult {
    pub fn is_granted(&self) -> bool {
        matches!(self, FocusRequestResult::Granted)
    }
}

/// Asynchronous focus notification delivered after a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusChange {
    /// Focus came back after a loss.
    Regained,
    /// Another producer took focus for an unbounded period.
    PermanentlyLost,
    /// Another producer took focus briefly (e.g., a notification sound).
    TransientlyLost,
    /// A transient loss where lowering the volume is acceptable.
    TransientLossCanDuck,
}

impl FocusChange {
    pub fn is_loss(&self) -> bool {
        !matches!(self, FocusChange::Regained)
    }
}

/// Stream of focus changes.
#[async_trait::async_trait]
pub trait FocusChangeStream: PlatformSend {
    /// Get the next focus change.
    ///
    /// Returns `None` when the focus manager has shut down.
    async fn next(&mut self) -> Option<FocusChange>;
}

/// Host audio policy access.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::focus::{AudioFocusManager, FocusRequestResult};
///
/// async fn start(focus: &dyn AudioFocusManager) -> bool {
///     matches!(focus.request_focus().await, Ok(FocusRequestResult::Granted))
/// }
/// ```
#[async_trait::async_trait]
pub trait AudioFocusManager: PlatformSendSync {
    /// Request exclusive playback focus. May block briefly on the OS policy.
    async fn request_focus(&self) -> Result<FocusRequestResult>;

    /// Give focus back. Abandoning focus that is not held is a no-op.
    async fn abandon_focus(&self) -> Result<()>;

    /// Subscribe to focus changes for this client.
    async fn subscribe_changes(&self) -> Result<Box<dyn FocusChangeStream>>;
}

/// Output route change relevant to playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteChange {
    /// Output is about to switch to the device speaker.
    BecomingNoisy,
}

/// Stream of route changes.
#[async_trait::async_trait]
pub trait RouteChangeStream: PlatformSend {
    /// Get the next route change, or `None` once the monitor is gone.
    async fn next(&mut self) -> Option<RouteChange>;
}

/// Observes the audio output route.
#[async_trait::async_trait]
pub trait OutputRouteMonitor: PlatformSendSync {
    /// Subscribe to route changes.
    async fn subscribe_changes(&self) -> Result<Box<dyn RouteChangeStream>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_regained_is_not_a_loss() {
        assert!(!FocusChange::Regained.is_loss());
        assert!(FocusChange::PermanentlyLost.is_loss());
        assert!(FocusChange::TransientlyLost.is_loss());
        assert!(FocusChange::TransientLossCanDuck.is_loss());
    }

    #[test]
    fn focus_change_serializes_snake_case() {
        let json = serde_json::to_string(&FocusChange::TransientLossCanDuck).unwrap();
        assert_eq!(json, "\"transient_loss_can_duck\"");
    }

    #[test]
    fn request_result_granted() {
        assert!(FocusRequestResult::Granted.is_granted());
        assert!(!FocusRequestResult::Denied.is_granted());
    }
}
