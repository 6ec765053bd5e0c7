//! Foreground service and persistent notification bridge.
//!
//! Mobile hosts keep a background player alive only while it is visibly
//! surfaced to the user. The core decides *when* to enter or leave that mode;
//! the host decides *how* (Android foreground service, iOS now-playing info,
//! a tray icon on desktop).

use crate::{error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};

/// Transport affordance rendered on the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    SkipToPrevious,
    Play,
    Pause,
    SkipToNext,
    Stop,
}

/// Content of the persistent "now playing" notification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaNotification {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Artwork reference (URI or path), resolved by the host.
    pub artwork: Option<String>,
    pub is_playing: bool,
    /// Ongoing notifications cannot be swiped away by the user.
    pub ongoing: bool,
    pub actions: Vec<NotificationAction>,
}

/// Host foreground-visibility control.
///
/// Implementations should treat `stop_foreground` without a prior
/// `start_foreground` as a no-op.
#[async_trait::async_trait]
pub trait ForegroundService: PlatformSendSync {
    /// Enter foreground-visible mode and post the notification.
    async fn start_foreground(&self, notification: MediaNotification) -> Result<()>;

    /// Replace the content of an already posted notification.
    async fn update_notification(&self, notification: MediaNotification) -> Result<()>;

    /// Leave foreground-visible mode, optionally removing the notification.
    async fn stop_foreground(&self, remove_notification: bool) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    mockall::mock! {
        pub Foreground {}

        #[async_trait::async_trait]
        impl ForegroundService for Foreground {
            async fn start_foreground(&self, notification: MediaNotification) -> Result<()>;
            async fn update_notification(&self, notification: MediaNotification) -> Result<()>;
            async fn stop_foreground(&self, remove_notification: bool) -> Result<()>;
        }
    }

    #[tokio::test]
    async fn trait_object_dispatch() {
        let mut mock = MockForeground::new();
        mock.expect_stop_foreground()
            .withf(|remove| *remove)
            .times(1)
            .returning(|_| Ok(()));

        let service: Box<dyn ForegroundService> = Box::new(mock);
        service.stop_foreground(true).await.unwrap();
    }
}
