//! Foreground mode and "now playing" notification.
//!
//! [`plan`] is a pure function from the current mode and the published
//! state to the host calls that bring the two in line. The controller applies
//! the steps through a [`ForegroundWorker`], which runs them in order off the
//! controller's event path.

use crate::types::{NowPlayingMetadata, PlaybackStatus};
use bridge_traits::foreground::{ForegroundService, MediaNotification, NotificationAction};
use core_async::sync::mpsc;
use core_async::task::JoinHandle;
use std::sync::Arc;
use tracing::{debug, warn};

/// Host-side visibility of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForegroundMode {
    /// No notification, not in foreground mode.
    #[default]
    Hidden,
    /// Foreground mode with an ongoing notification.
    Foreground,
    /// Notification posted but dismissable, foreground mode released.
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForegroundStep {
    Start(MediaNotification),
    Update(MediaNotification),
    /// Leave foreground mode, keeping the notification.
    Demote,
    /// Leave foreground mode and remove the notification.
    Remove,
}

/// Steps that move the host from `mode` to match `status`, and the
/// resulting mode.
pub fn plan(
    mode: ForegroundMode,
    status: PlaybackStatus,
    metadata: Option<&NowPlayingMetadata>,
) -> (Vec<ForegroundStep>, ForegroundMode) {
    use ForegroundMode::*;

    match (status, metadata) {
        (PlaybackStatus::Playing, Some(metadata)) => {
            let notification = build_notification(metadata, true);
            let step = match mode {
                Foreground => ForegroundStep::Update(notification),
                Hidden | Background => ForegroundStep::Start(notification),
            };
            (vec![step], Foreground)
        }
        (PlaybackStatus::Paused, Some(metadata)) => {
            let notification = build_notification(metadata, false);
            match mode {
                Foreground => (
                    vec![ForegroundStep::Demote, ForegroundStep::Update(notification)],
                    Background,
                ),
                Background => (vec![ForegroundStep::Update(notification)], Background),
                // Never surfaced yet, e.g. after `prepare`.
                Hidden => (Vec::new(), Hidden),
            }
        }
        (PlaybackStatus::Stopped | PlaybackStatus::Error, _) | (_, None) => match mode {
            Hidden => (Vec::new(), Hidden),
            Foreground | Background => (vec![ForegroundStep::Remove], Hidden),
        },
    }
}

pub fn build_notification(metadata: &NowPlayingMetadata, is_playing: bool) -> MediaNotification {
    let toggle = if is_playing {
        NotificationAction::Pause
    } else {
        NotificationAction::Play
    };

    MediaNotification {
        title: metadata.title.clone(),
        artist: Some(metadata.artist.clone()),
        album: Some(metadata.album.clone()),
        artwork: metadata.artwork.clone(),
        is_playing,
        ongoing: is_playing,
        actions: vec![
            NotificationAction::SkipToPrevious,
            toggle,
            NotificationAction::SkipToNext,
            NotificationAction::Stop,
        ],
    }
}

/// Applies foreground steps in order on a background task.
pub struct ForegroundWorker {
    tx: mpsc::UnboundedSender<ForegroundStep>,
    task: JoinHandle<()>,
}

impl ForegroundWorker {
    pub fn spawn(service: Arc<dyn ForegroundService>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ForegroundStep>();
        let task = core_async::spawn(async move {
            while let Some(step) = rx.recv().await {
                apply(service.as_ref(), step).await;
            }
        });
        Self { tx, task }
    }

    /// Queue steps without waiting for the host.
    pub fn submit(&self, steps: Vec<ForegroundStep>) {
        for step in steps {
            if self.tx.send(step).is_err() {
                warn!("Foreground worker is gone; dropping step");
                return;
            }
        }
    }

    /// Finish pending steps and stop the worker.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(err) = self.task.await {
            warn!(error = %err, "Foreground worker panicked");
        }
    }
}

async fn apply(service: &dyn ForegroundService, step: ForegroundStep) {
    let result = match step {
        ForegroundStep::Start(notification) => {
            debug!(title = %notification.title, "Entering foreground mode");
            service.start_foreground(notification).await
        }
        ForegroundStep::Update(notification) => service.update_notification(notification).await,
        ForegroundStep::Demote => service.stop_foreground(false).await,
        ForegroundStep::Remove => {
            debug!("Leaving foreground mode");
            service.stop_foreground(true).await
        }
    };

    if let Err(err) = result {
        warn!(error = %err, "Foreground service call failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueueItemId;
    use bridge_traits::playback::AudioSource;

    fn metadata() -> NowPlayingMetadata {
        NowPlayingMetadata {
            queue_id: QueueItemId(0),
            media_id: "song_1".to_string(),
            title: "So What".to_string(),
            artist: "Miles Davis".to_string(),
            album: "Kind of Blue".to_string(),
            duration_ms: 545_000,
            artwork: None,
            source: AudioSource::local("/music/so_what.flac"),
        }
    }

    #[test]
    fn test_first_play_starts_foreground() {
        let meta = metadata();
        let (steps, mode) = plan(ForegroundMode::Hidden, PlaybackStatus::Playing, Some(&meta));
        assert_eq!(mode, ForegroundMode::Foreground);
        match &steps[..] {
            [ForegroundStep::Start(n)] => {
                assert!(n.is_playing && n.ongoing);
                assert!(n.actions.contains(&NotificationAction::Pause));
            }
            other => panic!("unexpected steps: {:?}", other),
        }
    }

    #[test]
    fn test_playing_again_updates() {
        let meta = metadata();
        let (steps, _) = plan(ForegroundMode::Foreground, PlaybackStatus::Playing, Some(&meta));
        assert!(matches!(&steps[..], [ForegroundStep::Update(_)]));
    }

    #[test]
    fn test_pause_demotes_and_keeps_notification() {
        let meta = metadata();
        let (steps, mode) = plan(ForegroundMode::Foreground, PlaybackStatus::Paused, Some(&meta));
        assert_eq!(mode, ForegroundMode::Background);
        match &steps[..] {
            [ForegroundStep::Demote, ForegroundStep::Update(n)] => {
                assert!(!n.ongoing);
                assert!(n.actions.contains(&NotificationAction::Play));
            }
            other => panic!("unexpected steps: {:?}", other),
        }
    }

    #[test]
    fn test_resume_from_background_restarts_foreground() {
        let meta = metadata();
        let (steps, mode) = plan(ForegroundMode::Background, PlaybackStatus::Playing, Some(&meta));
        assert_eq!(mode, ForegroundMode::Foreground);
        assert!(matches!(&steps[..], [ForegroundStep::Start(_)]));
    }

    #[test]
    fn test_paused_without_notification_posts_nothing() {
        let meta = metadata();
        let (steps, mode) = plan(ForegroundMode::Hidden, PlaybackStatus::Paused, Some(&meta));
        assert!(steps.is_empty());
        assert_eq!(mode, ForegroundMode::Hidden);
    }

    #[test]
    fn test_stop_removes_once() {
        let (steps, mode) = plan(ForegroundMode::Background, PlaybackStatus::Stopped, None);
        assert_eq!(steps, vec![ForegroundStep::Remove]);
        assert_eq!(mode, ForegroundMode::Hidden);

        let (steps, _) = plan(mode, PlaybackStatus::Stopped, None);
        assert!(steps.is_empty());
    }
}
