//! Single-track engine wrapper.
//!
//! Owns at most one prepared adapter session. Preparing a source can be
//! slow, so the wrapper only builds the request; the caller runs
//! `PlaybackAdapter::prepare` off its event path and hands the resulting
//! session back through [`PlaybackEngine::adopt`]. Every adapter failure
//! comes back as [`PlaybackError::EngineLoadFailure`]; callers decide what
//! state the session falls back to.

use crate::error::{PlaybackError, Result};
use crate::types::QueueEntry;
use bridge_traits::playback::{
    AudioSource, PlaybackAdapter, PlaybackMetadata, PlaybackOptions, PlaybackRequest,
    PlaybackSessionId,
};
use core_async::time::{duration_to_millis, Duration};
use core_runtime::logging::strip_path;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct Loaded {
    session: PlaybackSessionId,
    source: AudioSource,
    volume: f32,
}

pub struct PlaybackEngine {
    adapter: Arc<dyn PlaybackAdapter>,
    loaded: Option<Loaded>,
}

impl PlaybackEngine {
    pub fn new(adapter: Arc<dyn PlaybackAdapter>) -> Self {
        Self {
            adapter,
            loaded: None,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn PlaybackAdapter> {
        &self.adapter
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Whether `source` is the currently prepared source.
    pub fn has_source(&self, source: &AudioSource) -> bool {
        self.loaded
            .as_ref()
            .map(|loaded| &loaded.source == source)
            .unwrap_or(false)
    }

    /// Whether an adapter event belongs to the current load.
    pub fn is_current(&self, session: PlaybackSessionId) -> bool {
        self.loaded
            .as_ref()
            .map(|loaded| loaded.session == session)
            .unwrap_or(false)
    }

    /// Volume of the loaded session.
    pub fn volume(&self) -> Option<f32> {
        self.loaded.as_ref().map(|loaded| loaded.volume)
    }

    /// Build the adapter request for `entry`.
    pub fn request_for(entry: &QueueEntry, start_ms: u64, volume: f32) -> PlaybackRequest {
        PlaybackRequest::new(entry.source.clone())
            .with_options(PlaybackOptions {
                start_position: Duration::from_millis(start_ms),
                initial_volume: volume,
            })
            .with_metadata(PlaybackMetadata {
                track_id: Some(entry.media_id.clone()),
                title: Some(entry.title.clone()),
                artist: Some(entry.artist.clone()),
                album: Some(entry.album.clone()),
                ..Default::default()
            })
    }

    /// Take ownership of a session prepared from `request`, releasing any
    /// previous one.
    pub async fn adopt(&mut self, session: PlaybackSessionId, request: &PlaybackRequest) {
        self.release().await;
        debug!(
            session = %session,
            source = strip_path(&request.source.to_string()),
            start_ms = duration_to_millis(request.options.start_position),
            "Adopted engine session"
        );
        self.loaded = Some(Loaded {
            session,
            source: request.source.clone(),
            volume: request.options.initial_volume,
        });
    }

    pub async fn play(&self) -> Result<()> {
        let session = self.session()?;
        self.adapter
            .play(session)
            .await
            .map_err(|e| PlaybackError::EngineLoadFailure(e.to_string()))
    }

    pub async fn pause(&self) -> Result<()> {
        let session = self.session()?;
        self.adapter
            .pause(session)
            .await
            .map_err(|e| PlaybackError::EngineLoadFailure(e.to_string()))
    }

    /// Seek; clamping to the track length is the adapter's job.
    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        let session = self.session()?;
        self.adapter
            .seek(session, Duration::from_millis(position_ms))
            .await
            .map_err(|e| PlaybackError::EngineLoadFailure(e.to_string()))
    }

    pub async fn set_volume(&mut self, volume: f32) -> Result<()> {
        let session = self.session()?;
        self.adapter
            .set_volume(session, volume)
            .await
            .map_err(|e| PlaybackError::EngineLoadFailure(e.to_string()))?;
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.volume = volume;
        }
        Ok(())
    }

    /// Current position, or `None` with nothing loaded or when the adapter
    /// can't say.
    pub async fn position_ms(&self) -> Option<u64> {
        let session = self.loaded.as_ref()?.session;
        match self.adapter.get_position(session).await {
            Ok(position) => Some(duration_to_millis(position)),
            Err(err) => {
                warn!(error = %err, "Failed to read engine position");
                None
            }
        }
    }

    /// Stop and discard the prepared session. Safe with nothing loaded.
    pub async fn release(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            discard(self.adapter.as_ref(), loaded.session).await;
        }
    }

    fn session(&self) -> Result<PlaybackSessionId> {
        self.loaded
            .as_ref()
            .map(|loaded| loaded.session)
            .ok_or_else(|| PlaybackError::EngineLoadFailure("no source loaded".to_string()))
    }
}

/// Stop and unload a session the engine does not own, such as one whose
/// load was abandoned while it was still being prepared.
pub async fn discard(adapter: &dyn PlaybackAdapter, session: PlaybackSessionId) {
    if let Err(err) = adapter.stop(session).await {
        debug!(error = %err, "Stop before unload failed");
    }
    if let Err(err) = adapter.unload(session).await {
        warn!(session = %session, error = %err, "Failed to unload engine session");
    }
}
