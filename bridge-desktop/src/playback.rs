//! Clock-driven playback adapter.
//!
//! Desktop builds have no system media player to delegate to, so this adapter
//! probes each source with `symphonia` for its duration and then tracks the
//! play head with a monotonic clock. When the play head reaches the end an
//! [`AdapterEvent::Completed`] is broadcast, which is what the session core
//! needs to drive auto-advance. Sample output is left to the host.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{
        AdapterEvent, AdapterEventStream, AdapterState, AudioSource, PlaybackAdapter,
        PlaybackRequest, PlaybackSessionId,
    },
};
use core_async::sync::{broadcast, CancellationToken, Mutex};
use core_async::time::{Duration, Instant};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

const EVENT_CAPACITY: usize = 32;

struct Prepared {
    source: AudioSource,
    duration: Option<Duration>,
    volume: f32,
    state: AdapterState,
    /// Position accumulated before the current run.
    offset: Duration,
    /// Set while playing.
    started_at: Option<Instant>,
    /// Cancels the pending completion timer of the current run.
    run: Option<CancellationToken>,
}

impl Prepared {
    fn position(&self) -> Duration {
        let raw = match self.started_at {
            Some(started) => self.offset + started.elapsed(),
            None => self.offset,
        };
        match self.duration {
            Some(total) => raw.min(total),
            None => raw,
        }
    }

    fn halt(&mut self) {
        self.offset = self.position();
        self.started_at = None;
        if let Some(run) = self.run.take() {
            run.cancel();
        }
    }
}

/// Desktop [`PlaybackAdapter`] tracking position with a monotonic clock.
pub struct ClockedPlaybackAdapter {
    sessions: Arc<Mutex<HashMap<PlaybackSessionId, Prepared>>>,
    events: broadcast::Sender<AdapterEvent>,
}

impl ClockedPlaybackAdapter {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Report an output failure for a prepared session, e.g. when the audio
    /// device disappears. The session moves to the error state.
    pub async fn report_failure(&self, session: PlaybackSessionId, message: impl Into<String>) {
        let message = message.into();
        let mut sessions = self.sessions.lock().await;
        if let Some(prepared) = sessions.get_mut(&session) {
            prepared.halt();
            prepared.state = AdapterState::Error {
                message: message.clone(),
            };
            let _ = self.events.send(AdapterEvent::Failed { session, message });
        }
    }

    /// Source currently prepared under `session`, if any.
    pub async fn source_of(&self, session: PlaybackSessionId) -> Option<AudioSource> {
        let sessions = self.sessions.lock().await;
        sessions.get(&session).map(|p| p.source.clone())
    }

    /// Last volume applied to `session`.
    pub async fn volume_of(&self, session: PlaybackSessionId) -> Option<f32> {
        let sessions = self.sessions.lock().await;
        sessions.get(&session).map(|p| p.volume)
    }

    async fn probe(source: &AudioSource) -> Result<Option<Duration>> {
        match source {
            AudioSource::LocalFile { path } => {
                let path = path.clone();
                core_async::task::spawn_blocking(move || probe_duration(&path))
                    .await
                    .map_err(|e| BridgeError::OperationFailed(format!("Probe task failed: {}", e)))?
            }
            // Remote streams report no duration until the host fetches them.
            AudioSource::RemoteStream { .. } => Ok(None),
        }
    }

    fn schedule_completion(
        &self,
        session: PlaybackSessionId,
        remaining: Duration,
        run: CancellationToken,
    ) {
        let sessions = Arc::clone(&self.sessions);
        let events = self.events.clone();
        core_async::spawn(async move {
            tokio::select! {
                _ = run.cancelled() => {}
                _ = core_async::time::sleep(remaining) => {
                    let mut guard = sessions.lock().await;
                    let Some(prepared) = guard.get_mut(&session) else {
                        return;
                    };
                    // A pause or seek may have raced the timer.
                    if run.is_cancelled() {
                        return;
                    }
                    prepared.offset = prepared.duration.unwrap_or(prepared.offset);
                    prepared.started_at = None;
                    prepared.run = None;
                    prepared.state = AdapterState::Completed;
                    debug!(%session, "Source completed");
                    let _ = events.send(AdapterEvent::Completed { session });
                }
            }
        });
    }

    fn start_run(&self, session: PlaybackSessionId, prepared: &mut Prepared) {
        prepared.started_at = Some(Instant::now());
        prepared.state = AdapterState::Playing;
        if let Some(total) = prepared.duration {
            let run = CancellationToken::new();
            prepared.run = Some(run.clone());
            self.schedule_completion(session, total.saturating_sub(prepared.offset), run);
        }
    }
}

impl Default for ClockedPlaybackAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn probe_duration(path: &Path) -> Result<Option<Duration>> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to probe {}: {}", display_name(path), e))
        })?;

    let duration = probed.format.default_track().and_then(|track| {
        let params = &track.codec_params;
        match (params.time_base, params.n_frames) {
            (Some(time_base), Some(n_frames)) => {
                let time = time_base.calc_time(n_frames);
                Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
            }
            _ => None,
        }
    });

    Ok(duration)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).display().to_string())
}

fn unknown(session: PlaybackSessionId) -> BridgeError {
    BridgeError::UnknownSession(session.to_string())
}

#[async_trait]
impl PlaybackAdapter for ClockedPlaybackAdapter {
    async fn prepare(&self, request: PlaybackRequest) -> Result<PlaybackSessionId> {
        let duration = Self::probe(&request.source).await?;
        let session = PlaybackSessionId::new();
        let offset = match duration {
            Some(total) => request.options.start_position.min(total),
            None => request.options.start_position,
        };

        debug!(
            %session,
            duration_ms = duration.map(|d| d.as_millis() as u64),
            "Prepared source"
        );

        self.sessions.lock().await.insert(
            session,
            Prepared {
                source: request.source,
                duration,
                volume: request.options.initial_volume.clamp(0.0, 1.0),
                state: AdapterState::Idle,
                offset,
                started_at: None,
                run: None,
            },
        );
        Ok(session)
    }

    async fn play(&self, session: PlaybackSessionId) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let prepared = sessions.get_mut(&session).ok_or_else(|| unknown(session))?;
        if let AdapterState::Error { message } = &prepared.state {
            return Err(BridgeError::OperationFailed(format!(
                "Session {} is in error state: {}",
                session, message
            )));
        }
        if prepared.state == AdapterState::Playing {
            return Ok(());
        }
        if prepared.state == AdapterState::Completed {
            prepared.offset = Duration::ZERO;
        }
        self.start_run(session, prepared);
        Ok(())
    }

    async fn pause(&self, session: PlaybackSessionId) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let prepared = sessions.get_mut(&session).ok_or_else(|| unknown(session))?;
        if prepared.state == AdapterState::Playing {
            prepared.halt();
            prepared.state = AdapterState::Paused;
        }
        Ok(())
    }

    async fn stop(&self, session: PlaybackSessionId) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let prepared = sessions.get_mut(&session).ok_or_else(|| unknown(session))?;
        prepared.halt();
        prepared.offset = Duration::ZERO;
        prepared.state = AdapterState::Stopped;
        Ok(())
    }

    async fn seek(&self, session: PlaybackSessionId, position: Duration) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let prepared = sessions.get_mut(&session).ok_or_else(|| unknown(session))?;
        let was_playing = prepared.state == AdapterState::Playing;
        prepared.halt();
        prepared.offset = match prepared.duration {
            Some(total) => position.min(total),
            None => position,
        };
        if was_playing {
            self.start_run(session, prepared);
        }
        Ok(())
    }

    async fn set_volume(&self, session: PlaybackSessionId, volume: f32) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let prepared = sessions.get_mut(&session).ok_or_else(|| unknown(session))?;
        prepared.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    async fn get_position(&self, session: PlaybackSessionId) -> Result<Duration> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&session)
            .map(Prepared::position)
            .ok_or_else(|| unknown(session))
    }

    async fn state(&self, session: PlaybackSessionId) -> Result<AdapterState> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&session)
            .map(|p| p.state.clone())
            .ok_or_else(|| unknown(session))
    }

    async fn unload(&self, session: PlaybackSessionId) -> Result<()> {
        if let Some(mut prepared) = self.sessions.lock().await.remove(&session) {
            prepared.halt();
            debug!(%session, "Unloaded source");
        } else {
            warn!(%session, "Unload for unknown session ignored");
        }
        Ok(())
    }

    async fn subscribe_events(&self) -> Result<Box<dyn AdapterEventStream>> {
        Ok(Box::new(BroadcastAdapterEvents {
            receiver: self.events.subscribe(),
        }))
    }
}

struct BroadcastAdapterEvents {
    receiver: broadcast::Receiver<AdapterEvent>,
}

#[async_trait]
impl AdapterEventStream for BroadcastAdapterEvents {
    async fn next(&mut self) -> Option<AdapterEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Adapter event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(url: &str) -> PlaybackRequest {
        PlaybackRequest::new(AudioSource::RemoteStream {
            url: url.to_string(),
            headers: HashMap::new(),
        })
    }

    #[tokio::test]
    async fn prepare_missing_file_fails() {
        let adapter = ClockedPlaybackAdapter::new();
        let result = adapter
            .prepare(PlaybackRequest::new(AudioSource::local(
                "/definitely/not/here.flac",
            )))
            .await;
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }

    #[tokio::test]
    async fn play_pause_tracks_position() {
        let adapter = ClockedPlaybackAdapter::new();
        let session = adapter.prepare(remote("https://example.com/a.mp3")).await.unwrap();
        assert_eq!(adapter.state(session).await.unwrap(), AdapterState::Idle);

        adapter.play(session).await.unwrap();
        core_async::time::sleep(Duration::from_millis(20)).await;
        adapter.pause(session).await.unwrap();

        let paused_at = adapter.get_position(session).await.unwrap();
        assert!(paused_at >= Duration::from_millis(20));
        core_async::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(adapter.get_position(session).await.unwrap(), paused_at);
        assert_eq!(adapter.state(session).await.unwrap(), AdapterState::Paused);
    }

    #[tokio::test]
    async fn stop_rewinds_and_seek_sets_position() {
        let adapter = ClockedPlaybackAdapter::new();
        let session = adapter.prepare(remote("https://example.com/a.mp3")).await.unwrap();

        adapter.seek(session, Duration::from_secs(42)).await.unwrap();
        assert_eq!(
            adapter.get_position(session).await.unwrap(),
            Duration::from_secs(42)
        );

        adapter.stop(session).await.unwrap();
        assert_eq!(adapter.get_position(session).await.unwrap(), Duration::ZERO);
        assert_eq!(adapter.state(session).await.unwrap(), AdapterState::Stopped);
    }

    #[tokio::test]
    async fn volume_is_clamped() {
        let adapter = ClockedPlaybackAdapter::new();
        let session = adapter.prepare(remote("https://example.com/a.mp3")).await.unwrap();
        adapter.set_volume(session, 3.0).await.unwrap();
        assert_eq!(adapter.volume_of(session).await, Some(1.0));
    }

    #[tokio::test]
    async fn unload_is_idempotent() {
        let adapter = ClockedPlaybackAdapter::new();
        let session = adapter.prepare(remote("https://example.com/a.mp3")).await.unwrap();
        adapter.unload(session).await.unwrap();
        adapter.unload(session).await.unwrap();
        assert!(matches!(
            adapter.play(session).await,
            Err(BridgeError::UnknownSession(_))
        ));
    }

    #[tokio::test]
    async fn reported_failure_is_broadcast() {
        let adapter = ClockedPlaybackAdapter::new();
        let mut events = adapter.subscribe_events().await.unwrap();
        let session = adapter.prepare(remote("https://example.com/a.mp3")).await.unwrap();
        adapter.play(session).await.unwrap();

        adapter.report_failure(session, "device removed").await;

        assert_eq!(
            events.next().await,
            Some(AdapterEvent::Failed {
                session,
                message: "device removed".to_string()
            })
        );
        assert!(adapter.play(session).await.is_err());
    }

    #[tokio::test]
    async fn completion_fires_once_duration_elapses() {
        let adapter = ClockedPlaybackAdapter::new();
        let mut events = adapter.subscribe_events().await.unwrap();
        let session = PlaybackSessionId::new();
        adapter.sessions.lock().await.insert(
            session,
            Prepared {
                source: AudioSource::local("/music/short.wav"),
                duration: Some(Duration::from_millis(30)),
                volume: 1.0,
                state: AdapterState::Idle,
                offset: Duration::ZERO,
                started_at: None,
                run: None,
            },
        );

        adapter.play(session).await.unwrap();
        let event = core_async::time::timeout(Duration::from_secs(1), events.next())
            .await
            .unwrap();
        assert_eq!(event, Some(AdapterEvent::Completed { session }));
        assert_eq!(adapter.state(session).await.unwrap(), AdapterState::Completed);
    }

    #[tokio::test]
    async fn pause_cancels_pending_completion() {
        let adapter = ClockedPlaybackAdapter::new();
        let mut events = adapter.subscribe_events().await.unwrap();
        let session = PlaybackSessionId::new();
        adapter.sessions.lock().await.insert(
            session,
            Prepared {
                source: AudioSource::local("/music/short.wav"),
                duration: Some(Duration::from_millis(40)),
                volume: 1.0,
                state: AdapterState::Idle,
                offset: Duration::ZERO,
                started_at: None,
                run: None,
            },
        );

        adapter.play(session).await.unwrap();
        adapter.pause(session).await.unwrap();

        let next = core_async::time::timeout(Duration::from_millis(100), events.next()).await;
        assert!(next.is_err(), "no completion expected after pause");
    }
}
