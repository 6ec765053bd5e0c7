//! # Playback Session Controller
//!
//! A single task owns the queue, the engine, focus and the published state.
//! Transport commands, engine completion and failure events, focus changes,
//! route changes and the delayed-stop timer all arrive as [`Message`]s on one
//! channel and are handled strictly in order.
//!
//! ```text
//!  SessionHandle ──┐
//!  engine events ──┤
//!  focus changes ──┼──► mpsc ──► SessionController ──► watch (snapshots)
//!  route changes ──┤                    │          └──► EventBus
//!  delayed stop  ──┘                    └──► ForegroundWorker
//! ```
//!
//! Engine loads run on their own task and report back with a
//! `LoadFinished` message tagged by load generation, so a slow prepare never
//! holds up the channel. A load that Stop or a newer command has abandoned is
//! unloaded when it lands.
//!
//! Background tasks only hold weak senders, so dropping every handle ends
//! the session the same way [`SessionHandle::shutdown`] does.

use crate::engine::{discard, PlaybackEngine};
use crate::error::{PlaybackError, Result};
use crate::focus::{reaction_for, FocusArbiter, FocusReaction};
use crate::foreground::{plan, ForegroundMode, ForegroundWorker};
use crate::queue::QueueManager;
use crate::types::{
    EnqueuePlacement, NowPlayingMetadata, PlaybackSnapshot, PlaybackStatus, QueueEntry,
    QueueItemId, QueueSnapshot, SessionCommand,
};
use bridge_traits::focus::{
    AudioFocusManager, FocusChange, FocusChangeStream, OutputRouteMonitor, RouteChange,
    RouteChangeStream,
};
use bridge_traits::foreground::ForegroundService;
use bridge_traits::playback::{
    AdapterEvent, AdapterEventStream, AudioSource, PlaybackAdapter, PlaybackRequest,
    PlaybackSessionId,
};
use core_async::sync::{broadcast, mpsc, oneshot, watch, CancellationToken, Mutex};
use core_async::task::JoinHandle;
use core_async::time::{duration_to_millis, sleep};
use core_library::query::{search, SearchHints};
use core_library::{BrowseTree, Song};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, QueueEvent, SessionEvent};
use core_runtime::SessionConfig;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Host bridges the controller drives.
#[derive(Clone)]
pub struct SessionBridges {
    pub playback_adapter: Arc<dyn PlaybackAdapter>,
    pub focus_manager: Arc<dyn AudioFocusManager>,
    pub foreground_service: Arc<dyn ForegroundService>,
    pub route_monitor: Option<Arc<dyn OutputRouteMonitor>>,
}

enum Message {
    Command {
        command: SessionCommand,
        ack: oneshot::Sender<()>,
    },
    /// Engine reached the end of the source prepared as `session`.
    TrackEndReached { session: PlaybackSessionId },
    EngineFailed {
        session: PlaybackSessionId,
        message: String,
    },
    LoadFinished {
        generation: u64,
        request: PlaybackRequest,
        result: std::result::Result<PlaybackSessionId, String>,
    },
    Focus(FocusChange),
    Route(RouteChange),
    DelayedStopElapsed { generation: u64 },
}

/// Engine load running on its own task.
struct PendingLoad {
    generation: u64,
    queue_id: QueueItemId,
    source: AudioSource,
    /// Acks of the commands that started it
    waiters: Vec<oneshot::Sender<()>>,
}

impl PendingLoad {
    fn settle(self) {
        for waiter in self.waiters {
            let _ = waiter.send(());
        }
    }
}

struct DelayedStop {
    generation: u64,
    token: CancellationToken,
}

pub struct SessionController {
    config: SessionConfig,
    engine: PlaybackEngine,
    focus: FocusArbiter,
    queue: QueueManager,
    browse: Arc<BrowseTree>,
    foreground: ForegroundWorker,
    foreground_mode: ForegroundMode,
    route_monitor: Option<Arc<dyn OutputRouteMonitor>>,
    noisy_listener: Option<CancellationToken>,

    status: PlaybackStatus,
    position_ms: u64,
    /// Start offset for the next load, set by seeking with nothing loaded
    start_at_ms: u64,
    volume: f32,
    error_message: Option<String>,
    active: bool,
    end_of_track: bool,
    delayed_stop: Option<DelayedStop>,
    stop_generation: u64,
    pending_load: Option<PendingLoad>,
    load_generation: u64,

    events: EventBus,
    playback_tx: watch::Sender<PlaybackSnapshot>,
    metadata_tx: watch::Sender<Option<NowPlayingMetadata>>,
    queue_tx: watch::Sender<QueueSnapshot>,
    self_tx: mpsc::WeakSender<Message>,
    shutdown: CancellationToken,
}

impl SessionController {
    /// Start the controller task.
    ///
    /// With `initial_error` set the session starts in [`PlaybackStatus::Error`]
    /// and rejects every transport command until it is shut down.
    #[instrument(skip_all, fields(in_error = initial_error.is_some()))]
    pub async fn spawn(
        bridges: SessionBridges,
        browse: Arc<BrowseTree>,
        config: SessionConfig,
        events: EventBus,
        initial_error: Option<String>,
    ) -> Result<SessionHandle> {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let shutdown = CancellationToken::new();

        let engine_events = bridges.playback_adapter.subscribe_events().await?;
        let focus = FocusArbiter::new(bridges.focus_manager);
        let focus_changes = focus.subscribe().await?;
        forward_engine_events(engine_events, tx.downgrade(), shutdown.clone());
        forward_focus_changes(focus_changes, tx.downgrade(), shutdown.clone());

        let status = if initial_error.is_some() {
            PlaybackStatus::Error
        } else {
            PlaybackStatus::Stopped
        };
        let initial = PlaybackSnapshot {
            status,
            error_message: initial_error.clone(),
            ..PlaybackSnapshot::stopped()
        };
        let (playback_tx, playback_rx) = watch::channel(initial);
        let (metadata_tx, metadata_rx) = watch::channel(None);
        let (queue_tx, queue_rx) = watch::channel(QueueSnapshot::empty());

        let controller = SessionController {
            volume: config.full_volume,
            config,
            engine: PlaybackEngine::new(bridges.playback_adapter),
            focus,
            queue: QueueManager::new(),
            browse,
            foreground: ForegroundWorker::spawn(bridges.foreground_service),
            foreground_mode: ForegroundMode::Hidden,
            route_monitor: bridges.route_monitor,
            noisy_listener: None,
            status,
            position_ms: 0,
            start_at_ms: 0,
            error_message: initial_error,
            active: false,
            end_of_track: false,
            delayed_stop: None,
            stop_generation: 0,
            pending_load: None,
            load_generation: 0,
            events: events.clone(),
            playback_tx,
            metadata_tx,
            queue_tx,
            self_tx: tx.downgrade(),
            shutdown,
        };

        if let Some(message) = &controller.error_message {
            warn!(%message, "Playback session starting in error state");
        }

        let task = core_async::spawn(controller.run(rx));

        Ok(SessionHandle {
            tx,
            playback_rx,
            metadata_rx,
            queue_rx,
            events,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Message>) {
        info!("Playback session running");
        let mut shutdown_ack = None;

        while let Some(message) = rx.recv().await {
            match message {
                Message::Command {
                    command: SessionCommand::Shutdown,
                    ack,
                } => {
                    shutdown_ack = Some(ack);
                    break;
                }
                Message::Command { command, ack } => {
                    let generation = self.load_generation;
                    self.handle_command(command).await;
                    self.acknowledge(ack, generation);
                }
                Message::TrackEndReached { session } => self.on_track_end(session).await,
                Message::EngineFailed { session, message } => {
                    if self.engine.is_current(session) {
                        self.fail_engine(&message).await;
                    } else {
                        debug!(%session, "Ignoring failure from abandoned load");
                    }
                }
                Message::LoadFinished {
                    generation,
                    request,
                    result,
                } => self.on_load_finished(generation, request, result).await,
                Message::Focus(change) => self.on_focus_change(change).await,
                Message::Route(change) => self.on_route_change(change).await,
                Message::DelayedStopElapsed { generation } => {
                    self.on_delayed_stop(generation).await
                }
            }
        }

        self.teardown().await;
        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    /// A command that started a load is acknowledged once the load settles.
    fn acknowledge(&mut self, ack: oneshot::Sender<()>, generation_before: u64) {
        match self.pending_load.as_mut() {
            Some(pending) if pending.generation > generation_before => pending.waiters.push(ack),
            _ => {
                let _ = ack.send(());
            }
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        if self.status == PlaybackStatus::Error {
            warn!(command = command.name(), "Rejecting command in error state");
            self.emit(SessionEvent::CommandRejected {
                command: command.name().to_string(),
                reason: PlaybackError::SessionInErrorState.to_string(),
            });
            return;
        }

        self.cancel_delayed_stop();
        debug!(command = command.name(), state = %self.status, "Handling command");

        match command {
            SessionCommand::Play => self.play().await,
            SessionCommand::Pause => self.pause().await,
            SessionCommand::Stop => self.stop().await,
            SessionCommand::SeekTo(position_ms) => self.seek_to(position_ms).await,
            SessionCommand::SkipToNext => self.skip_to_next().await,
            SessionCommand::SkipToPrevious => self.skip_to_previous().await,
            SessionCommand::SkipToQueueItem(id) => self.skip_to_queue_item(id).await,
            SessionCommand::PlayFromId(media_id) => self.play_from_id(&media_id).await,
            SessionCommand::PlayFromSearch { query, hints } => {
                self.play_from_search(&query, &hints).await
            }
            SessionCommand::Prepare => self.prepare().await,
            SessionCommand::Enqueue {
                media_id,
                placement,
            } => self.enqueue(&media_id, placement),
            SessionCommand::Dequeue { media_id } => self.dequeue(&media_id).await,
            // Handled by the run loop.
            SessionCommand::Shutdown => {}
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    async fn play(&mut self) {
        let Some(entry) = self.queue.current().cloned() else {
            debug!("Play with an empty queue");
            self.status = PlaybackStatus::Paused;
            self.position_ms = 0;
            self.publish();
            return;
        };

        match self.focus.request().await {
            Ok(true) => self.volume = self.config.full_volume,
            Ok(false) => {}
            Err(err) => {
                info!(error = %err, "Play ignored");
                return;
            }
        }
        self.set_active(true);

        if self.engine.has_source(&entry.source) {
            self.start_output().await;
            return;
        }
        let in_flight = self
            .pending_load
            .as_ref()
            .is_some_and(|pending| pending.queue_id == entry.id && pending.source == entry.source);
        if in_flight {
            debug!(queue_id = %entry.id, "Load already in flight");
            return;
        }
        self.begin_load(&entry).await;
    }

    /// Start the loaded engine and publish Playing.
    async fn start_output(&mut self) {
        self.start_at_ms = 0;
        if self.engine.volume() != Some(self.volume) {
            if let Err(err) = self.engine.set_volume(self.volume).await {
                warn!(volume = self.volume, error = %err, "Failed to apply volume");
            }
        }
        if let Err(err) = self.engine.play().await {
            self.fail_engine(&err.to_string()).await;
            return;
        }

        self.end_of_track = false;
        self.status = PlaybackStatus::Playing;
        if let Some(position) = self.engine.position_ms().await {
            self.position_ms = position;
        }
        self.listen_for_noisy_output();
        self.publish();
    }

    async fn pause(&mut self) {
        self.abandon_load();
        if self.status != PlaybackStatus::Playing {
            return;
        }

        if self.engine.is_loaded() {
            if let Err(err) = self.engine.pause().await {
                warn!(error = %err, "Engine pause failed");
            }
        }
        if let Some(position) = self.engine.position_ms().await {
            self.position_ms = position;
        }
        self.status = PlaybackStatus::Paused;
        self.stop_listening_for_noisy_output();
        self.publish();
    }

    async fn stop(&mut self) {
        self.release_resources().await;
        if self.status != PlaybackStatus::Error {
            self.status = PlaybackStatus::Stopped;
        }
        self.position_ms = 0;
        self.start_at_ms = 0;
        self.end_of_track = false;
        self.set_active(false);
        self.publish();
    }

    async fn seek_to(&mut self, position_ms: u64) {
        if self.engine.is_loaded() {
            if let Err(err) = self.engine.seek(position_ms).await {
                warn!(position_ms, error = %err, "Seek failed");
                return;
            }
            self.position_ms = self.engine.position_ms().await.unwrap_or(position_ms);
        } else {
            self.start_at_ms = position_ms;
            self.position_ms = position_ms;
        }
        self.end_of_track = false;
        self.publish();
    }

    async fn skip_to_queue_item(&mut self, id: QueueItemId) {
        let Some(index) = self.queue.index_of(id) else {
            debug!(queue_id = %id, "Skip to unknown queue item");
            return;
        };

        if self.queue.active_index() == Some(index) {
            self.seek_to(0).await;
            return;
        }

        self.queue.set_active(index);
        self.cursor_moved();
        self.play().await;
    }

    async fn skip_to_next(&mut self) {
        if self.queue.is_empty() {
            debug!("Skip to next with an empty queue");
            self.pause().await;
            return;
        }

        if self.queue.advance() {
            self.cursor_moved();
            self.play().await;
        } else if self.end_of_track {
            debug!("End of queue reached");
            self.pause().await;
            self.engine.release().await;
            self.end_of_track = false;
        } else {
            debug!("Already at the last queue entry");
        }
    }

    async fn skip_to_previous(&mut self) {
        if self.queue.is_empty() {
            debug!("Skip to previous with an empty queue");
            self.pause().await;
            return;
        }

        if self.queue.rewind() {
            self.cursor_moved();
            self.play().await;
        } else {
            self.seek_to(0).await;
        }
    }

    async fn play_from_id(&mut self, media_id: &str) {
        match self.browse.resolve(media_id) {
            Some(resolution) => {
                self.replace_queue(&resolution.songs, resolution.active_index);
                self.play().await;
            }
            None => {
                warn!(media_id, "Nothing playable behind media id");
                self.pause().await;
            }
        }
    }

    async fn play_from_search(&mut self, query: &str, hints: &SearchHints) {
        let results = search(self.browse.catalog(), query, hints);
        if results.is_empty() {
            info!(query, facet = ?hints.facet, "Search found nothing to play");
            self.pause().await;
            return;
        }

        self.replace_queue(&results, 0);
        self.play().await;
    }

    async fn prepare(&mut self) {
        if !self.queue.is_empty() {
            if self.status == PlaybackStatus::Playing {
                debug!("Prepare while playing");
                return;
            }
            self.abandon_load();
            if self.engine.is_loaded() {
                if let Err(err) = self.engine.seek(0).await {
                    warn!(error = %err, "Rewind on prepare failed");
                }
            }
            self.start_at_ms = 0;
            self.position_ms = 0;
            self.status = PlaybackStatus::Paused;
            self.publish();
            return;
        }

        let browse = Arc::clone(&self.browse);
        let songs = browse.catalog().songs();
        if !songs.is_empty() {
            let index = rand::thread_rng().gen_range(0..songs.len());
            self.replace_queue(songs, index);
            self.set_active(true);
        }
        self.status = PlaybackStatus::Paused;
        self.publish();
    }

    // ========================================================================
    // Queue editing
    // ========================================================================

    fn enqueue(&mut self, media_id: &str, placement: EnqueuePlacement) {
        let song = match self.browse.playable(media_id) {
            Ok(song) => song,
            Err(err) => {
                warn!(media_id, error = %err, "Cannot enqueue");
                return;
            }
        };

        let id = match placement {
            EnqueuePlacement::AtEnd => self.queue.push_back(&song).id,
            EnqueuePlacement::AtNext => self.queue.insert_next(&song).id,
        };
        let index = self.queue.index_of(id).unwrap_or_default();
        debug!(media_id, index, "Enqueued");
        self.emit(QueueEvent::EntryAdded {
            media_id: media_id.to_string(),
            index,
        });
        self.publish();
    }

    async fn dequeue(&mut self, media_id: &str) {
        let previous = self.queue.current().map(|entry| entry.id);
        let Some(removed) = self.queue.remove_by_media_id(media_id) else {
            debug!(media_id, "Dequeue of an entry not in the queue");
            return;
        };
        self.emit(QueueEvent::EntryRemoved {
            media_id: removed.media_id.clone(),
        });

        if self.queue.is_empty() {
            self.stop().await;
            return;
        }

        if previous == Some(removed.id) {
            self.cursor_moved();
            if self.status == PlaybackStatus::Playing {
                self.publish();
                self.play().await;
                return;
            }
            self.abandon_load();
            self.engine.release().await;
        }
        self.publish();
    }

    fn replace_queue(&mut self, songs: &[Song], active_index: usize) {
        self.queue.replace(songs, active_index);
        self.cursor_moved();
        let active_index = self
            .queue
            .active_index()
            .map(|index| index as i64)
            .unwrap_or(-1);
        info!(len = songs.len(), active_index, "Queue replaced");
        self.emit(QueueEvent::Replaced {
            len: songs.len(),
            active_index,
        });
        self.publish();
    }

    fn cursor_moved(&mut self) {
        self.start_at_ms = 0;
        self.position_ms = 0;
        self.end_of_track = false;
    }

    // ========================================================================
    // Asynchronous inputs
    // ========================================================================

    async fn on_track_end(&mut self, session: PlaybackSessionId) {
        if !self.engine.is_current(session) || self.status == PlaybackStatus::Error {
            debug!(%session, "Ignoring completion from abandoned load");
            return;
        }

        if let Some(entry) = self.queue.current() {
            self.emit(PlaybackEvent::TrackEnded {
                media_id: entry.media_id.clone(),
            });
        }
        self.end_of_track = true;
        self.skip_to_next().await;
    }

    async fn on_focus_change(&mut self, change: FocusChange) {
        self.emit(SessionEvent::FocusChanged { change });
        self.focus.observe(change);

        match reaction_for(change, &self.config) {
            FocusReaction::SetVolume(volume) => {
                self.volume = volume;
                if self.engine.is_loaded() {
                    if let Err(err) = self.engine.set_volume(volume).await {
                        warn!(volume, error = %err, "Failed to apply focus volume");
                    }
                }
            }
            FocusReaction::Pause { arm_delayed_stop } => {
                self.abandon_load();
                if matches!(self.status, PlaybackStatus::Stopped | PlaybackStatus::Error) {
                    debug!(?change, "Ignoring focus loss while stopped");
                    return;
                }
                self.pause().await;
                if arm_delayed_stop {
                    self.arm_delayed_stop();
                }
            }
        }
    }

    async fn on_route_change(&mut self, change: RouteChange) {
        match change {
            RouteChange::BecomingNoisy => {
                if self.status == PlaybackStatus::Playing {
                    info!("Output becoming noisy; pausing");
                    self.pause().await;
                }
            }
        }
    }

    async fn on_delayed_stop(&mut self, generation: u64) {
        match &self.delayed_stop {
            Some(pending) if pending.generation == generation => {
                self.delayed_stop = None;
                info!("Delayed stop fired");
                self.emit(SessionEvent::DelayedStopFired);
                self.stop().await;
            }
            _ => debug!(generation, "Ignoring stale delayed stop"),
        }
    }

    async fn on_load_finished(
        &mut self,
        generation: u64,
        request: PlaybackRequest,
        result: std::result::Result<PlaybackSessionId, String>,
    ) {
        let pending = match self.pending_load.take() {
            Some(pending) if pending.generation == generation => pending,
            other => {
                self.pending_load = other;
                if let Ok(session) = result {
                    debug!(generation, %session, "Discarding session from abandoned load");
                    discard(self.engine.adapter().as_ref(), session).await;
                }
                return;
            }
        };

        match result {
            Ok(session) => {
                self.engine.adopt(session, &request).await;
                let requested_ms = duration_to_millis(request.options.start_position);
                if self.start_at_ms != requested_ms {
                    if let Err(err) = self.engine.seek(self.start_at_ms).await {
                        warn!(position_ms = self.start_at_ms, error = %err, "Seek after load failed");
                    }
                }
                self.start_output().await;
            }
            Err(message) => {
                let err = PlaybackError::EngineLoadFailure(message);
                self.fail_engine(&err.to_string()).await;
            }
        }
        pending.settle();
    }

    async fn fail_engine(&mut self, message: &str) {
        error!(error = message, "Engine failure; stopping session");
        self.emit(PlaybackEvent::Error {
            message: message.to_string(),
            recoverable: true,
        });
        self.stop().await;
    }

    // ========================================================================
    // Engine loads
    // ========================================================================

    /// Prepare `entry` on its own task, replacing whatever was loaded.
    async fn begin_load(&mut self, entry: &QueueEntry) {
        self.abandon_load();
        self.engine.release().await;

        self.load_generation += 1;
        let generation = self.load_generation;
        let request = PlaybackEngine::request_for(entry, self.start_at_ms, self.volume);
        let adapter = Arc::clone(self.engine.adapter());
        let tx = self.self_tx.clone();
        debug!(generation, queue_id = %entry.id, "Loading entry");

        core_async::spawn(async move {
            let result = adapter
                .prepare(request.clone())
                .await
                .map_err(|err| err.to_string());
            let prepared = result.as_ref().ok().copied();
            let finished = Message::LoadFinished {
                generation,
                request,
                result,
            };
            if !deliver(&tx, finished).await {
                if let Some(session) = prepared {
                    discard(adapter.as_ref(), session).await;
                }
            }
        });

        self.pending_load = Some(PendingLoad {
            generation,
            queue_id: entry.id,
            source: entry.source.clone(),
            waiters: Vec::new(),
        });
        self.publish();
    }

    fn abandon_load(&mut self) {
        if let Some(pending) = self.pending_load.take() {
            debug!(generation = pending.generation, "Abandoning engine load");
            pending.settle();
        }
    }

    // ========================================================================
    // Timers and listeners
    // ========================================================================

    fn arm_delayed_stop(&mut self) {
        if self.delayed_stop.is_some() {
            return;
        }

        self.stop_generation += 1;
        let generation = self.stop_generation;
        let token = CancellationToken::new();
        let timeout = self.config.delayed_stop_timeout;
        let tx = self.self_tx.clone();
        let cancelled = token.clone();

        core_async::spawn(async move {
            core_async::select! {
                _ = cancelled.cancelled() => {}
                _ = sleep(timeout) => {
                    deliver(&tx, Message::DelayedStopElapsed { generation }).await;
                }
            }
        });

        let timeout_ms = duration_to_millis(timeout);
        info!(timeout_ms, "Delayed stop armed");
        self.delayed_stop = Some(DelayedStop { generation, token });
        self.emit(SessionEvent::DelayedStopArmed { timeout_ms });
    }

    fn cancel_delayed_stop(&mut self) {
        if let Some(pending) = self.delayed_stop.take() {
            pending.token.cancel();
            debug!(generation = pending.generation, "Delayed stop cancelled");
            self.emit(SessionEvent::DelayedStopCancelled);
        }
    }

    fn listen_for_noisy_output(&mut self) {
        if self.noisy_listener.is_some() {
            return;
        }
        let Some(monitor) = self.route_monitor.clone() else {
            return;
        };

        let token = self.shutdown.child_token();
        let cancelled = token.clone();
        let tx = self.self_tx.clone();
        core_async::spawn(async move {
            let mut changes = match monitor.subscribe_changes().await {
                Ok(changes) => changes,
                Err(err) => {
                    warn!(error = %err, "Route monitor unavailable");
                    return;
                }
            };
            loop {
                let change = core_async::select! {
                    _ = cancelled.cancelled() => break,
                    change = changes.next() => change,
                };
                let Some(change) = change else { break };
                if !deliver(&tx, Message::Route(change)).await {
                    break;
                }
            }
        });
        self.noisy_listener = Some(token);
    }

    fn stop_listening_for_noisy_output(&mut self) {
        if let Some(token) = self.noisy_listener.take() {
            token.cancel();
        }
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    fn publish(&mut self) {
        let hide_cursor = matches!(self.status, PlaybackStatus::Stopped | PlaybackStatus::Error);
        let active = if hide_cursor {
            None
        } else {
            self.queue.current()
        };
        let active_queue_id = active.map(|entry| entry.id);
        let metadata = active.map(NowPlayingMetadata::from);

        let snapshot = PlaybackSnapshot {
            status: self.status,
            position_ms: self.position_ms,
            active_queue_id,
            speed: 1.0,
            error_message: self.error_message.clone(),
        };

        let state_changed = send_if_changed(&self.playback_tx, snapshot);
        let metadata_changed = send_if_changed(&self.metadata_tx, metadata.clone());
        send_if_changed(&self.queue_tx, self.queue.snapshot(hide_cursor));

        if metadata_changed {
            if let Some(metadata) = &metadata {
                self.emit(PlaybackEvent::TrackChanged {
                    media_id: metadata.media_id.clone(),
                    title: metadata.title.clone(),
                });
            }
        }
        if state_changed {
            debug!(
                state = %self.status,
                position_ms = self.position_ms,
                queue_id = ?active_queue_id,
                "Published playback state"
            );
            self.emit(PlaybackEvent::StateChanged {
                state: self.status.as_str().to_string(),
                position_ms: self.position_ms,
                active_queue_id: active_queue_id.map(|id| id.0),
            });
        }
        if state_changed || metadata_changed {
            let (steps, mode) = plan(self.foreground_mode, self.status, metadata.as_ref());
            self.foreground_mode = mode;
            self.foreground.submit(steps);
        }
    }

    fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        if active {
            info!("Session activated");
            self.emit(SessionEvent::Activated);
        } else {
            info!("Session deactivated");
            self.emit(SessionEvent::Deactivated);
        }
    }

    fn emit(&self, event: impl Into<CoreEvent>) {
        self.events.emit(event.into()).ok();
    }

    async fn release_resources(&mut self) {
        self.abandon_load();
        self.cancel_delayed_stop();
        self.stop_listening_for_noisy_output();
        self.focus.abandon().await;
        self.engine.release().await;
    }

    async fn teardown(mut self) {
        self.stop().await;
        self.shutdown.cancel();
        self.foreground.close().await;
        info!("Playback session shut down");
    }
}

fn send_if_changed<T: PartialEq>(tx: &watch::Sender<T>, value: T) -> bool {
    tx.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    })
}

async fn deliver(tx: &mpsc::WeakSender<Message>, message: Message) -> bool {
    match tx.upgrade() {
        Some(tx) => tx.send(message).await.is_ok(),
        None => false,
    }
}

fn forward_engine_events(
    mut events: Box<dyn AdapterEventStream>,
    tx: mpsc::WeakSender<Message>,
    shutdown: CancellationToken,
) {
    core_async::spawn(async move {
        loop {
            let event = core_async::select! {
                _ = shutdown.cancelled() => break,
                event = events.next() => event,
            };
            let message = match event {
                Some(AdapterEvent::Completed { session }) => Message::TrackEndReached { session },
                Some(AdapterEvent::Failed { session, message }) => {
                    Message::EngineFailed { session, message }
                }
                None => break,
            };
            if !deliver(&tx, message).await {
                break;
            }
        }
    });
}

fn forward_focus_changes(
    mut changes: Box<dyn FocusChangeStream>,
    tx: mpsc::WeakSender<Message>,
    shutdown: CancellationToken,
) {
    core_async::spawn(async move {
        loop {
            let change = core_async::select! {
                _ = shutdown.cancelled() => break,
                change = changes.next() => change,
            };
            let Some(change) = change else { break };
            if !deliver(&tx, Message::Focus(change)).await {
                break;
            }
        }
    });
}

/// Cloneable handle to a running session.
///
/// Every transport method waits until the controller has processed the
/// command, including any engine load it started, and fails only with
/// [`PlaybackError::SessionClosed`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Message>,
    playback_rx: watch::Receiver<PlaybackSnapshot>,
    metadata_rx: watch::Receiver<Option<NowPlayingMetadata>>,
    queue_rx: watch::Receiver<QueueSnapshot>,
    events: EventBus,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Message::Command { command, ack })
            .await
            .map_err(|_| PlaybackError::SessionClosed)?;
        done.await.map_err(|_| PlaybackError::SessionClosed)
    }

    pub async fn play(&self) -> Result<()> {
        self.send(SessionCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(SessionCommand::Pause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(SessionCommand::Stop).await
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.send(SessionCommand::SeekTo(position_ms)).await
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        self.send(SessionCommand::SkipToNext).await
    }

    pub async fn skip_to_previous(&self) -> Result<()> {
        self.send(SessionCommand::SkipToPrevious).await
    }

    pub async fn skip_to_queue_item(&self, id: QueueItemId) -> Result<()> {
        self.send(SessionCommand::SkipToQueueItem(id)).await
    }

    pub async fn play_from_id(&self, media_id: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::PlayFromId(media_id.into())).await
    }

    pub async fn play_from_search(&self, query: impl Into<String>, hints: SearchHints) -> Result<()> {
        self.send(SessionCommand::PlayFromSearch {
            query: query.into(),
            hints,
        })
        .await
    }

    pub async fn prepare(&self) -> Result<()> {
        self.send(SessionCommand::Prepare).await
    }

    pub async fn enqueue(&self, media_id: impl Into<String>, placement: EnqueuePlacement) -> Result<()> {
        self.send(SessionCommand::Enqueue {
            media_id: media_id.into(),
            placement,
        })
        .await
    }

    pub async fn dequeue(&self, media_id: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::Dequeue {
            media_id: media_id.into(),
        })
        .await
    }

    /// Run a named custom action. Unknown actions are logged and ignored.
    pub async fn custom_action(&self, name: &str, args: &BTreeMap<String, String>) -> Result<()> {
        match SessionCommand::from_custom_action(name, args) {
            Some(command) => self.send(command).await,
            None => {
                warn!(action = name, "Ignoring unknown custom action");
                Ok(())
            }
        }
    }

    /// Stop the session and end the controller task. Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        // A closed channel means the controller is already gone.
        self.send(SessionCommand::Shutdown).await.ok();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(err) = task.await {
                error!(error = %err, "Playback session task panicked");
            }
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn playback_state(&self) -> PlaybackSnapshot {
        self.playback_rx.borrow().clone()
    }

    pub fn now_playing(&self) -> Option<NowPlayingMetadata> {
        self.metadata_rx.borrow().clone()
    }

    pub fn queue(&self) -> QueueSnapshot {
        self.queue_rx.borrow().clone()
    }

    pub fn subscribe_playback(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.playback_rx.clone()
    }

    pub fn subscribe_metadata(&self) -> watch::Receiver<Option<NowPlayingMetadata>> {
        self.metadata_rx.clone()
    }

    pub fn subscribe_queue(&self) -> watch::Receiver<QueueSnapshot> {
        self.queue_rx.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }
}
