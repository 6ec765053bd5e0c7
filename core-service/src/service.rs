//! Service bootstrap and the per-client connection surface.

use crate::access::AccessGate;
use crate::error::{CoreError, Result};
use bridge_traits::{ClientIdentity, PermissionProbe};
use core_async::sync::{broadcast, watch};
use core_library::{BrowseTree, Catalog, MediaId, MediaItem, SearchHints};
use core_playback::{
    NowPlayingMetadata, PlaybackError, PlaybackSnapshot, QueueItemId, QueueSnapshot,
    SessionBridges, SessionController, SessionHandle,
};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use core_runtime::CoreConfig;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Shown to the user when the device denies media access.
pub const PERMISSION_MESSAGE: &str =
    "Media library access is required to play music. Grant access and restart the app.";

/// Running media session: one controller, one catalog, one access gate.
#[derive(Clone)]
pub struct CoreService {
    session: SessionHandle,
    browse: Arc<BrowseTree>,
    gate: Arc<AccessGate>,
    events: EventBus,
}

impl CoreService {
    /// Run the permission pre-flight, load the catalog and start the session.
    ///
    /// A failed pre-flight or catalog load does not fail the bootstrap: the
    /// session starts in the error state with a user-facing message instead.
    #[instrument(skip_all, fields(clients = config.allowed_clients.len()))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let events = EventBus::new(config.event_buffer_size);

        let mut failure = preflight(config.permission_probe.as_deref()).await;
        let catalog = match &failure {
            Some(_) => Catalog::empty(),
            None => match Catalog::load(&*config.media_index).await {
                Ok(catalog) => catalog,
                Err(err) => {
                    warn!(error = %err, "Media index unavailable");
                    failure = Some(format!("Your music library could not be read: {}", err));
                    Catalog::empty()
                }
            },
        };
        info!(songs = catalog.len(), "Catalog ready");

        let browse = Arc::new(BrowseTree::new(Arc::new(catalog)));
        let bridges = SessionBridges {
            playback_adapter: config.playback_adapter.clone(),
            focus_manager: config.focus_manager.clone(),
            foreground_service: config.foreground_service.clone(),
            route_monitor: config.route_monitor.clone(),
        };
        let session = SessionController::spawn(
            bridges,
            Arc::clone(&browse),
            config.session.clone(),
            events.clone(),
            failure,
        )
        .await?;

        Ok(Self {
            session,
            browse,
            gate: Arc::new(AccessGate::from_config(&config)),
            events,
        })
    }

    /// Check `client` against the allow-list and open a connection for it.
    ///
    /// Rejected clients still get a connection, but it has no root and
    /// refuses every call.
    pub fn connect(&self, client: ClientIdentity) -> Connection {
        let accepted = self.gate.is_allowed(&client);
        if accepted {
            info!(%client, "Client connected");
        } else {
            warn!(%client, "Rejecting unknown client");
            self.events
                .emit(CoreEvent::Session(SessionEvent::ClientRejected {
                    package: client.package.clone(),
                }))
                .ok();
        }

        Connection {
            client,
            accepted,
            session: self.session.clone(),
            browse: Arc::clone(&self.browse),
        }
    }

    /// Handle for in-process callers that bypass the access gate.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn browse(&self) -> &Arc<BrowseTree> {
        &self.browse
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.session.shutdown().await?;
        Ok(())
    }
}

async fn preflight(probe: Option<&dyn PermissionProbe>) -> Option<String> {
    let Some(probe) = probe else {
        return None;
    };
    match probe.has_media_access().await {
        Ok(true) => None,
        Ok(false) => {
            warn!("Media access not granted");
            Some(PERMISSION_MESSAGE.to_string())
        }
        Err(err) => {
            warn!(error = %err, "Permission probe failed");
            Some(PERMISSION_MESSAGE.to_string())
        }
    }
}

/// One client's view of the session.
#[derive(Clone)]
pub struct Connection {
    client: ClientIdentity,
    accepted: bool,
    session: SessionHandle,
    browse: Arc<BrowseTree>,
}

impl Connection {
    pub fn client(&self) -> &ClientIdentity {
        &self.client
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Browse root, or `None` for a rejected client.
    pub fn root_id(&self) -> Option<&'static str> {
        self.accepted.then_some(MediaId::ROOT)
    }

    pub fn get_children(&self, parent_id: &str) -> Result<Vec<MediaItem>> {
        self.check()?;
        Ok(self.browse.get_children(parent_id))
    }

    pub async fn play(&self) -> Result<()> {
        self.check()?;
        Ok(self.session.play().await?)
    }

    pub async fn pause(&self) -> Result<()> {
        self.check()?;
        Ok(self.session.pause().await?)
    }

    pub async fn stop(&self) -> Result<()> {
        self.check()?;
        Ok(self.session.stop().await?)
    }

    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.check()?;
        Ok(self.session.seek_to(position_ms).await?)
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        self.check()?;
        Ok(self.session.skip_to_next().await?)
    }

    pub async fn skip_to_previous(&self) -> Result<()> {
        self.check()?;
        Ok(self.session.skip_to_previous().await?)
    }

    pub async fn skip_to_queue_item(&self, id: QueueItemId) -> Result<()> {
        self.check()?;
        Ok(self.session.skip_to_queue_item(id).await?)
    }

    pub async fn play_from_id(&self, media_id: &str) -> Result<()> {
        self.check()?;
        Ok(self.session.play_from_id(media_id).await?)
    }

    pub async fn play_from_search(&self, query: &str, hints: SearchHints) -> Result<()> {
        self.check()?;
        Ok(self.session.play_from_search(query, hints).await?)
    }

    pub async fn prepare(&self) -> Result<()> {
        self.check()?;
        Ok(self.session.prepare().await?)
    }

    pub async fn custom_action(&self, name: &str, args: &BTreeMap<String, String>) -> Result<()> {
        self.check()?;
        Ok(self.session.custom_action(name, args).await?)
    }

    pub fn playback_state(&self) -> Result<PlaybackSnapshot> {
        self.check()?;
        Ok(self.session.playback_state())
    }

    pub fn now_playing(&self) -> Result<Option<NowPlayingMetadata>> {
        self.check()?;
        Ok(self.session.now_playing())
    }

    pub fn queue(&self) -> Result<QueueSnapshot> {
        self.check()?;
        Ok(self.session.queue())
    }

    pub fn subscribe_playback(&self) -> Result<watch::Receiver<PlaybackSnapshot>> {
        self.check()?;
        Ok(self.session.subscribe_playback())
    }

    pub fn subscribe_metadata(&self) -> Result<watch::Receiver<Option<NowPlayingMetadata>>> {
        self.check()?;
        Ok(self.session.subscribe_metadata())
    }

    pub fn subscribe_queue(&self) -> Result<watch::Receiver<QueueSnapshot>> {
        self.check()?;
        Ok(self.session.subscribe_queue())
    }

    fn check(&self) -> Result<()> {
        if self.accepted {
            Ok(())
        } else {
            Err(CoreError::Playback(PlaybackError::UnknownClient(
                self.client.package.clone(),
            )))
        }
    }
}
