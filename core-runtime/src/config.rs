//! # Core Configuration Module
//!
//! Configuration for the media session core.
//!
//! ## Overview
//!
//! A builder assembles a [`CoreConfig`] holding every host bridge the
//! session needs plus its tunables. The build step fails fast when a
//! required capability is missing, with a message saying how to provide it.
//!
//! ## Required Bridges
//!
//! - `PlaybackAdapter` - single-track decode/output primitive
//! - `AudioFocusManager` - OS audio policy
//! - `ForegroundService` - foreground mode and now-playing notification
//! - `MediaIndex` - device media index
//!
//! ## Optional Bridges
//!
//! - `OutputRouteMonitor` - "becoming noisy" detection (pause on unplug)
//! - `PermissionProbe` - media permission pre-flight (assumed granted when absent)
//!
//! When the `desktop-shims` feature is enabled, `bridge-desktop`
//! implementations are injected for every bridge that was not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, SessionConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .playback_adapter(Arc::new(MyAdapter))
//!     .focus_manager(Arc::new(MyFocus))
//!     .foreground_service(Arc::new(MyForeground))
//!     .media_index(Arc::new(MyIndex))
//!     .allow_client("com.example.car")
//!     .session(SessionConfig::default().with_delayed_stop_timeout(Duration::from_secs(10)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AudioFocusManager, ForegroundService, MediaIndex, OutputRouteMonitor, PermissionProbe,
    PlaybackAdapter,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Session tunables
// ============================================================================

/// Tunables for the playback session controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long to wait after a permanent focus loss before stopping.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_delayed_stop_timeout")]
    pub delayed_stop_timeout: Duration,

    /// Output volume while ducked for a transient focus loss.
    ///
    /// Default: 0.2.
    #[serde(default = "default_duck_volume")]
    pub duck_volume: f32,

    /// Output volume in normal operation.
    ///
    /// Default: 1.0.
    #[serde(default = "default_full_volume")]
    pub full_volume: f32,

    /// Capacity of the controller's command queue.
    ///
    /// Default: 64.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            delayed_stop_timeout: default_delayed_stop_timeout(),
            duck_volume: default_duck_volume(),
            full_volume: default_full_volume(),
            command_buffer: default_command_buffer(),
        }
    }
}

fn default_delayed_stop_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_duck_volume() -> f32 {
    0.2
}

fn default_full_volume() -> f32 {
    1.0
}

fn default_command_buffer() -> usize {
    64
}

impl SessionConfig {
    pub fn with_delayed_stop_timeout(mut self, timeout: Duration) -> Self {
        self.delayed_stop_timeout = timeout;
        self
    }

    pub fn with_duck_volume(mut self, volume: f32) -> Self {
        self.duck_volume = volume;
        self
    }

    pub fn with_full_volume(mut self, volume: f32) -> Self {
        self.full_volume = volume;
        self
    }

    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.delayed_stop_timeout.is_zero() {
            return Err(Error::Config(
                "Delayed stop timeout must be greater than zero".to_string(),
            ));
        }

        for (name, volume) in [("Duck", self.duck_volume), ("Full", self.full_volume)] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(Error::Config(format!(
                    "{} volume must be within 0.0..=1.0, got {}",
                    name, volume
                )));
            }
        }

        if self.duck_volume >= self.full_volume {
            return Err(Error::Config(format!(
                "Duck volume ({}) must be lower than full volume ({})",
                self.duck_volume, self.full_volume
            )));
        }

        if self.command_buffer == 0 {
            return Err(Error::Config(
                "Command buffer must hold at least one command".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Core configuration
// ============================================================================

/// Bridges and settings for the media session core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Decode/output primitive (required).
    pub playback_adapter: Arc<dyn PlaybackAdapter>,

    /// OS audio policy (required).
    pub focus_manager: Arc<dyn AudioFocusManager>,

    /// Foreground mode and notification (required).
    pub foreground_service: Arc<dyn ForegroundService>,

    /// Device media index (required).
    pub media_index: Arc<dyn MediaIndex>,

    /// Output route changes (optional).
    pub route_monitor: Option<Arc<dyn OutputRouteMonitor>>,

    /// Media permission pre-flight (optional).
    pub permission_probe: Option<Arc<dyn PermissionProbe>>,

    /// Session controller tunables.
    pub session: SessionConfig,

    /// Client packages allowed to browse and control the session.
    pub allowed_clients: Vec<String>,

    /// The host's own OS user id; clients running under it are trusted.
    pub host_uid: Option<u32>,

    /// Capacity of the event bus.
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("playback_adapter", &"PlaybackAdapter { ... }")
            .field("focus_manager", &"AudioFocusManager { ... }")
            .field("foreground_service", &"ForegroundService { ... }")
            .field("media_index", &"MediaIndex { ... }")
            .field(
                "route_monitor",
                &self.route_monitor.as_ref().map(|_| "OutputRouteMonitor { ... }"),
            )
            .field(
                "permission_probe",
                &self.permission_probe.as_ref().map(|_| "PermissionProbe { ... }"),
            )
            .field("session", &self.session)
            .field("allowed_clients", &self.allowed_clients)
            .field("host_uid", &self.host_uid)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates settings that do not depend on bridges.
    pub fn validate(&self) -> Result<()> {
        self.session.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        if let Some(blank) = self.allowed_clients.iter().find(|p| p.trim().is_empty()) {
            return Err(Error::Config(format!(
                "Allowed client package names cannot be blank: {:?}",
                blank
            )));
        }

        Ok(())
    }
}

/// Supplies `bridge-desktop` defaults for bridges the host did not inject.
#[cfg(feature = "desktop-shims")]
mod defaults {
    use super::*;
    use bridge_desktop::{
        ClockedPlaybackAdapter, DesktopAudioFocus, DirectoryPermissionProbe, ManualRouteMonitor,
        SqliteMediaIndex, TracingForegroundService,
    };

    pub fn playback_adapter() -> Result<Arc<dyn PlaybackAdapter>> {
        Ok(Arc::new(ClockedPlaybackAdapter::new()))
    }

    pub fn focus_manager() -> Result<Arc<dyn AudioFocusManager>> {
        Ok(Arc::new(DesktopAudioFocus::standalone()))
    }

    pub fn foreground_service() -> Result<Arc<dyn ForegroundService>> {
        Ok(Arc::new(TracingForegroundService::new()))
    }

    pub fn media_index(path: Option<PathBuf>) -> Result<Arc<dyn MediaIndex>> {
        let path = path.unwrap_or_else(SqliteMediaIndex::default_path);
        Ok(Arc::new(SqliteMediaIndex::open_lazy(path)))
    }

    pub fn route_monitor() -> Option<Arc<dyn OutputRouteMonitor>> {
        Some(Arc::new(ManualRouteMonitor::new()))
    }

    pub fn permission_probe() -> Option<Arc<dyn PermissionProbe>> {
        Some(Arc::new(DirectoryPermissionProbe::user_music_dir()))
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod defaults {
    use super::*;

    fn capability_missing(capability: &str, purpose: &str, desktop_default: &str) -> Error {
        Error::CapabilityMissing {
            capability: capability.to_string(),
            message: format!(
                "{} implementation is required for {}. \
                 Desktop: enable the 'desktop-shims' feature to use the default {}. \
                 Mobile: inject the platform-native adapter.",
                capability, purpose, desktop_default
            ),
        }
    }

    pub fn playback_adapter() -> Result<Arc<dyn PlaybackAdapter>> {
        Err(capability_missing(
            "PlaybackAdapter",
            "audio output",
            "ClockedPlaybackAdapter",
        ))
    }

    pub fn focus_manager() -> Result<Arc<dyn AudioFocusManager>> {
        Err(capability_missing(
            "AudioFocusManager",
            "audio focus arbitration",
            "DesktopAudioFocus",
        ))
    }

    pub fn foreground_service() -> Result<Arc<dyn ForegroundService>> {
        Err(capability_missing(
            "ForegroundService",
            "background playback visibility",
            "TracingForegroundService",
        ))
    }

    pub fn media_index(_path: Option<PathBuf>) -> Result<Arc<dyn MediaIndex>> {
        Err(capability_missing(
            "MediaIndex",
            "loading the browse catalog",
            "SqliteMediaIndex",
        ))
    }

    pub fn route_monitor() -> Option<Arc<dyn OutputRouteMonitor>> {
        None
    }

    pub fn permission_probe() -> Option<Arc<dyn PermissionProbe>> {
        None
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    playback_adapter: Option<Arc<dyn PlaybackAdapter>>,
    focus_manager: Option<Arc<dyn AudioFocusManager>>,
    foreground_service: Option<Arc<dyn ForegroundService>>,
    media_index: Option<Arc<dyn MediaIndex>>,
    media_index_path: Option<PathBuf>,
    route_monitor: Option<Arc<dyn OutputRouteMonitor>>,
    permission_probe: Option<Arc<dyn PermissionProbe>>,
    session: Option<SessionConfig>,
    allowed_clients: Vec<String>,
    host_uid: Option<u32>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the playback adapter (required unless `desktop-shims`).
    pub fn playback_adapter(mut self, adapter: Arc<dyn PlaybackAdapter>) -> Self {
        self.playback_adapter = Some(adapter);
        self
    }

    /// Sets the audio focus manager (required unless `desktop-shims`).
    pub fn focus_manager(mut self, focus: Arc<dyn AudioFocusManager>) -> Self {
        self.focus_manager = Some(focus);
        self
    }

    /// Sets the foreground service (required unless `desktop-shims`).
    pub fn foreground_service(mut self, service: Arc<dyn ForegroundService>) -> Self {
        self.foreground_service = Some(service);
        self
    }

    /// Sets the media index (required unless `desktop-shims`).
    pub fn media_index(mut self, index: Arc<dyn MediaIndex>) -> Self {
        self.media_index = Some(index);
        self
    }

    /// Location of the desktop SQLite index used when no media index is
    /// injected. Ignored without `desktop-shims`.
    pub fn media_index_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.media_index_path = Some(path.into());
        self
    }

    /// Sets the output route monitor.
    pub fn route_monitor(mut self, monitor: Arc<dyn OutputRouteMonitor>) -> Self {
        self.route_monitor = Some(monitor);
        self
    }

    /// Sets the media permission probe.
    pub fn permission_probe(mut self, probe: Arc<dyn PermissionProbe>) -> Self {
        self.permission_probe = Some(probe);
        self
    }

    /// Replaces the session tunables.
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = Some(session);
        self
    }

    /// Adds a client package to the allow-list.
    pub fn allow_client(mut self, package: impl Into<String>) -> Self {
        self.allowed_clients.push(package.into());
        self
    }

    /// Trusts clients running under the host's own uid.
    pub fn host_uid(mut self, uid: u32) -> Self {
        self.host_uid = Some(uid);
        self
    }

    /// Sets the event bus capacity.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig`.
    ///
    /// Missing bridges are filled with desktop defaults when the
    /// `desktop-shims` feature is enabled; otherwise a missing required
    /// bridge yields [`Error::CapabilityMissing`].
    pub fn build(self) -> Result<CoreConfig> {
        let playback_adapter = match self.playback_adapter {
            Some(adapter) => adapter,
            None => defaults::playback_adapter()?,
        };

        let focus_manager = match self.focus_manager {
            Some(focus) => focus,
            None => defaults::focus_manager()?,
        };

        let foreground_service = match self.foreground_service {
            Some(service) => service,
            None => defaults::foreground_service()?,
        };

        let media_index = match self.media_index {
            Some(index) => index,
            None => defaults::media_index(self.media_index_path)?,
        };

        let config = CoreConfig {
            playback_adapter,
            focus_manager,
            foreground_service,
            media_index,
            route_monitor: self.route_monitor.or_else(defaults::route_monitor),
            permission_probe: self.permission_probe.or_else(defaults::permission_probe),
            session: self.session.unwrap_or_default(),
            allowed_clients: self.allowed_clients,
            host_uid: self.host_uid,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
