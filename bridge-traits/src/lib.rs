//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host must implement for the
//! playback session core.
//!
//! ## Overview
//!
//! The core owns the play queue, the session state machine and the
//! foreground lifecycle decision. Everything that touches the operating
//! system goes through one of the traits below, so the same core runs on
//! Android, iOS and desktop with different adapters behind it.
//!
//! ## Traits
//!
//! ### Audio
//! - [`PlaybackAdapter`](playback::PlaybackAdapter) - Single-track decode/output primitive
//! - [`AudioFocusManager`](focus::AudioFocusManager) - OS audio policy arbitration
//! - [`OutputRouteMonitor`](focus::OutputRouteMonitor) - "Becoming noisy" route changes
//!
//! ### Platform Integration
//! - [`ForegroundService`](foreground::ForegroundService) - Foreground mode and now-playing notification
//! - [`MediaIndex`](media_index::MediaIndex) - Device media index rows
//! - [`PermissionProbe`](security::PermissionProbe) - Media read permission pre-flight
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability
//! is missing:
//!
//! ```ignore
//! let adapter = config.playback_adapter
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "PlaybackAdapter".to_string(),
//!         message: "No playback adapter provided. \
//!                  Desktop: enable the desktop-shims feature. \
//!                  Mobile: inject the platform-native adapter.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits return [`BridgeError`](error::BridgeError). Adapters
//! convert platform errors into it with enough context (file name, session
//! id) for the core to log a useful message.
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` so the session actor can hold them
//! behind `Arc<dyn Trait>` and call them from spawned tasks.

pub mod error;
pub mod focus;
pub mod foreground;
pub mod logging;
pub mod media_index;
pub mod platform;
pub mod playback;
pub mod security;

pub use error::BridgeError;

pub use focus::{
    AudioFocusManager, FocusChange, FocusChangeStream, FocusRequestResult, OutputRouteMonitor,
    RouteChange, RouteChangeStream,
};
pub use foreground::{ForegroundService, MediaNotification, NotificationAction};
pub use logging::{LogEntry, LogLevel, LoggerSink, StderrLogger};
pub use media_index::{IndexedSong, MediaIndex};
pub use platform::{PlatformSend, PlatformSendSync};
pub use playback::{
    AdapterEvent, AdapterEventStream, AdapterState, AudioSource, PlaybackAdapter,
    PlaybackMetadata, PlaybackOptions, PlaybackRequest, PlaybackSessionId,
};
pub use security::{ClientIdentity, PermissionProbe};
