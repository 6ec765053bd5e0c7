//! Core service façade and bootstrap.
//!
//! Wires host-provided bridges into the playback session core. Desktop hosts
//! typically enable the `desktop-shims` feature so any bridge they do not
//! inject is filled in from `bridge-desktop`.
//!
//! ```ignore
//! use core_service::{ClientIdentity, CoreConfig, CoreService};
//!
//! let config = CoreConfig::builder().allow_client("com.example.car").build()?;
//! let service = CoreService::bootstrap(config).await?;
//!
//! let car = service.connect(ClientIdentity::new("com.example.car", 2001));
//! let albums = car.get_children("__ALBUMS__")?;
//! car.play_from_id(&albums[0].id).await?;
//! ```

pub mod access;
pub mod error;
pub mod service;

pub use access::AccessGate;
pub use error::{CoreError, Result};
pub use service::{Connection, CoreService, PERMISSION_MESSAGE};

pub use bridge_traits::ClientIdentity;
pub use core_library::{MediaId, MediaItem, SearchFacet, SearchHints};
pub use core_playback::{
    NowPlayingMetadata, PlaybackSnapshot, PlaybackStatus, QueueEntry, QueueItemId, QueueSnapshot,
    SessionHandle,
};
pub use core_runtime::events::{CoreEvent, PlaybackEvent, QueueEvent, SessionEvent};
pub use core_runtime::{CoreConfig, CoreConfigBuilder, SessionConfig};
