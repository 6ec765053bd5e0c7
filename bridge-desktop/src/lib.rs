//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `PlaybackAdapter` as a clock-driven adapter probing sources with `symphonia`
//! - `AudioFocusManager` as an in-process arbiter shared by local producers
//! - `OutputRouteMonitor` driven manually by the host
//! - `ForegroundService` recording the notification and logging transitions
//! - `MediaIndex` backed by SQLite (`sqlx`)
//! - `PermissionProbe` checking that the music directory is readable
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ClockedPlaybackAdapter, FocusArbiter, TracingForegroundService};
//! use std::sync::Arc;
//!
//! let arbiter = FocusArbiter::new();
//! let adapter = Arc::new(ClockedPlaybackAdapter::new());
//! let focus = Arc::new(arbiter.client());
//! let foreground = Arc::new(TracingForegroundService::new());
//! // Hand these to `CoreConfig::builder()`.
//! ```

mod focus;
mod foreground;
mod media_index;
mod permission;
mod playback;

pub use focus::{DesktopAudioFocus, FocusArbiter, ManualRouteMonitor};
pub use foreground::TracingForegroundService;
pub use media_index::SqliteMediaIndex;
pub use permission::DirectoryPermissionProbe;
pub use playback::ClockedPlaybackAdapter;
