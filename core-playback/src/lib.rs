//! # Playback Session
//!
//! The session core: a single [`SessionController`] task owning the play
//! queue, the [`PlaybackEngine`], audio focus and the foreground lifecycle.
//!
//! ## Overview
//!
//! - [`queue`]: ordered play queue with an active cursor
//! - [`engine`]: one prepared adapter session at a time
//! - [`focus`]: focus ownership and the reaction to focus changes
//! - [`foreground`]: foreground mode and the "now playing" notification
//! - [`controller`]: the actor and its [`SessionHandle`]
//!
//! Hosts talk to a running session only through [`SessionHandle`]. State is
//! published on `watch` channels and lifecycle events on the
//! [`core_runtime::events::EventBus`].

pub mod controller;
pub mod engine;
pub mod error;
pub mod focus;
pub mod foreground;
pub mod queue;
pub mod types;

pub use controller::{SessionBridges, SessionController, SessionHandle};
pub use core_runtime::SessionConfig;
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result};
pub use focus::{reaction_for, FocusArbiter, FocusReaction};
pub use foreground::{ForegroundMode, ForegroundStep, ForegroundWorker};
pub use queue::QueueManager;
pub use types::{
    EnqueuePlacement, NowPlayingMetadata, PlaybackSnapshot, PlaybackStatus, QueueEntry,
    QueueItemId, QueueSnapshot, SessionCommand,
};
