//! Workspace facade crate.
//!
//! Host applications depend on `media-session-workspace` and get the playback
//! session service re-exported behind the `desktop-shims` feature, without
//! wiring the individual `core-*` and `bridge-*` crates themselves.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
