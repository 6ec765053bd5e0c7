//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the media session crates:
//! - Logging and tracing setup, with forwarding into a host `LoggerSink`
//! - `CoreConfig`, the bundle of host capabilities plus session tunables
//! - The `EventBus` that carries playback, queue and session events
//!
//! ## Overview
//!
//! Nothing in here knows about queues or focus policy. The library, playback
//! and service crates build on these pieces and publish through the bus.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, SessionConfig};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventSeverity, EventStream};
