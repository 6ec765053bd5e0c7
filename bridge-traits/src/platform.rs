//! Thread-safety bounds shared by every bridge trait.
//!
//! Bridge implementations are handed to the session actor and to background
//! forwarder tasks, so they must be shareable across threads. The aliases
//! below keep the bound spelled in one place.

/// Marker trait for bridge objects shared across async tasks.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}

/// Marker trait for bridge objects moved into a single task (event streams).
pub trait PlatformSend: Send {}

impl<T> PlatformSend for T where T: Send {}
