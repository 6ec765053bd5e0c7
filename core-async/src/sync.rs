//! Synchronization primitives.
//!
//! Channels are the main tool here: the playback session is an actor fed by
//! an `mpsc` queue, publishes snapshots over `watch`, and emits change events
//! over `broadcast`. `CancellationToken` scopes background tasks (timers,
//! bridge event forwarders) so they can be torn down deterministically.
//!
//! ```rust
//! use core_async::sync::{mpsc, watch};
//!
//! # async fn example() {
//! let (tx, mut rx) = mpsc::channel::<u32>(4);
//! tx.send(1).await.unwrap();
//! assert_eq!(rx.recv().await, Some(1));
//!
//! let (state_tx, state_rx) = watch::channel("stopped");
//! state_tx.send_replace("playing");
//! assert_eq!(*state_rx.borrow(), "playing");
//! # }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, OnceCell, RwLock,
    RwLockReadGuard, RwLockWriteGuard,
};
pub use tokio_util::sync::{CancellationToken, DropGuard};
