//! Task spawning.
//!
//! Thin wrappers over `tokio::task`. `spawn` is used for actor loops and
//! event forwarders; `spawn_blocking` for bridge calls that may block the
//! calling thread (file probing, native audio APIs).

pub use tokio::task::{spawn_blocking, yield_now, AbortHandle, JoinError, JoinHandle};

/// Spawns a future onto the current runtime.
///
/// Must be called from within a runtime context.
///
/// ```rust
/// use core_async::task::spawn;
///
/// # async fn example() {
/// let handle = spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # }
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for joined tasks.
pub type Result<T> = std::result::Result<T, JoinError>;
