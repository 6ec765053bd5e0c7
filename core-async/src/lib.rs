//! Async runtime facade for the media session core.
//!
//! Every `core-*` and `bridge-*` crate reaches the executor through this crate
//! rather than depending on Tokio directly. That keeps a single place to pin
//! runtime features and lets tests use `#[core_async::test]` without pulling
//! Tokio's macros into every manifest.
//!
//! # Modules
//!
//! - `task`: spawning futures and blocking work
//! - `time`: sleeping, timeouts and intervals
//! - `sync`: channels, locks and cancellation
//! - `runtime`: handles and `block_on`
//!
//! ```rust
//! use core_async::time::{sleep, Duration};
//!
//! # async fn example() {
//! let handle = core_async::spawn(async {
//!     sleep(Duration::from_millis(5)).await;
//!     7
//! });
//! assert_eq!(handle.await.unwrap(), 7);
//! # }
//! ```

pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use tokio::select;
pub use time::{sleep, Duration, Instant};
