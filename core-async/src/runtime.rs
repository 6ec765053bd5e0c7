//! Runtime handles.
//!
//! Downstream crates use `Handle::try_current` to detect whether they are
//! already inside an executor, and `block_on` for synchronous entry points
//! such as test bodies and `main`.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs a future to completion on a fresh current-thread runtime.
///
/// Panics if the runtime cannot be built, which only happens when the OS
/// refuses to create the I/O driver.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}
