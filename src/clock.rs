//! Blocking waits
//!
//! The poll loop and the transport retry both wait through a [`Sleeper`] so
//! tests can record the requested durations instead of blocking.

use std::time::Duration;

/// Something that can block the calling thread for a duration.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
