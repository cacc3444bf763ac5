//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::time::{Duration, Instant};

/// Upper bound for anything crossing a worker thread
pub fn test_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Poll `cond` until it holds or [`test_timeout`] elapses
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + test_timeout();
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Let already queued work settle before asserting that nothing else happens
pub fn settle() {
    std::thread::sleep(Duration::from_millis(30));
}
