//! Internal utilities.

/// Thread spawning utilities.
pub mod thread;
