//! Foundational low-level utilities shared across tally crates.
//!
//! Provides the atomic file-write helper used by store persistence and the
//! time utilities used when naming temp files and stamping log output.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms};
