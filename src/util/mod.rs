//! Utility functions module
//!
//! Contains helpers for unit conversion, speed calculation and
//! human-readable formatting.

pub mod units;

// Re-export commonly used functions
pub use units::{
    bytes_to_gb, format_bytes, format_gb, format_seconds, format_throughput, parse_size_mb,
    speed_mb_s, GIB, MIB,
};
