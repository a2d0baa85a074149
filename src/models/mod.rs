//! Data models module
//!
//! Contains the result records produced by the disk and memory
//! benchmarks.

pub mod result;

// Re-export commonly used types
pub use result::{AllocationOutcome, DiskTestResult, MemorySample, MemoryTestRun};
