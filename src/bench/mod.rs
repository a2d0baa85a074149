//! Benchmark engine module
//!
//! Contains the disk and memory measurement routines and the background
//! tasks that run them for the front ends.

pub mod disk;
pub mod memory;
pub mod worker;

// Re-export commonly used types
pub use disk::{DiskBenchmark, DiskPhase};
pub use memory::{run_sweep, run_sweep_until, SweepAllocator, MemoryBenchmark, SweepProgress};
pub use worker::{spawn_disk_test, spawn_memory_sweep, DiskTestHandle, SweepHandle};
