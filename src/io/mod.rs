//! I/O operations module
//!
//! Platform-facing collaborators: the disk I/O seam used by the disk
//! benchmark, volume enumeration and usage, and memory status queries.

pub mod disk;
pub mod memory;
pub mod volume;

pub use disk::{DirectFile, DiskIO, PlatformDiskIO, TestFile};
pub use memory::{memory_status, ram_modules, MemoryStatus, RamModule};
pub use volume::{
    filesystem_type, list_volumes, volume_usage, volumes_with_target, Volume, VolumeUsage,
};
