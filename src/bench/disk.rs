//! Sequential disk benchmark
//!
//! One write → read → verify cycle against a temporary file under the
//! target directory, followed by a capacity query for the volume.

use crate::io::disk::{read_exact_direct, write_all_direct, DiskIO, PlatformDiskIO, TestFile};
use crate::io::volume::{filesystem_type, volume_usage};
use crate::models::DiskTestResult;
use crate::util::units::{bytes_to_gb, speed_mb_s, MIB};
use crate::{DiskMemError, Result};
use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Stage the disk benchmark has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskPhase {
    Preparing,
    Writing,
    Reading,
    Verifying,
    QueryingVolume,
    Done,
}

impl DiskPhase {
    /// Overall progress when this phase starts, 0 to 100
    pub fn percent(self) -> u16 {
        match self {
            DiskPhase::Preparing => 0,
            DiskPhase::Writing => 10,
            DiskPhase::Reading => 50,
            DiskPhase::Verifying => 80,
            DiskPhase::QueryingVolume => 90,
            DiskPhase::Done => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DiskPhase::Preparing => "Generating test data",
            DiskPhase::Writing => "Writing",
            DiskPhase::Reading => "Reading",
            DiskPhase::Verifying => "Verifying",
            DiskPhase::QueryingVolume => "Querying volume",
            DiskPhase::Done => "Done",
        }
    }
}

/// Attach the phase and path to an I/O error without losing its kind
fn with_context(err: io::Error, phase: &str, path: &Path) -> DiskMemError {
    DiskMemError::IoError(io::Error::new(
        err.kind(),
        format!("{} {} failed: {}", phase, path.display(), err),
    ))
}

/// Sequential write/read/verify benchmark
pub struct DiskBenchmark<D: DiskIO = PlatformDiskIO> {
    disk_io: D,
}

impl DiskBenchmark {
    /// Benchmark backed by the platform file system
    pub fn new() -> Self {
        Self {
            disk_io: PlatformDiskIO::new(),
        }
    }
}

impl Default for DiskBenchmark {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DiskIO> DiskBenchmark<D> {
    /// Benchmark backed by a custom I/O implementation
    pub fn with_disk_io(disk_io: D) -> Self {
        Self { disk_io }
    }

    /// Run one cycle of `size_mb` MB against `target`
    pub fn run(&self, target: &Path, size_mb: u32) -> Result<DiskTestResult> {
        self.run_with_progress(target, size_mb, |_| {})
    }

    /// Run one cycle, reporting each phase as it starts.
    ///
    /// The temporary file is removed on every exit path. A result is only
    /// returned when the data read back matches what was written.
    pub fn run_with_progress<F>(
        &self,
        target: &Path,
        size_mb: u32,
        mut on_phase: F,
    ) -> Result<DiskTestResult>
    where
        F: FnMut(DiskPhase),
    {
        if size_mb == 0 {
            return Err(DiskMemError::ConfigError(
                "Test size must be greater than 0 MB".to_string(),
            ));
        }
        let len = usize::try_from(u64::from(size_mb) * MIB).map_err(|_| {
            DiskMemError::ConfigError(format!("{} MB does not fit in memory", size_mb))
        })?;

        info!(target = %target.display(), size_mb, "starting disk test");

        on_phase(DiskPhase::Preparing);
        let test_file = TestFile::prepare(target)?;
        let path = test_file.path();

        let mut data = vec![0u8; len];
        SmallRng::from_entropy().fill_bytes(&mut data);

        on_phase(DiskPhase::Writing);
        let write_time = self.timed_write(path, &data)?;
        let write_speed_mb_s = speed_mb_s(size_mb, write_time);
        debug!(?write_time, write_speed_mb_s, "write phase finished");

        on_phase(DiskPhase::Reading);
        let mut read_back = vec![0u8; len];
        let read_time = self.timed_read(path, &mut read_back)?;
        let read_speed_mb_s = speed_mb_s(size_mb, read_time);
        debug!(?read_time, read_speed_mb_s, "read phase finished");

        on_phase(DiskPhase::Verifying);
        verify(&data, &read_back)?;
        drop(read_back);
        drop(data);

        on_phase(DiskPhase::QueryingVolume);
        let usage = volume_usage(target)?;
        let filesystem_type = filesystem_type(target);

        drop(test_file);
        on_phase(DiskPhase::Done);

        info!(
            write_speed_mb_s,
            read_speed_mb_s,
            fs = %filesystem_type,
            "disk test finished"
        );

        Ok(DiskTestResult {
            timestamp: Utc::now(),
            target: target.to_path_buf(),
            size_mb,
            write_speed_mb_s,
            read_speed_mb_s,
            write_time,
            read_time,
            total_space_gb: bytes_to_gb(usage.total_bytes),
            free_space_gb: bytes_to_gb(usage.free_bytes),
            filesystem_type,
        })
    }

    /// Write and sync the whole buffer, timing the span
    fn timed_write(&self, path: &Path, data: &[u8]) -> Result<Duration> {
        let mut file = self
            .disk_io
            .open_write(path)
            .map_err(|e| with_context(e, "creating", path))?;

        let start = Instant::now();
        write_all_direct(file.as_mut(), data).map_err(|e| with_context(e, "writing", path))?;
        file.sync_all()
            .map_err(|e| with_context(e, "syncing", path))?;
        let elapsed = start.elapsed();

        if let Err(e) = file.drop_cache() {
            warn!(error = %e, "could not drop cached pages, read speed may be inflated");
        }

        Ok(elapsed)
    }

    /// Read the file back into `buf`, timing the span
    fn timed_read(&self, path: &Path, buf: &mut [u8]) -> Result<Duration> {
        let mut file = self
            .disk_io
            .open_read(path)
            .map_err(|e| with_context(e, "opening", path))?;

        let start = Instant::now();
        read_exact_direct(file.as_mut(), buf).map_err(|e| with_context(e, "reading", path))?;
        Ok(start.elapsed())
    }
}

/// Byte-for-byte comparison of written and read data
pub fn verify(expected: &[u8], actual: &[u8]) -> Result<()> {
    if let Some(offset) = expected
        .iter()
        .zip(actual.iter())
        .position(|(a, b)| a != b)
    {
        return Err(DiskMemError::VerificationFailure {
            offset: offset as u64,
            expected: expected[offset],
            actual: actual[offset],
        });
    }

    if expected.len() != actual.len() {
        let offset = expected.len().min(actual.len());
        return Err(DiskMemError::VerificationFailure {
            offset: offset as u64,
            expected: expected.get(offset).copied().unwrap_or(0),
            actual: actual.get(offset).copied().unwrap_or(0),
        });
    }

    Ok(())
}
