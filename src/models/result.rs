//! Benchmark result data models
//!
//! Contains the disk test record, memory allocation samples and the
//! sweep run that collects them.

use crate::config::BufferRetention;
use crate::util::units::{format_gb, format_seconds, format_throughput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of a completed disk write/verify/read cycle.
///
/// Only ever built after the read-back buffer matched the written one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskTestResult {
    /// Timestamp when the test finished
    pub timestamp: DateTime<Utc>,
    /// Directory the test file was written under
    pub target: PathBuf,
    /// Test file size in MB
    pub size_mb: u32,
    /// Sequential write speed in MB/s
    pub write_speed_mb_s: f64,
    /// Sequential read speed in MB/s
    pub read_speed_mb_s: f64,
    /// Time spent writing (including sync)
    #[serde(with = "duration_serde")]
    pub write_time: Duration,
    /// Time spent reading
    #[serde(with = "duration_serde")]
    pub read_time: Duration,
    /// Volume capacity in GB
    pub total_space_gb: f64,
    /// Free space on the volume in GB
    pub free_space_gb: f64,
    /// Filesystem type of the volume, never empty
    pub filesystem_type: String,
}

impl DiskTestResult {
    /// Lines in the same order the result panel shows them
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Write Speed: {}", format_throughput(self.write_speed_mb_s)),
            format!("Read Speed: {}", format_throughput(self.read_speed_mb_s)),
            format!("Total Space: {}", format_gb(self.total_space_gb)),
            format!("Free Space: {}", format_gb(self.free_space_gb)),
            format!("Filesystem Type: {}", self.filesystem_type),
        ]
    }
}

/// What happened when a buffer of a given size was requested
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AllocationOutcome {
    /// Allocation (and fill) finished in the given time
    Completed(#[serde(with = "duration_serde")] Duration),
    /// The allocator refused the request
    Exhausted,
}

impl AllocationOutcome {
    /// Elapsed seconds, or `f64::INFINITY` when the allocation failed
    pub fn duration_seconds(&self) -> f64 {
        match self {
            AllocationOutcome::Completed(elapsed) => elapsed.as_secs_f64(),
            AllocationOutcome::Exhausted => f64::INFINITY,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, AllocationOutcome::Exhausted)
    }
}

/// One step of a memory sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    /// Requested buffer size in GB
    pub size_gb: u32,
    /// How the allocation went
    pub outcome: AllocationOutcome,
}

impl MemorySample {
    pub fn new(size_gb: u32, outcome: AllocationOutcome) -> Self {
        Self { size_gb, outcome }
    }

    /// Elapsed seconds, `+∞` for a failed allocation
    pub fn duration_seconds(&self) -> f64 {
        self.outcome.duration_seconds()
    }

    /// Display line, e.g. `Size: 2 GB - Time: 0.41 seconds`
    pub fn summary(&self) -> String {
        format!(
            "Size: {} GB - Time: {}",
            self.size_gb,
            format_seconds(self.duration_seconds())
        )
    }
}

/// Ordered samples of one allocation sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTestRun {
    /// When the sweep started
    pub timestamp: DateTime<Utc>,
    /// Ceiling the sweep was asked to reach
    pub max_gb: u32,
    /// Buffer retention policy in effect
    pub retention: BufferRetention,
    /// Samples in increasing size order
    pub samples: Vec<MemorySample>,
    /// Whether the sweep was stopped before reaching `max_gb`
    pub cancelled: bool,
}

impl MemoryTestRun {
    pub fn new(max_gb: u32, retention: BufferRetention) -> Self {
        Self {
            timestamp: Utc::now(),
            max_gb,
            retention,
            samples: Vec::new(),
            cancelled: false,
        }
    }

    pub fn push(&mut self, sample: MemorySample) {
        self.samples.push(sample);
    }

    /// Number of steps that ran
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether every step up to `max_gb` was attempted
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.samples.len() == self.max_gb as usize
    }

    /// Largest size that allocated successfully
    pub fn largest_successful_gb(&self) -> Option<u32> {
        self.samples
            .iter()
            .filter(|s| !s.outcome.is_exhausted())
            .map(|s| s.size_gb)
            .max()
    }

    /// `(size_gb, seconds)` points for charting; failed steps are left out
    pub fn chart_points(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .filter(|s| !s.outcome.is_exhausted())
            .map(|s| (s.size_gb as f64, s.duration_seconds()))
            .collect()
    }
}

// Durations are stored as nanoseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_result() -> DiskTestResult {
        DiskTestResult {
            timestamp: Utc::now(),
            target: PathBuf::from("/tmp/test"),
            size_mb: 10,
            write_speed_mb_s: 250.0,
            read_speed_mb_s: 1500.0,
            write_time: Duration::from_millis(40),
            read_time: Duration::from_nanos(6_666_667),
            total_space_gb: 512.0,
            free_space_gb: 128.25,
            filesystem_type: "ext4".to_string(),
        }
    }

    fn sample_run() -> MemoryTestRun {
        let mut run = MemoryTestRun::new(3, BufferRetention::Release);
        run.push(MemorySample::new(
            1,
            AllocationOutcome::Completed(Duration::from_millis(300)),
        ));
        run.push(MemorySample::new(2, AllocationOutcome::Exhausted));
        run.push(MemorySample::new(
            3,
            AllocationOutcome::Completed(Duration::from_millis(900)),
        ));
        run
    }

    #[test]
    fn test_summary_lines() {
        let lines = create_test_result().summary_lines();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Write Speed: 250.00 MB/s");
        assert_eq!(lines[1], "Read Speed: 1.5 GB/s");
        assert_eq!(lines[3], "Free Space: 128.25 GB");
        assert_eq!(lines[4], "Filesystem Type: ext4");
    }

    #[test]
    fn test_exhausted_is_infinite() {
        assert!(AllocationOutcome::Exhausted.duration_seconds().is_infinite());
        assert_eq!(
            AllocationOutcome::Completed(Duration::from_millis(250)).duration_seconds(),
            0.25
        );
    }

    #[test]
    fn test_sample_summary() {
        let ok = MemorySample::new(2, AllocationOutcome::Completed(Duration::from_millis(410)));
        assert_eq!(ok.summary(), "Size: 2 GB - Time: 0.41 seconds");

        let failed = MemorySample::new(5, AllocationOutcome::Exhausted);
        assert!(failed.summary().starts_with("Size: 5 GB - Time: ∞"));
    }

    #[test]
    fn test_run_queries() {
        let run = sample_run();
        assert_eq!(run.len(), 3);
        assert!(run.is_complete());
        assert_eq!(run.largest_successful_gb(), Some(3));
        assert_eq!(run.chart_points(), vec![(1.0, 0.3), (3.0, 0.9)]);

        let mut cancelled = MemoryTestRun::new(3, BufferRetention::Retain);
        cancelled.cancelled = true;
        assert!(!cancelled.is_complete());
        assert!(cancelled.is_empty());
        assert_eq!(cancelled.largest_successful_gb(), None);
    }

    #[test]
    fn test_serde_serialization() {
        let result = create_test_result();
        let json = serde_json::to_string(&result).expect("Failed to serialize");
        let back: DiskTestResult = serde_json::from_str(&json).expect("Failed to deserialize");

        assert_eq!(back.read_time, result.read_time);
        assert_eq!(back.filesystem_type, "ext4");
        assert_eq!(back.timestamp, result.timestamp);

        let run = sample_run();
        let json = serde_json::to_string(&run).expect("Failed to serialize run");
        let back: MemoryTestRun = serde_json::from_str(&json).expect("Failed to deserialize run");
        assert_eq!(back.samples, run.samples);
    }
}
