//! Memory allocation benchmark
//!
//! Times how long it takes to obtain and fill an `f64` buffer of a given
//! size, and sweeps that measurement over growing sizes.

use crate::config::BufferRetention;
use crate::models::{AllocationOutcome, MemorySample, MemoryTestRun};
use crate::util::units::GIB;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, info};

/// Progress of a running sweep, sent once per finished step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepProgress {
    /// Steps finished so far
    pub completed: u32,
    /// Steps in the whole sweep
    pub total: u32,
    /// `completed / total` as 0 to 100
    pub percent: u16,
}

impl SweepProgress {
    pub fn new(completed: u32, total: u32) -> Self {
        let percent = if total == 0 {
            100
        } else {
            (u64::from(completed.min(total)) * 100 / u64::from(total)) as u16
        };
        Self {
            completed,
            total,
            percent,
        }
    }
}

/// Something that can attempt an allocation of a whole number of GB
pub trait SweepAllocator {
    fn allocate(&mut self, size_gb: u32) -> AllocationOutcome;

    /// Retention policy recorded on the run
    fn retention(&self) -> BufferRetention {
        BufferRetention::Release
    }

    /// Called once when the sweep is over
    fn finish(&mut self) {}
}

/// Allocates and fills `f64` buffers, timing each attempt
pub struct MemoryBenchmark {
    rng: SmallRng,
    retention: BufferRetention,
    retained: Vec<Vec<f64>>,
}

impl MemoryBenchmark {
    pub fn new() -> Self {
        Self::with_retention(BufferRetention::default())
    }

    pub fn with_retention(retention: BufferRetention) -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            retention,
            retained: Vec::new(),
        }
    }

    /// Time obtaining a buffer of `size_gb` GB
    pub fn allocate(&mut self, size_gb: u32) -> AllocationOutcome {
        self.allocate_bytes(u64::from(size_gb) * GIB)
    }

    /// Time obtaining a buffer of `bytes` bytes (rounded down to whole `f64`s).
    ///
    /// The buffer is filled with uniform values in `[0, 1)` inside the timed
    /// span so every page is really touched.
    pub fn allocate_bytes(&mut self, bytes: u64) -> AllocationOutcome {
        let Ok(count) = usize::try_from(bytes / std::mem::size_of::<f64>() as u64) else {
            return AllocationOutcome::Exhausted;
        };

        let start = Instant::now();
        let mut buffer: Vec<f64> = Vec::new();
        if buffer.try_reserve_exact(count).is_err() {
            debug!(bytes, "allocation refused");
            return AllocationOutcome::Exhausted;
        }
        let rng = &mut self.rng;
        buffer.extend((0..count).map(|_| rng.gen::<f64>()));
        let elapsed = start.elapsed();

        if self.retention == BufferRetention::Retain && !buffer.is_empty() {
            self.retained.push(buffer);
        }

        AllocationOutcome::Completed(elapsed)
    }

    /// Bytes currently held by retained buffers
    pub fn retained_bytes(&self) -> u64 {
        self.retained
            .iter()
            .map(|b| (b.len() * std::mem::size_of::<f64>()) as u64)
            .sum()
    }

    /// Drop every retained buffer
    pub fn release(&mut self) {
        self.retained = Vec::new();
    }
}

impl Default for MemoryBenchmark {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepAllocator for MemoryBenchmark {
    fn allocate(&mut self, size_gb: u32) -> AllocationOutcome {
        MemoryBenchmark::allocate(self, size_gb)
    }

    fn retention(&self) -> BufferRetention {
        self.retention
    }

    fn finish(&mut self) {
        self.release();
    }
}

/// Run `allocator` for every size in `1..=max_gb`.
///
/// Failed steps are recorded and the sweep carries on.
pub fn run_sweep<P, F>(allocator: &mut P, max_gb: u32, on_progress: F) -> MemoryTestRun
where
    P: SweepAllocator + ?Sized,
    F: FnMut(SweepProgress),
{
    run_sweep_until(allocator, max_gb, on_progress, || false)
}

/// Like [`run_sweep`], checking `should_stop` before each step.
///
/// A stopped sweep keeps the samples gathered so far and is marked
/// cancelled.
pub fn run_sweep_until<P, F, S>(
    allocator: &mut P,
    max_gb: u32,
    mut on_progress: F,
    mut should_stop: S,
) -> MemoryTestRun
where
    P: SweepAllocator + ?Sized,
    F: FnMut(SweepProgress),
    S: FnMut() -> bool,
{
    let mut run = MemoryTestRun::new(max_gb, allocator.retention());
    info!(max_gb, retention = ?run.retention, "starting memory sweep");

    for size_gb in 1..=max_gb {
        if should_stop() {
            info!(completed = run.len(), "memory sweep cancelled");
            run.cancelled = true;
            break;
        }

        let outcome = allocator.allocate(size_gb);
        debug!(size_gb, ?outcome, "sweep step");
        run.push(MemorySample::new(size_gb, outcome));

        on_progress(SweepProgress::new(size_gb, max_gb));
    }

    allocator.finish();

    if !run.cancelled {
        info!(
            largest_gb = ?run.largest_successful_gb(),
            "memory sweep finished"
        );
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::units::MIB;
    use std::time::Duration;

    /// Replays a fixed list of outcomes and records the sizes asked for
    struct ScriptedAllocator {
        exhausted_at: Vec<u32>,
        requested: Vec<u32>,
        finished: bool,
    }

    impl ScriptedAllocator {
        fn failing_at(sizes: &[u32]) -> Self {
            Self {
                exhausted_at: sizes.to_vec(),
                requested: Vec::new(),
                finished: false,
            }
        }
    }

    impl SweepAllocator for ScriptedAllocator {
        fn allocate(&mut self, size_gb: u32) -> AllocationOutcome {
            self.requested.push(size_gb);
            if self.exhausted_at.contains(&size_gb) {
                AllocationOutcome::Exhausted
            } else {
                AllocationOutcome::Completed(Duration::from_millis(u64::from(size_gb) * 100))
            }
        }

        fn finish(&mut self) {
            self.finished = true;
        }
    }

    /// Real allocations scaled down to one MiB per requested GB
    struct MibScaled {
        bench: MemoryBenchmark,
        retained_at_finish: u64,
    }

    impl SweepAllocator for MibScaled {
        fn allocate(&mut self, size_gb: u32) -> AllocationOutcome {
            self.bench.allocate_bytes(u64::from(size_gb) * MIB)
        }

        fn retention(&self) -> BufferRetention {
            self.bench.retention
        }

        fn finish(&mut self) {
            self.retained_at_finish = self.bench.retained_bytes();
            self.bench.finish();
        }
    }

    #[test]
    fn test_allocate_zero_is_fast() {
        let mut bench = MemoryBenchmark::new();
        match bench.allocate(0) {
            AllocationOutcome::Completed(elapsed) => assert!(elapsed < Duration::from_millis(100)),
            AllocationOutcome::Exhausted => panic!("zero-size allocation failed"),
        }
    }

    #[test]
    fn test_allocate_bytes_small() {
        let mut bench = MemoryBenchmark::new();
        let outcome = bench.allocate_bytes(8 * MIB);
        assert!(!outcome.is_exhausted());
        assert!(outcome.duration_seconds().is_finite());
        assert_eq!(bench.retained_bytes(), 0);
    }

    #[test]
    fn test_impossible_allocation_is_exhausted() {
        let mut bench = MemoryBenchmark::new();
        assert_eq!(bench.allocate_bytes(u64::MAX), AllocationOutcome::Exhausted);
    }

    #[test]
    fn test_retain_keeps_buffers_until_release() {
        let mut bench = MemoryBenchmark::with_retention(BufferRetention::Retain);
        bench.allocate_bytes(MIB);
        bench.allocate_bytes(2 * MIB);
        assert_eq!(bench.retained_bytes(), 3 * MIB);

        bench.release();
        assert_eq!(bench.retained_bytes(), 0);
    }

    #[test]
    fn test_sweep_order_and_failure_handling() {
        let mut allocator = ScriptedAllocator::failing_at(&[2]);
        let mut progress = Vec::new();

        let run = run_sweep(&mut allocator, 3, |p| progress.push(p));

        assert_eq!(allocator.requested, vec![1, 2, 3]);
        let sizes: Vec<u32> = run.samples.iter().map(|s| s.size_gb).collect();
        assert_eq!(sizes, vec![1, 2, 3]);
        assert!(run.samples[1].duration_seconds().is_infinite());
        assert!(run.samples[2].duration_seconds().is_finite());
        assert!(run.is_complete());
        assert!(allocator.finished);

        let percents: Vec<u16> = progress.iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![33, 66, 100]);
    }

    #[test]
    fn test_empty_sweep() {
        let mut allocator = ScriptedAllocator::failing_at(&[]);
        let run = run_sweep(&mut allocator, 0, |_| panic!("no progress expected"));
        assert!(run.is_empty());
        assert!(allocator.requested.is_empty());
    }

    #[test]
    fn test_sweep_can_stop_early() {
        let mut allocator = ScriptedAllocator::failing_at(&[]);
        let mut checks = 0;

        let run = run_sweep_until(
            &mut allocator,
            5,
            |_| {},
            || {
                checks += 1;
                checks > 2
            },
        );

        assert_eq!(run.len(), 2);
        assert!(run.cancelled);
        assert!(!run.is_complete());
        assert!(allocator.finished);
    }

    #[test]
    fn test_sweep_progress_percent() {
        assert_eq!(SweepProgress::new(0, 4).percent, 0);
        assert_eq!(SweepProgress::new(1, 4).percent, 25);
        assert_eq!(SweepProgress::new(4, 4).percent, 100);
        assert_eq!(SweepProgress::new(0, 0).percent, 100);
    }

    #[test]
    fn test_real_sweep_releases_retained_buffers() {
        let mut allocator = MibScaled {
            bench: MemoryBenchmark::with_retention(BufferRetention::Retain),
            retained_at_finish: 0,
        };
        let run = run_sweep(&mut allocator, 3, |_| {});

        assert!(run.is_complete());
        assert_eq!(run.retention, BufferRetention::Retain);
        assert!(run.samples.iter().all(|s| !s.outcome.is_exhausted()));
        assert_eq!(allocator.retained_at_finish, 6 * MIB);
        assert_eq!(allocator.bench.retained_bytes(), 0);
    }
}
