//! Background benchmark tasks
//!
//! Both benchmarks are blocking, so they run on tokio's blocking pool.
//! Progress streams back over an mpsc channel; a memory sweep can be
//! cancelled between steps through a oneshot.

use crate::bench::disk::{DiskBenchmark, DiskPhase};
use crate::bench::memory::{run_sweep_until, SweepAllocator, SweepProgress};
use crate::io::disk::DiskIO;
use crate::models::{DiskTestResult, MemoryTestRun};
use crate::Result;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

const PROGRESS_CHANNEL_CAPACITY: usize = 100;

/// A running memory sweep
pub struct SweepHandle {
    /// One update per finished step
    pub progress_rx: mpsc::Receiver<SweepProgress>,
    cancel_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<MemoryTestRun>,
}

impl SweepHandle {
    /// Ask the sweep to stop before its next step
    pub fn cancel(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            // Ignore errors if the sweep already finished
            let _ = cancel_tx.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the sweep; a cancelled sweep yields its partial run
    pub async fn join(self) -> Result<MemoryTestRun> {
        let SweepHandle {
            cancel_tx, handle, ..
        } = self;
        let run = handle.await?;
        drop(cancel_tx);
        Ok(run)
    }
}

/// Run a sweep over `1..=max_gb` on the blocking pool
pub fn spawn_memory_sweep<P>(mut allocator: P, max_gb: u32) -> SweepHandle
where
    P: SweepAllocator + Send + 'static,
{
    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let (cancel_tx, mut cancel_rx) = oneshot::channel();

    let handle = tokio::task::spawn_blocking(move || {
        debug!(max_gb, "memory sweep task started");
        run_sweep_until(
            &mut allocator,
            max_gb,
            |progress| {
                // Receiver gone means nobody is watching; keep measuring
                let _ = progress_tx.blocking_send(progress);
            },
            || cancel_rx.try_recv().is_ok(),
        )
    });

    SweepHandle {
        progress_rx,
        cancel_tx: Some(cancel_tx),
        handle,
    }
}

/// A running disk test
pub struct DiskTestHandle {
    /// One update per phase
    pub phase_rx: mpsc::Receiver<DiskPhase>,
    handle: JoinHandle<Result<DiskTestResult>>,
}

impl DiskTestHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> Result<DiskTestResult> {
        self.handle.await?
    }
}

/// Run the platform disk test on the blocking pool
pub fn spawn_disk_test(target: PathBuf, size_mb: u32) -> DiskTestHandle {
    spawn_disk_test_with(DiskBenchmark::new(), target, size_mb)
}

/// Run a disk test with a specific benchmark on the blocking pool
pub fn spawn_disk_test_with<D>(
    benchmark: DiskBenchmark<D>,
    target: PathBuf,
    size_mb: u32,
) -> DiskTestHandle
where
    D: DiskIO + 'static,
{
    let (phase_tx, phase_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);

    let handle = tokio::task::spawn_blocking(move || {
        debug!(target = %target.display(), size_mb, "disk test task started");
        benchmark.run_with_progress(&target, size_mb, |phase| {
            let _ = phase_tx.blocking_send(phase);
        })
    });

    DiskTestHandle { phase_rx, handle }
}
