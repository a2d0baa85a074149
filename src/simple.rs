//! Line-mode front end
//!
//! Lists the volumes, asks for a target and a size, runs the disk test with
//! a spinner and then optionally runs the memory sweep with a progress bar.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use crate::bench::{spawn_disk_test, spawn_memory_sweep, MemoryBenchmark};
use crate::config::{validate_size_mb, validate_target_path, AppConfig, BufferRetention};
use crate::io::{memory_status, ram_modules, Volume};
use crate::models::{DiskTestResult, MemoryTestRun};
use crate::util::units::{format_gb, parse_size_mb};
use crate::Result;

/// Everything a line-mode session measured
#[derive(Debug, Default, Serialize)]
pub struct SimpleReport {
    pub disk: Option<DiskTestResult>,
    pub memory: Option<MemoryTestRun>,
}

impl SimpleReport {
    /// Human-readable lines for the terminal
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(disk) = &self.disk {
            lines.push(format!(
                "Disk test on {} ({} MB)",
                disk.target.display(),
                disk.size_mb
            ));
            lines.extend(disk.summary_lines());
        }
        if let Some(memory) = &self.memory {
            lines.push(format!("Memory test up to {} GB", memory.max_gb));
            lines.extend(memory.samples.iter().map(|s| s.summary()));
            if memory.cancelled {
                lines.push("Cancelled".to_string());
            }
        }
        lines
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Print the volumes and ask for one. Empty input or EOF picks the first.
pub fn choose_volume<R: BufRead, W: Write>(
    volumes: &[Volume],
    input: &mut R,
    out: &mut W,
) -> Result<PathBuf> {
    writeln!(out, "Available disks:")?;
    for (i, volume) in volumes.iter().enumerate() {
        writeln!(out, "{}: {}", i + 1, volume.label())?;
    }

    loop {
        write!(out, "Enter disk number (default 1): ")?;
        out.flush()?;

        let choice = match read_line(input)? {
            None => 1,
            Some(line) if line.is_empty() => 1,
            Some(line) => match line.parse::<usize>() {
                Ok(n) if (1..=volumes.len()).contains(&n) => n,
                _ => {
                    writeln!(out, "Invalid selection: {}", line)?;
                    continue;
                }
            },
        };

        return Ok(volumes
            .get(choice - 1)
            .map(|v| v.mount_point.clone())
            .unwrap_or_else(|| PathBuf::from(".")));
    }
}

/// Ask for the test file size in MB, re-prompting on bad input
pub fn ask_size<R: BufRead, W: Write>(default_mb: u32, input: &mut R, out: &mut W) -> Result<u32> {
    loop {
        write!(out, "File size in MB (default {}): ", default_mb)?;
        out.flush()?;

        let line = match read_line(input)? {
            None => return Ok(default_mb),
            Some(line) if line.is_empty() => return Ok(default_mb),
            Some(line) => line,
        };

        let size_mb = match parse_size_mb(&line) {
            Ok(size_mb) => size_mb,
            Err(msg) => {
                writeln!(out, "{}", msg)?;
                continue;
            }
        };
        match validate_size_mb(size_mb) {
            Ok(()) => return Ok(size_mb),
            Err(e) => writeln!(out, "{}", e)?,
        }
    }
}

/// Yes/no question; anything but y/yes is no
pub fn ask_yes_no<R: BufRead, W: Write>(prompt: &str, input: &mut R, out: &mut W) -> Result<bool> {
    write!(out, "{} [y/N]: ", prompt)?;
    out.flush()?;
    Ok(matches!(
        read_line(input)?.as_deref().map(str::to_lowercase).as_deref(),
        Some("y") | Some("yes")
    ))
}

fn style(template: &str, fallback: ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or(fallback)
}

/// Run the disk test, showing the current phase on a spinner
pub async fn run_disk_test(target: PathBuf, size_mb: u32) -> Result<DiskTestResult> {
    validate_target_path(&target)?;
    validate_size_mb(size_mb)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(style(
        "{spinner} {msg} [{elapsed}]",
        ProgressStyle::default_spinner(),
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut handle = spawn_disk_test(target, size_mb);
    while let Some(phase) = handle.phase_rx.recv().await {
        pb.set_message(phase.label());
    }
    pb.finish_and_clear();

    handle.join().await
}

/// Run the memory sweep with a progress bar; Ctrl+C cancels it
pub async fn run_memory_sweep(max_gb: u32, retention: BufferRetention) -> Result<MemoryTestRun> {
    let pb = ProgressBar::new(u64::from(max_gb));
    pb.set_style(style(
        "{bar:40} {pos}/{len} GB {msg}",
        ProgressStyle::default_bar(),
    ));

    let mut handle = spawn_memory_sweep(MemoryBenchmark::with_retention(retention), max_gb);
    loop {
        tokio::select! {
            progress = handle.progress_rx.recv() => match progress {
                Some(progress) => pb.set_position(u64::from(progress.completed)),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "could not listen for Ctrl+C");
                }
                pb.set_message("cancelling");
                handle.cancel();
            }
        }
    }
    pb.finish_and_clear();

    handle.join().await
}

/// Interactive line-mode session
pub async fn run(config: AppConfig, volumes: Vec<Volume>, json: bool) -> Result<SimpleReport> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    // Keep stdout clean for JSON
    let mut out: Box<dyn Write> = if json {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    };

    let target = choose_volume(&volumes, &mut input, &mut out)?;
    let size_mb = ask_size(config.disk.size_mb, &mut input, &mut out)?;
    info!(target = %target.display(), size_mb, "starting disk test");

    let mut report = SimpleReport {
        disk: Some(run_disk_test(target, size_mb).await?),
        memory: None,
    };

    match memory_status() {
        Ok(status) => {
            let max_gb = config.memory.resolve_max_gb(&status);
            writeln!(
                out,
                "Total RAM: {}   Available RAM: {}",
                format_gb(status.total_gb()),
                format_gb(status.available_gb())
            )?;
            for module in ram_modules().unwrap_or_default() {
                writeln!(out, "{}", module.describe())?;
            }

            if max_gb == 0 {
                writeln!(out, "Not enough available memory for a 1 GB step.")?;
            } else if ask_yes_no(
                &format!("Run the memory allocation test up to {} GB?", max_gb),
                &mut input,
                &mut out,
            )? {
                report.memory = Some(run_memory_sweep(max_gb, config.memory.retention).await?);
            }
        }
        Err(e) => {
            warn!(error = %e, "skipping memory test");
            writeln!(out, "Memory test unavailable: {}", e)?;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AllocationOutcome, MemorySample};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn volumes() -> Vec<Volume> {
        vec![
            Volume {
                device: Some("/dev/sda1".to_string()),
                mount_point: PathBuf::from("/"),
                fs_type: "ext4".to_string(),
            },
            Volume {
                device: Some("/dev/sdb1".to_string()),
                mount_point: PathBuf::from("/data"),
                fs_type: "xfs".to_string(),
            },
        ]
    }

    #[test]
    fn test_choose_volume() {
        let mut out = Vec::new();
        let chosen = choose_volume(&volumes(), &mut Cursor::new("2\n"), &mut out).unwrap();
        assert_eq!(chosen, PathBuf::from("/data"));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1: / (/dev/sda1, ext4)"));
        assert!(text.contains("2: /data (/dev/sdb1, xfs)"));
    }

    #[test]
    fn test_choose_volume_reprompts_and_defaults() {
        let mut out = Vec::new();
        let chosen = choose_volume(&volumes(), &mut Cursor::new("9\nabc\n\n"), &mut out).unwrap();
        assert_eq!(chosen, PathBuf::from("/"));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Invalid selection: 9"));
        assert!(text.contains("Invalid selection: abc"));

        let chosen = choose_volume(&volumes(), &mut Cursor::new(""), &mut Vec::new()).unwrap();
        assert_eq!(chosen, PathBuf::from("/"));
    }

    #[test]
    fn test_ask_size() {
        assert_eq!(ask_size(100, &mut Cursor::new("\n"), &mut Vec::new()).unwrap(), 100);
        assert_eq!(ask_size(100, &mut Cursor::new("250\n"), &mut Vec::new()).unwrap(), 250);

        let mut out = Vec::new();
        let size = ask_size(100, &mut Cursor::new("0\n-5\n1.5\n64\n"), &mut out).unwrap();
        assert_eq!(size, 64);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("File size must be a positive number"));
        assert!(text.contains("Invalid file size value: -5"));
        assert!(text.contains("Invalid file size value: 1.5"));
    }

    #[test]
    fn test_ask_size_rejects_oversized() {
        let mut out = Vec::new();
        let size = ask_size(100, &mut Cursor::new("999999\n10\n"), &mut out).unwrap();
        assert_eq!(size, 10);
        assert!(String::from_utf8(out).unwrap().contains("File size too large"));
    }

    #[test]
    fn test_ask_yes_no() {
        assert!(ask_yes_no("Run?", &mut Cursor::new("y\n"), &mut Vec::new()).unwrap());
        assert!(ask_yes_no("Run?", &mut Cursor::new("YES\n"), &mut Vec::new()).unwrap());
        assert!(!ask_yes_no("Run?", &mut Cursor::new("\n"), &mut Vec::new()).unwrap());
        assert!(!ask_yes_no("Run?", &mut Cursor::new(""), &mut Vec::new()).unwrap());
    }

    #[test]
    fn test_report_lines_and_json() {
        let mut memory = MemoryTestRun::new(2, BufferRetention::Release);
        memory.push(MemorySample::new(
            1,
            AllocationOutcome::Completed(Duration::from_millis(500)),
        ));
        memory.push(MemorySample::new(2, AllocationOutcome::Exhausted));
        let report = SimpleReport {
            disk: None,
            memory: Some(memory),
        };

        let lines = report.lines();
        assert_eq!(lines[0], "Memory test up to 2 GB");
        assert_eq!(lines[1], "Size: 1 GB - Time: 0.50 seconds");
        assert_eq!(lines[2], "Size: 2 GB - Time: ∞ (allocation failed)");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["disk"].is_null());
        assert_eq!(json["memory"]["max_gb"], 2);
        assert_eq!(json["memory"]["samples"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_disk_test_small_file() {
        let temp_dir = tempdir().unwrap();
        let result = run_disk_test(temp_dir.path().to_path_buf(), 1).await.unwrap();
        assert_eq!(result.size_mb, 1);
        assert!(result.write_speed_mb_s > 0.0);
        assert!(result.read_speed_mb_s > 0.0);
    }

    #[tokio::test]
    async fn test_run_disk_test_missing_target() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("missing");
        assert!(run_disk_test(missing, 1).await.is_err());
    }
}
