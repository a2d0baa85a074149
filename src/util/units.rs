//! Units formatting and conversion utilities
//!
//! Provides functions for human-readable formatting of sizes, speeds and
//! allocation times, plus the speed calculation shared by both benchmarks.

use std::time::Duration;

/// Bytes per mebibyte ("MB" throughout the UI)
pub const MIB: u64 = 1024 * 1024;
/// Bytes per gibibyte ("GB" throughout the UI)
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Shortest duration a timed phase is credited with
pub const CLOCK_FLOOR: Duration = Duration::from_micros(1);

/// Format bytes into human-readable size with appropriate units
///
/// # Examples
/// ```
/// use diskmem::util::units::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1048576), "1.0 MiB");
/// assert_eq!(format_bytes(1073741824), "1.0 GiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Convert a byte count to (binary) gigabytes
pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / GIB as f64
}

/// Format a gigabyte value the way result panels show it
///
/// # Examples
/// ```
/// use diskmem::util::units::format_gb;
///
/// assert_eq!(format_gb(12.3456), "12.35 GB");
/// ```
pub fn format_gb(gb: f64) -> String {
    format!("{:.2} GB", gb)
}

/// Speed in MB/s for `size_mb` transferred in `elapsed`.
///
/// Durations under [`CLOCK_FLOOR`] are clamped so a coarse clock never
/// yields a division by zero; the result is always finite and positive for
/// a positive size.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use diskmem::util::units::speed_mb_s;
///
/// assert!((speed_mb_s(100, Duration::from_secs(2)) - 50.0).abs() < 1e-9);
/// assert!(speed_mb_s(1, Duration::ZERO).is_finite());
/// ```
pub fn speed_mb_s(size_mb: u32, elapsed: Duration) -> f64 {
    let elapsed = elapsed.max(CLOCK_FLOOR);
    size_mb as f64 / elapsed.as_secs_f64()
}

/// Format throughput as MB/s, switching to GB/s from 1024 MB/s up
///
/// # Examples
/// ```
/// use diskmem::util::units::format_throughput;
///
/// assert_eq!(format_throughput(1024.0), "1.0 GB/s");
/// assert_eq!(format_throughput(1.5), "1.50 MB/s");
/// ```
pub fn format_throughput(mb_s: f64) -> String {
    if mb_s >= 1024.0 {
        format!("{:.1} GB/s", mb_s / 1024.0)
    } else {
        format!("{:.2} MB/s", mb_s)
    }
}

/// Format an allocation time; infinity marks an exhausted allocation
///
/// # Examples
/// ```
/// use diskmem::util::units::format_seconds;
///
/// assert_eq!(format_seconds(1.234), "1.23 seconds");
/// assert_eq!(format_seconds(f64::INFINITY), "∞ (allocation failed)");
/// ```
pub fn format_seconds(seconds: f64) -> String {
    if seconds.is_infinite() {
        "∞ (allocation failed)".to_string()
    } else {
        format!("{:.2} seconds", seconds)
    }
}

/// Parse a user-entered file size in MB.
///
/// Only positive whole numbers are accepted.
///
/// # Examples
/// ```
/// use diskmem::util::units::parse_size_mb;
///
/// assert_eq!(parse_size_mb(" 250 ").unwrap(), 250);
/// assert!(parse_size_mb("0").is_err());
/// assert!(parse_size_mb("1.5").is_err());
/// ```
pub fn parse_size_mb(input: &str) -> Result<u32, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("File size is required".to_string());
    }

    let value: u32 = input
        .parse()
        .map_err(|_| format!("Invalid file size value: {}", input))?;

    if value == 0 {
        return Err("File size must be a positive number".to_string());
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(1099511627776), "1.0 TiB");
    }

    #[test]
    fn test_bytes_to_gb() {
        assert_eq!(bytes_to_gb(GIB), 1.0);
        assert_eq!(bytes_to_gb(GIB / 2), 0.5);
        assert_eq!(bytes_to_gb(0), 0.0);
    }

    #[test]
    fn test_speed_mb_s() {
        assert!((speed_mb_s(10, Duration::from_millis(500)) - 20.0).abs() < 1e-9);
        // Clamped to the 1µs floor
        assert!((speed_mb_s(1, Duration::ZERO) - 1_000_000.0).abs() < 1e-3);
        assert_eq!(
            speed_mb_s(1, Duration::from_nanos(10)),
            speed_mb_s(1, Duration::ZERO)
        );
        assert!(speed_mb_s(1, Duration::ZERO) > 0.0);
    }

    #[test]
    fn test_format_throughput() {
        assert_eq!(format_throughput(512.0), "512.00 MB/s");
        assert_eq!(format_throughput(2048.0), "2.0 GB/s");
    }

    #[test]
    fn test_format_throughput_matches_size_units() {
        for mb_s in [0.5, 1023.9, 1024.0, 50_000.0] {
            let text = format_throughput(mb_s);
            assert!(text.ends_with(" MB/s") || text.ends_with(" GB/s"), "{}", text);
            assert!(!text.contains("iB"), "{}", text);
        }
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "0.00 seconds");
        assert!(format_seconds(f64::INFINITY).contains("failed"));
    }

    #[test]
    fn test_parse_size_mb() {
        assert_eq!(parse_size_mb("10").unwrap(), 10);
        assert!(parse_size_mb("").is_err());
        assert!(parse_size_mb("-5").is_err());
        assert!(parse_size_mb("abc").is_err());
        assert!(parse_size_mb("0").unwrap_err().contains("positive"));
    }
}
