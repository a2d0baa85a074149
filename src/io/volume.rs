//! Volume enumeration and usage queries
//!
//! Linux reads `/proc/mounts` and asks `statvfs` for usage numbers. Other
//! platforms go through `sysinfo`'s disk list.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reported when the filesystem type cannot be determined
pub const UNKNOWN_FS: &str = "unknown";

/// A mounted volume the disk test can target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Backing device, if the mount table names one
    pub device: Option<String>,
    /// Where the volume is mounted
    pub mount_point: PathBuf,
    /// Filesystem type, `"unknown"` when it could not be read
    pub fs_type: String,
}

impl Volume {
    /// One-line label for menus
    pub fn label(&self) -> String {
        match &self.device {
            Some(device) => format!(
                "{} ({}, {})",
                self.mount_point.display(),
                device,
                self.fs_type
            ),
            None => format!("{} ({})", self.mount_point.display(), self.fs_type),
        }
    }
}

/// Capacity numbers for the volume holding a path, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeUsage {
    pub total_bytes: u64,
    /// Space available to an unprivileged user
    pub free_bytes: u64,
}

// Pseudo filesystems never worth benchmarking
const VIRTUAL_FS: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devpts",
    "devtmpfs",
    "efivarfs",
    "fusectl",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "proc",
    "pstore",
    "ramfs",
    "rpc_pipefs",
    "securityfs",
    "selinuxfs",
    "squashfs",
    "sysfs",
    "tracefs",
];

/// Whether a filesystem type holds real data (tmpfs counts)
pub fn is_physical(fs_type: &str) -> bool {
    !VIRTUAL_FS.contains(&fs_type) && !fs_type.starts_with("fuse.portal")
}

fn fix_mount_point(s: &str) -> String {
    s.replace("\\134", "\\")
        .replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
}

/// Parse one mount table line, e.g. `/dev/sda3 /home ext4 rw,relatime 0 0`
pub fn parse_mount_line(line: &str) -> Option<Volume> {
    let mut parts = line.split_whitespace();

    let device = match parts.next()? {
        "none" => None,
        device => Some(device.to_string()),
    };
    let mount_point = PathBuf::from(fix_mount_point(parts.next()?));
    let fs_type = parts.next()?.to_string();

    Some(Volume {
        device,
        mount_point,
        fs_type,
    })
}

/// Parse a whole mount table, keeping physical filesystems only
pub fn parse_mounts(content: &str) -> Vec<Volume> {
    let mut volumes: Vec<Volume> = Vec::new();

    for volume in content.lines().filter_map(parse_mount_line) {
        if !is_physical(&volume.fs_type) {
            continue;
        }
        // Bind mounts and overmounts show up more than once; the last entry wins
        if let Some(existing) = volumes
            .iter_mut()
            .find(|v| v.mount_point == volume.mount_point)
        {
            *existing = volume;
        } else {
            volumes.push(volume);
        }
    }

    volumes
}

/// Filesystem type of the longest mount point containing `path`
pub fn fs_type_for_path(volumes: &[Volume], path: &Path) -> Option<String> {
    volumes
        .iter()
        .filter(|v| path.starts_with(&v.mount_point))
        .max_by_key(|v| v.mount_point.components().count())
        .map(|v| v.fs_type.clone())
}

/// List volumes the disk test can target.
///
/// Never empty: falls back to the current directory.
pub fn list_volumes() -> Vec<Volume> {
    let mut volumes = platform::list_volumes();

    if volumes.is_empty() {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let fs_type = filesystem_type(&cwd);
        volumes.push(Volume {
            device: None,
            mount_point: cwd,
            fs_type,
        });
    }

    debug!(count = volumes.len(), "enumerated volumes");
    volumes
}

/// `target` first, followed by every other listed volume
pub fn volumes_with_target(target: &Path) -> Vec<Volume> {
    let mut volumes = vec![Volume {
        device: None,
        mount_point: target.to_path_buf(),
        fs_type: filesystem_type(target),
    }];
    volumes.extend(
        list_volumes()
            .into_iter()
            .filter(|v| v.mount_point != target),
    );
    volumes
}

/// Capacity and free space of the volume holding `path`
pub fn volume_usage(path: &Path) -> io::Result<VolumeUsage> {
    platform::volume_usage(path)
}

/// Filesystem type of the volume holding `path`, `"unknown"` on failure
pub fn filesystem_type(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    platform::filesystem_type(&canonical)
        .filter(|fs| !fs.is_empty())
        .unwrap_or_else(|| UNKNOWN_FS.to_string())
}

#[cfg(target_os = "linux")]
mod platform {
    use super::{Volume, VolumeUsage};
    use std::ffi::CString;
    use std::io;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    fn c_path(path: &Path) -> io::Result<CString> {
        CString::new(path.as_os_str().as_bytes())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"))
    }

    #[allow(clippy::unnecessary_cast)]
    pub fn volume_usage(path: &Path) -> io::Result<VolumeUsage> {
        let c_path = c_path(path)?;
        let mut vfs = MaybeUninit::<libc::statvfs>::uninit();

        // SAFETY: `c_path` is a valid C string and `vfs` is writable.
        let result = unsafe { libc::statvfs(c_path.as_ptr(), vfs.as_mut_ptr()) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: statvfs returned 0, so the struct is initialized.
        let vfs = unsafe { vfs.assume_init() };
        let frsize = vfs.f_frsize as u64;

        Ok(VolumeUsage {
            total_bytes: (vfs.f_blocks as u64).saturating_mul(frsize),
            free_bytes: (vfs.f_bavail as u64).saturating_mul(frsize),
        })
    }

    fn read_mounts() -> Vec<Volume> {
        std::fs::read_to_string("/proc/mounts")
            .map(|content| super::parse_mounts(&content))
            .unwrap_or_default()
    }

    pub fn list_volumes() -> Vec<Volume> {
        read_mounts()
            .into_iter()
            .filter(|v| v.mount_point.is_dir())
            .collect()
    }

    pub fn filesystem_type(path: &Path) -> Option<String> {
        super::fs_type_for_path(&read_mounts(), path)
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use super::{Volume, VolumeUsage};
    use std::io;
    use std::path::{Path, PathBuf};
    use sysinfo::{Disk, Disks};

    fn to_volume(disk: &Disk) -> Volume {
        let name = disk.name().to_string_lossy();
        Volume {
            device: (!name.is_empty()).then(|| name.into_owned()),
            mount_point: disk.mount_point().to_path_buf(),
            fs_type: disk.file_system().to_string_lossy().into_owned(),
        }
    }

    // Compared canonically so `\\?\C:\` style prefixes line up on windows
    fn canonical(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    }

    /// Disk with the longest mount point containing `path`
    fn disk_for<'a>(disks: &'a Disks, path: &Path) -> Option<&'a Disk> {
        let path = canonical(path);
        disks
            .list()
            .iter()
            .map(|d| (canonical(d.mount_point()), d))
            .filter(|(mount, _)| path.starts_with(mount))
            .max_by_key(|(mount, _)| mount.components().count())
            .map(|(_, d)| d)
    }

    pub fn volume_usage(path: &Path) -> io::Result<VolumeUsage> {
        let disks = Disks::new_with_refreshed_list();
        disk_for(&disks, path)
            .map(|d| VolumeUsage {
                total_bytes: d.total_space(),
                free_bytes: d.available_space(),
            })
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no mounted volume contains {}", path.display()),
                )
            })
    }

    pub fn filesystem_type(path: &Path) -> Option<String> {
        let disks = Disks::new_with_refreshed_list();
        disk_for(&disks, path).map(|d| d.file_system().to_string_lossy().into_owned())
    }

    pub fn list_volumes() -> Vec<Volume> {
        Disks::new_with_refreshed_list()
            .list()
            .iter()
            .filter(|d| d.mount_point().is_dir())
            .map(to_volume)
            .collect()
    }
}
