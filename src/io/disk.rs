use crate::{TEMP_FILE_PREFIX, TEST_DIR_NAME};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cross-platform disk I/O operations trait
pub trait DiskIO: Send + Sync {
    /// Create (or truncate) a file for writing
    fn open_write(&self, path: &Path) -> io::Result<Box<dyn DirectFile>>;

    /// Open an existing file for reading
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn DirectFile>>;
}

/// File operations used by the benchmark
pub trait DirectFile: Send {
    /// Write data, returning how many bytes were accepted
    fn write_direct(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Read data, returning how many bytes were produced (0 at EOF)
    fn read_direct(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Force synchronization to disk
    fn sync_all(&mut self) -> io::Result<()>;

    /// Ask the OS to forget cached pages of this file. Best effort.
    fn drop_cache(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Write the whole buffer through a [`DirectFile`]
pub fn write_all_direct(file: &mut dyn DirectFile, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match file.write_direct(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "device accepted no more data",
                ))
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Fill the whole buffer through a [`DirectFile`]
pub fn read_exact_direct(file: &mut dyn DirectFile, mut buf: &mut [u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match file.read_direct(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "file is shorter than what was written",
                ))
            }
            Ok(n) => buf = &mut buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Location of one test file, removed again on drop.
///
/// The file lives in a private directory under the target. When the guard
/// goes away the file is deleted. The directory goes too, but only if this
/// guard created it and nothing else is left in it.
#[derive(Debug)]
pub struct TestFile {
    dir: PathBuf,
    path: PathBuf,
    created_dir: bool,
}

impl TestFile {
    /// Reserve a test file path under `target`, creating the private directory
    pub fn prepare(target: &Path) -> io::Result<Self> {
        if !target.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("target directory {} does not exist", target.display()),
            ));
        }

        let dir = target.join(TEST_DIR_NAME);
        let created_dir = match fs::create_dir(&dir) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => false,
            Err(e) => return Err(e),
        };

        let path = dir.join(format!("{}{}.tmp", TEMP_FILE_PREFIX, std::process::id()));
        debug!(path = %path.display(), created_dir, "reserved test file");

        Ok(Self {
            dir,
            path,
            created_dir,
        })
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the private directory holding the file
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for TestFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "could not remove test file"),
        }

        if self.created_dir {
            // Fails while other files remain
            let _ = fs::remove_dir(&self.dir);
        }
    }
}

/// Platform disk I/O implementation
#[derive(Clone, Default)]
pub struct PlatformDiskIO;

impl PlatformDiskIO {
    pub fn new() -> Self {
        Self
    }
}

/// Plain file handle; platform specifics live in `drop_cache`
pub struct PlatformFile {
    file: File,
}

impl PlatformFile {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl DirectFile for PlatformFile {
    fn write_direct(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn read_direct(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn sync_all(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }

    #[cfg(target_os = "linux")]
    fn drop_cache(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        // SAFETY: the descriptor is owned by `self.file` and open for the
        // duration of the call.
        let ret = unsafe {
            libc::posix_fadvise(self.file.as_raw_fd(), 0, 0, libc::POSIX_FADV_DONTNEED)
        };
        if ret == 0 {
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(ret))
        }
    }
}

impl DiskIO for PlatformDiskIO {
    fn open_write(&self, path: &Path) -> io::Result<Box<dyn DirectFile>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(PlatformFile::new(file)))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn DirectFile>> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Box::new(PlatformFile::new(file)))
    }
}
