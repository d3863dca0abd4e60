//! Hugetlbfs-backed mmap strategy.
//!
//! A file with a fixed name is created inside the given mount point and
//! mapped shared/read-write for the full request size. The backing file is
//! a filesystem-visible resource: both guard types below clean up in
//! `Drop`, so the file is gone after a completed hold and after any
//! failure past its creation.

use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::ptr::null_mut;

use log::{debug, warn};

use super::MIB;
use crate::error::AllocError;
use crate::fill;
use crate::hold::HoldController;

/// Fixed name of the backing file created inside the mount point.
const BACKING_FILE: &str = "hugepagetest";

/// The open backing file. Dropping it closes the descriptor and removes
/// the file.
#[derive(Debug)]
struct BackingFile {
    fd: libc::c_int,
    path: PathBuf,
    cpath: CString,
}

impl BackingFile {
    fn create(path: PathBuf) -> Result<Self, AllocError> {
        let cpath = CString::new(path.as_os_str().as_encoded_bytes())
            .map_err(|_| AllocError::FileOpenFailed {
                path: path.clone(),
                source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
            })?;
        let fd = unsafe { libc::open(cpath.as_ptr(), libc::O_CREAT | libc::O_RDWR, 0o755) };
        if fd == -1 {
            return Err(AllocError::FileOpenFailed {
                path,
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(BackingFile { fd, path, cpath })
    }

    /// Grows the file to the mapping size.
    ///
    /// hugetlbfs sizes its files implicitly when they are mapped, and its
    /// ftruncate only accepts hugepage-multiple sizes, so failure here is
    /// not fatal. On regular filesystems the grow must succeed or stores
    /// into the mapping would fault.
    fn grow(&self, bytes: usize) {
        if unsafe { libc::ftruncate(self.fd, bytes as libc::off_t) } == -1 {
            debug!(
                "ftruncate of {} to {} bytes failed: {}",
                self.path.display(),
                bytes,
                std::io::Error::last_os_error()
            );
        }
    }
}

impl Drop for BackingFile {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
            if libc::unlink(self.cpath.as_ptr()) == -1 {
                warn!(
                    "removing {} failed: {}",
                    self.path.display(),
                    std::io::Error::last_os_error()
                );
            }
        }
    }
}

/// A shared, writable mapping of the backing file. Dropping it unmaps.
#[derive(Debug)]
struct Mapping {
    ptr: *mut u8,
    len: usize,
}

impl Mapping {
    fn map(file: &BackingFile, len: usize) -> Result<Self, AllocError> {
        let ptr = unsafe {
            libc::mmap(
                null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.fd,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(AllocError::MapFailed(std::io::Error::last_os_error()));
        }
        Ok(Mapping {
            ptr: ptr as *mut u8,
            len,
        })
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.ptr as *mut libc::c_void, self.len) };
    }
}

/// Maps `total` bytes from a file inside the hugetlbfs mount at `mount`,
/// fills the mapping, and removes the file after the hold.
pub(crate) fn allocate(
    total: usize,
    mount: &Path,
    hold: &HoldController,
) -> Result<(), AllocError> {
    let path = mount.join(BACKING_FILE);
    println!(
        "Allocating {} MiB of huge pages by mapping the {} file...",
        total / MIB,
        path.display()
    );

    let file = BackingFile::create(path)?;
    file.grow(total);
    let mapping = Mapping::map(&file, total)?;
    unsafe { fill::fill(mapping.ptr, mapping.len) };

    println!("Done\n");
    hold.hold();

    // munmap, then close and unlink
    drop(mapping);
    drop(file);
    Ok(())
}
