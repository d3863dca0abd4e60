//! Errors surfaced by the allocation strategies.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can happen while acquiring or mapping memory.
///
/// Every variant is terminal for the current request; partial acquisitions
/// are unwound before the error reaches the caller.
#[derive(Debug, Error)]
pub enum AllocError {
    /// The heap refused an allocation of this many bytes.
    #[error("heap allocation of {0} bytes failed")]
    AllocationFailed(usize),
    /// `shmget` could not create a new System-V segment.
    #[error("shmget failed: {0}")]
    SegmentCreateFailed(#[source] std::io::Error),
    /// `shmat` could not attach a freshly created segment.
    #[error("shmat failed: {0}")]
    SegmentAttachFailed(#[source] std::io::Error),
    /// The backing file inside the hugetlbfs mount could not be created.
    #[error("cannot create the {} file: {source}", path.display())]
    FileOpenFailed {
        /// Full path of the file that could not be created.
        path: PathBuf,
        /// The underlying OS error.
        source: std::io::Error,
    },
    /// `mmap` refused to map the backing file.
    #[error("mmap failed: {0}")]
    MapFailed(#[source] std::io::Error),
}
