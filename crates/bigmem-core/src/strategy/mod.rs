//! The six allocation strategies and their shared lifecycle.
//!
//! Every strategy runs the same sequence: acquire, optionally fill, hold
//! exactly once, then release. Heap-based strategies release implicitly at
//! process exit; System-V and mmap strategies own kernel-visible resources
//! and unwind them explicitly, on the failure paths as well as after a
//! completed hold.

mod heap;
mod mmap;
mod sysv;

use std::path::PathBuf;

use crate::error::AllocError;
use crate::hold::HoldController;

pub(crate) const MIB: usize = 1 << 20;

/// The allocation mechanism resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// 1 MiB heap chunks, each filled to force residency. The default.
    HeapChunked,
    /// 1 MiB heap chunks, left untouched (virtual allocation only).
    HeapChunkedVirtual,
    /// 8 MiB heap chunks, filled; large enough for the kernel to promote
    /// them to anonymous huge pages opportunistically.
    TransparentHuge,
    /// One single heap allocation of the full size, filled, and freed
    /// explicitly once the hold ends.
    OneBigChunk,
    /// 2 MiB System-V shared-memory segments, optionally backed by
    /// explicit huge pages.
    SysvShared {
        /// Request `SHM_HUGETLB` backing for every segment.
        huge_pages: bool,
    },
    /// One shared file mapping of the full size from a hugetlbfs mount.
    MmapHugepage {
        /// Mount point of the hugetlbfs filesystem.
        mount: PathBuf,
    },
}

/// A resolved allocation request. Immutable once constructed, used for
/// exactly one acquire/fill/hold/release cycle.
#[derive(Debug, Clone)]
pub struct Request {
    /// Total number of bytes to acquire. Always positive.
    pub size_bytes: u64,
    /// The mechanism used to acquire them.
    pub method: Method,
}

impl Request {
    /// Runs the full allocation cycle for this request.
    ///
    /// The hold is entered exactly once, after acquisition (and fill, for
    /// resident strategies) and before anything is released.
    ///
    /// # Errors
    ///
    /// Returns the first [`AllocError`] hit during acquisition. Partial
    /// acquisitions are unwound first: no System-V segment and no backing
    /// file outlives a failed request.
    pub fn run(&self, hold: &HoldController) -> Result<(), AllocError> {
        let size = self.size_bytes as usize;
        match &self.method {
            Method::HeapChunked => heap::allocate_chunked(size, true, hold),
            Method::HeapChunkedVirtual => heap::allocate_chunked(size, false, hold),
            Method::TransparentHuge => heap::allocate_transparent(size, hold),
            Method::OneBigChunk => heap::allocate_one_big_chunk(size, hold),
            Method::SysvShared { huge_pages } => sysv::allocate(size, *huge_pages, hold),
            Method::MmapHugepage { mount } => mmap::allocate(size, mount, hold),
        }
    }
}
