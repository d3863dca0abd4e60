//! System-V shared-memory strategy.
//!
//! Segments are kernel-namespace resources: once `shmget` succeeds they
//! exist independently of this process and must be destroyed explicitly.
//! All bookkeeping therefore lives in [`SegmentRegistry`], whose `Drop`
//! detaches and destroys every recorded segment in reverse creation
//! order, so the success path and every failure path unwind through the
//! same code.

use std::ptr;

use log::warn;

use super::MIB;
use crate::error::AllocError;
use crate::fill;
use crate::hold::HoldController;

/// Segments match the common 2 MiB hugepage, so the segment count equals
/// the hugepage count for the hugepage-backed variant.
const SEGMENT_BYTES: usize = 2 * MIB;

struct Segment {
    id: libc::c_int,
    /// `None` while the segment is created but not yet attached.
    addr: Option<*mut u8>,
}

/// Ordered bookkeeping for the segments of one request.
///
/// Invariant: the registry holds exactly the segments currently registered
/// with the kernel IPC namespace; a segment the kernel knows about is
/// never outside the registry, so dropping the registry is always a
/// complete cleanup.
struct SegmentRegistry {
    segments: Vec<Segment>,
}

impl SegmentRegistry {
    fn with_capacity(count: usize) -> Self {
        SegmentRegistry {
            segments: Vec::with_capacity(count),
        }
    }

    /// Creates one new segment without attaching it.
    fn create(&mut self, bytes: usize, huge_pages: bool) -> Result<(), AllocError> {
        let mut flags = libc::IPC_CREAT | 0o600;
        if huge_pages {
            flags |= libc::SHM_HUGETLB;
        }
        let id = unsafe { libc::shmget(libc::IPC_PRIVATE, bytes, flags) };
        if id == -1 {
            return Err(AllocError::SegmentCreateFailed(
                std::io::Error::last_os_error(),
            ));
        }
        self.segments.push(Segment { id, addr: None });
        Ok(())
    }

    /// Attaches the most recently created segment into the address space.
    fn attach_last(&mut self) -> Result<*mut u8, AllocError> {
        let segment = self.segments.last_mut().expect("attach before create");
        let addr = unsafe { libc::shmat(segment.id, ptr::null(), 0) };
        if addr as isize == -1 {
            // the registry still records the id, Drop will destroy it
            return Err(AllocError::SegmentAttachFailed(
                std::io::Error::last_os_error(),
            ));
        }
        let addr = addr as *mut u8;
        segment.addr = Some(addr);
        Ok(addr)
    }
}

impl Drop for SegmentRegistry {
    fn drop(&mut self) {
        for segment in self.segments.drain(..).rev() {
            unsafe {
                if let Some(addr) = segment.addr
                    && libc::shmdt(addr as *const libc::c_void) == -1
                {
                    warn!(
                        "shmdt of segment {} failed: {}",
                        segment.id,
                        std::io::Error::last_os_error()
                    );
                }
                if libc::shmctl(segment.id, libc::IPC_RMID, ptr::null_mut()) == -1 {
                    warn!(
                        "destroying segment {} failed: {}",
                        segment.id,
                        std::io::Error::last_os_error()
                    );
                }
            }
        }
    }
}

/// Allocates `total` bytes as 2 MiB System-V segments, fills each one, and
/// destroys everything after the hold.
pub(crate) fn allocate(
    total: usize,
    huge_pages: bool,
    hold: &HoldController,
) -> Result<(), AllocError> {
    let count = total / SEGMENT_BYTES;
    if huge_pages {
        println!(
            "Allocating {} MiB of huge pages ({} pages)",
            total / MIB,
            count
        );
        println!("Assuming 2 MiB huge pages...");
    } else {
        println!(
            "Allocating {} MiB of shared memory in 2 MiB segments...",
            total / MIB
        );
    }

    let mut registry = SegmentRegistry::with_capacity(count);
    for _ in 0..count {
        registry.create(SEGMENT_BYTES, huge_pages)?;
        let addr = registry.attach_last()?;
        unsafe { fill::fill(addr, SEGMENT_BYTES) };
    }

    println!("Done\n");
    hold.hold();
    drop(registry);
    Ok(())
}
