//! Heap-based strategies: chunked (resident or virtual), transparent
//! hugepage candidates, and the single big block.

use std::alloc::{Layout, alloc, dealloc};

use log::debug;

use super::MIB;
use crate::error::AllocError;
use crate::fill;
use crate::hold::HoldController;

const CHUNK: usize = MIB;
const THP_CHUNK: usize = 8 * MIB;

/// Progress line interval for the 1 MiB chunked strategies.
const REPORT_EVERY: usize = 10240;

/// One heap allocation owned by a strategy.
///
/// The chunked strategies keep their chunks until process exit (the hold
/// is the last thing the process does); only the one-big-chunk strategy
/// deallocates explicitly.
#[derive(Debug)]
struct HeapChunk {
    ptr: *mut u8,
    layout: Layout,
}

impl HeapChunk {
    fn alloc(bytes: usize) -> Result<Self, AllocError> {
        let layout = Layout::from_size_align(bytes, 16)
            .map_err(|_| AllocError::AllocationFailed(bytes))?;
        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            return Err(AllocError::AllocationFailed(bytes));
        }
        Ok(HeapChunk { ptr, layout })
    }

    fn fill(&self) {
        unsafe { fill::fill(self.ptr, self.layout.size()) };
    }

    fn dealloc(self) {
        unsafe { dealloc(self.ptr, self.layout) };
    }
}

/// Allocates `total` bytes in 1 MiB chunks, filling each one iff
/// `resident` is set.
pub(crate) fn allocate_chunked(
    total: usize,
    resident: bool,
    hold: &HoldController,
) -> Result<(), AllocError> {
    let count = total / CHUNK;
    println!(
        "Allocating {} MiB of {} memory (in 1 MiB chunks)...",
        count,
        if resident { "resident" } else { "virtual" }
    );

    let mut chunks = Vec::with_capacity(count);
    for i in 1..=count {
        let chunk = HeapChunk::alloc(CHUNK)?;
        if resident {
            chunk.fill();
        }
        chunks.push(chunk);
        if i % REPORT_EVERY == 0 {
            println!("Allocated {} MiB", i);
        }
    }

    println!("Done\n");
    hold.hold();
    debug!("leaving {} heap chunks to process exit", chunks.len());
    Ok(())
}

/// Allocates `total` bytes in 8 MiB chunks, filled. Chunks this large are
/// typically served by fresh mappings the kernel can back with anonymous
/// huge pages.
pub(crate) fn allocate_transparent(
    total: usize,
    hold: &HoldController,
) -> Result<(), AllocError> {
    println!("Allocating {} MiB of memory (in 8 MiB chunks)", total / MIB);
    println!("This should result in anonymous huge pages...");

    let count = total / THP_CHUNK;
    let mut chunks = Vec::with_capacity(count);
    for i in 1..=count {
        let chunk = HeapChunk::alloc(THP_CHUNK)?;
        chunk.fill();
        chunks.push(chunk);
        if i % 10 == 0 {
            println!("Allocated {} MiB", i * 8);
        }
    }

    println!("Done\n");
    hold.hold();
    debug!("leaving {} heap chunks to process exit", chunks.len());
    Ok(())
}

/// Allocates the full size in one call, fills it, and frees it explicitly
/// once the hold ends.
pub(crate) fn allocate_one_big_chunk(
    total: usize,
    hold: &HoldController,
) -> Result<(), AllocError> {
    println!("Allocating {} MiB of resident memory...", total / MIB);

    let chunk = HeapChunk::alloc(total)?;
    chunk.fill();

    println!("Done\n");
    hold.hold();
    chunk.dealloc();
    Ok(())
}
