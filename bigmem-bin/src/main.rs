//! `bigmem` is a tool to allocate large amounts of memory in various ways.
//!
//! It acquires the requested amount through one of six strategies, forces
//! the allocation resident (unless asked not to), prints its PID so an
//! observer can inspect the process, and holds everything until the
//! operator presses Enter or a termination signal arrives. Shared-memory
//! segments and backing files are always cleaned up, even when the run is
//! interrupted or fails half-way through.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use log::debug;

use bigmem_core::{HoldController, Method, Request, parse_size};

/// Allocate large amounts of memory and hold it until interrupted.
///
/// Without any option, bigmem allocates the requested memory on the heap
/// in 1 MiB chunks and fills every chunk to force physical residency.
#[derive(Debug, Parser)]
#[command(name = "bigmem", version, about)]
struct CliArgs {
    /// The amount of memory to allocate, with an optional k, m, or g suffix.
    #[arg(value_name = "SIZE")]
    size: String,
    /// Allocate SYS-V style shared-memory segments backed by huge pages.
    /// Each segment is 2 MiB; the segment count is computed from SIZE.
    #[arg(short = 'H', long)]
    hugepages: bool,
    /// Allocate SYS-V style shared-memory segments of 2 MiB each.
    #[arg(short, long)]
    shared: bool,
    /// Allocate POSIX style shared memory backed by huge pages. DIR is the
    /// hugetlbfs mount point (mount -t hugetlbfs nodev DIR).
    #[arg(short, long, value_name = "DIR")]
    mmap: Option<PathBuf>,
    /// Allocate the memory in 8 MiB heap chunks (and fill it), thus
    /// triggering transparent hugepages.
    #[arg(short = 'T', long)]
    transparent: bool,
    /// Allocate the memory in 1 MiB heap chunks, but leave it untouched.
    #[arg(short = 'v', long = "virtual")]
    virtual_only: bool,
    /// Allocate the requested memory in one single heap allocation.
    #[arg(short, long)]
    block: bool,
}

impl CliArgs {
    /// Resolves the strategy flags; the first match in a fixed priority
    /// order wins, so combined flags never race each other.
    fn method(&self) -> Method {
        if self.virtual_only {
            Method::HeapChunkedVirtual
        } else if self.transparent {
            Method::TransparentHuge
        } else if self.hugepages {
            Method::SysvShared { huge_pages: true }
        } else if self.shared {
            Method::SysvShared { huge_pages: false }
        } else if self.block {
            Method::OneBigChunk
        } else if let Some(dir) = &self.mmap {
            Method::MmapHugepage { mount: dir.clone() }
        } else {
            Method::HeapChunked
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            // clap renders the error together with the usage text, on stderr
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let size_bytes = match parse_size(&args.size) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Wrong allocation size provided: {}: {}", args.size, e);
            return ExitCode::FAILURE;
        }
    };

    let request = Request {
        size_bytes,
        method: args.method(),
    };
    debug!("resolved request: {:?}", request);

    // handlers first, so a signal during a long acquisition cannot bypass
    // the release phase
    let hold = HoldController::install();
    println!("Process PID: {}", std::process::id());

    match request.run(&hold) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
