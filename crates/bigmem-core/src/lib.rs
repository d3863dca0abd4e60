//! Core building blocks of `bigmem`, a diagnostic memory-pressure generator.
//!
//! `bigmem` acquires a requested amount of memory from the kernel through one
//! of six mechanisms (heap chunks, transparent hugepage candidates, System-V
//! shared-memory segments, a hugetlbfs file mapping, or one big heap block),
//! optionally touches every byte so the allocation becomes resident, then
//! holds everything until the operator or a termination signal ends the run.
//!
//! The one invariant this crate protects on every exit path: no kernel-visible
//! resource (a System-V segment or a mapped backing file) outlives the
//! request, not even when acquisition fails half-way through.
//!
//! ## Modules
//!
//! - [`size`]: size-string parsing.
//! - [`fill`]: the residency filler that forces physical page commitment.
//! - [`strategy`]: the six allocation strategies and their lifecycle.
//! - [`hold`]: the blocking window between fill and release.

#![warn(missing_docs)]

pub mod error;
pub mod fill;
pub mod hold;
pub mod size;
pub mod strategy;

pub use error::AllocError;
pub use hold::HoldController;
pub use size::{SizeError, parse_size};
pub use strategy::{Method, Request};
