//! Path index and result cache
//!
//! Path resolution is the dominant cost of every command: creating, renaming
//! or including anything needs remote ids. [`PathIndex`] keeps a
//! path-to-id map of scanned subtrees so a multi-command plan pays for each
//! path at most once. [`ResultCache`] keeps the objects produced by the last
//! command so the next one can chain on them.

#![warn(missing_docs)]

mod cache;
mod index;

pub use cache::ResultCache;
pub use index::{IndexEntry, IndexStats, PathIndex};
