//! Purpose: Library crate behind the `colmap` CLI and integration tests.
//! Exports: `core` (layout decoding, partitions, mapped columns, errors) and `api`.
//! Role: Read-only access to table directories; nothing here writes table files.
//! Invariants: Decoders return fresh values; callers re-open to observe new commits.
//! Invariants: Mapped column memory is never exposed mutably.
pub mod api;
pub mod core;
mod table_paths;
