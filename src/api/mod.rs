//! Purpose: Define the stable public Rust API boundary for colmap.
//! Exports: Client, table snapshot, view request, and validation types.
//! Role: Public, additive-only surface over the core decoders and view builder.
//! Invariants: Every operation here is read-only with respect to table files.
//! Invariants: Core layout constants stay reachable only through `crate::core`.

mod client;
mod validation;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::column::{ColumnBuffer, ColumnData, NativeType, Scalar};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::meta::{
    ColumnMeta, NameEncoding, PartitionBy, ReaderOptions, TableMetadata, TimestampIndexRule,
};
pub use crate::core::partition::LogicalPartition;
pub use crate::core::table::Table;
pub use crate::core::txn::{PartitionEntry, TransactionState};
pub use crate::core::types::ColumnType;
pub use crate::core::view::{
    ColumnRequest, ColumnarTableView, RejectPolicy, RejectedColumn, RowIndex, ViewMode, ViewRequest,
};
pub use client::{ApiResult, LocalClient, TableRef};
pub use validation::{ValidationIssue, ValidationReport, ValidationStatus};
