//! Purpose: One decoded, immutable snapshot of a table directory.
//! Exports: `Table`.
//! Role: Ties metadata, transaction state and resolved partitions to a root path.
//! Invariants: A `Table` never changes after open; `refresh` returns a new snapshot.
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};
use crate::core::meta::{ReaderOptions, TableMetadata, read_metadata};
use crate::core::partition::{LogicalPartition, logical_partitions};
use crate::core::txn::{TransactionState, read_transaction};
use crate::core::view::{ColumnarTableView, ViewRequest, build_views};

#[derive(Clone, Debug)]
pub struct Table {
    root: PathBuf,
    options: ReaderOptions,
    metadata: TableMetadata,
    transaction: TransactionState,
    partitions: Vec<LogicalPartition>,
}

impl Table {
    pub fn open(root: impl AsRef<Path>, options: ReaderOptions) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::new(ErrorKind::TableNotFound)
                .with_message("table directory does not exist")
                .with_path(&root));
        }
        let metadata = read_metadata(&root, &options)?;
        let transaction = read_transaction(&root)?;
        let partitions =
            logical_partitions(&metadata, &transaction, &root).map_err(|err| err.with_path(&root))?;
        tracing::debug!(
            root = %root.display(),
            rows = ?transaction.row_count(),
            partitions = partitions.len(),
            "opened table"
        );
        Ok(Self {
            root,
            options,
            metadata,
            transaction,
            partitions,
        })
    }

    /// Decodes the directory again with the same options.
    pub fn refresh(&self) -> Result<Self, Error> {
        Self::open(&self.root, self.options)
    }

    pub fn name(&self) -> Option<&str> {
        self.root.file_name().and_then(|name| name.to_str())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.metadata
    }

    pub fn transaction(&self) -> &TransactionState {
        &self.transaction
    }

    pub fn partitions(&self) -> &[LogicalPartition] {
        &self.partitions
    }

    /// Rows the views will expose: the sum of resolved partition counts.
    /// This differs from `TransactionState::row_count` when `fixed_row_count`
    /// disagrees with the stored partition sizes, which `check_table` reports.
    pub fn row_count(&self) -> usize {
        self.partitions.iter().map(|partition| partition.row_count).sum()
    }

    pub fn views(&self, request: &ViewRequest) -> Result<Vec<ColumnarTableView>, Error> {
        build_views(self, request)
    }
}
