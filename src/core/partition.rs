//! Purpose: Resolve partition directories and per-partition row extents.
//! Exports: `LogicalPartition`, `partition_dir_name`, `partition_row_count`, `logical_partitions`.
//! Role: Bridges decoded metadata/transaction state to files on disk.
//! Invariants: Unpartitioned tables resolve to exactly one `default` partition.
//! Invariants: The last partition's rows come from `transient_row_count`.
//! Invariants: `row_offset` is the running sum of earlier partitions' rows.
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::core::error::{Error, ErrorKind};
use crate::core::format::{DEFAULT_PARTITION_DIR, TXN_UNSET};
use crate::core::meta::{PartitionBy, TableMetadata};
use crate::core::txn::TransactionState;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogicalPartition {
    pub id: usize,
    pub name: String,
    pub path: PathBuf,
    /// Partition floor in epoch microseconds; `None` for unpartitioned tables.
    pub timestamp: Option<i64>,
    pub row_count: usize,
    pub row_offset: usize,
}

pub fn partition_dir_name(
    partition_by: PartitionBy,
    timestamp_micros: i64,
    name_txn: i64,
) -> Result<String, Error> {
    if partition_by == PartitionBy::None {
        return Ok(DEFAULT_PARTITION_DIR.to_string());
    }
    let at = OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_micros) * 1_000)
        .map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message(format!("partition timestamp {timestamp_micros} is out of range"))
                .with_source(err)
        })?;
    let (year, month, day) = (at.year(), u8::from(at.month()), at.day());
    let mut name = match partition_by {
        PartitionBy::Day => format!("{year:04}-{month:02}-{day:02}"),
        PartitionBy::Month => format!("{year:04}-{month:02}"),
        _ => format!("{year:04}"),
    };
    if name_txn != TXN_UNSET {
        name.push_str(&format!(".{name_txn}"));
    }
    Ok(name)
}

/// Committed rows of partition `index`; may be negative on a corrupt log.
pub fn partition_row_count(
    partition_by: PartitionBy,
    txn: &TransactionState,
    index: usize,
) -> Result<i64, Error> {
    if partition_by == PartitionBy::None {
        return txn.row_count().ok_or_else(|| {
            Error::new(ErrorKind::Corrupt).with_message(format!(
                "transient_row_count {} plus fixed_row_count {} overflows",
                txn.transient_row_count, txn.fixed_row_count
            ))
        });
    }
    if index + 1 < txn.partitions.len() {
        Ok(txn.partitions[index].size)
    } else {
        Ok(txn.transient_row_count)
    }
}

pub fn logical_partitions(
    meta: &TableMetadata,
    txn: &TransactionState,
    table_root: &Path,
) -> Result<Vec<LogicalPartition>, Error> {
    if meta.partition_by == PartitionBy::None {
        let rows = checked_rows(partition_row_count(PartitionBy::None, txn, 0)?, 0)?;
        return Ok(vec![LogicalPartition {
            id: 0,
            name: DEFAULT_PARTITION_DIR.to_string(),
            path: table_root.join(DEFAULT_PARTITION_DIR),
            timestamp: None,
            row_count: rows,
            row_offset: 0,
        }]);
    }

    let mut partitions = Vec::with_capacity(txn.partitions.len());
    let mut row_offset = 0usize;
    for (index, entry) in txn.partitions.iter().enumerate() {
        let name = partition_dir_name(meta.partition_by, entry.timestamp, entry.name_txn)?;
        let row_count = checked_rows(partition_row_count(meta.partition_by, txn, index)?, index)?;
        partitions.push(LogicalPartition {
            id: entry.id,
            path: table_root.join(&name),
            name,
            timestamp: Some(entry.timestamp),
            row_count,
            row_offset,
        });
        row_offset = row_offset.checked_add(row_count).ok_or_else(|| {
            Error::new(ErrorKind::Corrupt)
                .with_message(format!("row offset overflows at partition {index}"))
        })?;
    }
    Ok(partitions)
}

fn checked_rows(rows: i64, index: usize) -> Result<usize, Error> {
    usize::try_from(rows).map_err(|_| {
        Error::new(ErrorKind::Corrupt)
            .with_message(format!("partition {index} has negative row count {rows}"))
    })
}
