// Cross-checks between metadata, the transaction log and files on disk.
// Checks only read directory entries and file lengths; nothing is mapped.
use std::path::PathBuf;

use crate::core::error::{Error, ErrorKind};
use crate::core::format::COLUMN_FILE_SUFFIX;
use crate::core::table::Table;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableIssue {
    pub code: &'static str,
    pub message: String,
    pub path: Option<PathBuf>,
    pub column: Option<String>,
}

impl TableIssue {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            column: None,
        }
    }

    fn at(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

pub fn check_table(table: &Table) -> Vec<TableIssue> {
    let mut issues = Vec::new();
    check_partition_table(table, &mut issues);
    check_files(table, &mut issues);
    for issue in &issues {
        tracing::warn!(code = issue.code, message = %issue.message, "table check failed");
    }
    issues
}

/// First failed check as a `Corrupt` error.
pub fn validate_table_state(table: &Table) -> Result<(), Error> {
    match check_table(table).into_iter().next() {
        None => Ok(()),
        Some(issue) => {
            let mut err = Error::new(ErrorKind::Corrupt)
                .with_message(issue.message)
                .with_path(issue.path.unwrap_or_else(|| table.root().to_path_buf()));
            if let Some(column) = issue.column {
                err = err.with_column(column);
            }
            Err(err)
        }
    }
}

fn check_partition_table(table: &Table, issues: &mut Vec<TableIssue>) {
    if !table.metadata().partition_by.is_partitioned() {
        return;
    }
    let txn = table.transaction();
    for pair in txn.partitions.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            issues.push(TableIssue::new(
                "partition_order",
                format!(
                    "partition {} timestamp {} does not follow {}",
                    pair[1].id, pair[1].timestamp, pair[0].timestamp
                ),
            ));
        }
    }

    if let Some((_, earlier)) = txn.partitions.split_last() {
        let sealed: i128 = earlier.iter().map(|entry| i128::from(entry.size)).sum();
        if sealed != i128::from(txn.fixed_row_count) {
            issues.push(TableIssue::new(
                "fixed_row_count",
                format!(
                    "fixed_row_count {} differs from sealed partition sizes {sealed}",
                    txn.fixed_row_count
                ),
            ));
        }
    }
}

fn check_files(table: &Table, issues: &mut Vec<TableIssue>) {
    for partition in table.partitions() {
        if partition.row_count == 0 {
            continue;
        }
        if !partition.path.is_dir() {
            issues.push(
                TableIssue::new(
                    "partition_dir_missing",
                    format!("partition directory {} is missing", partition.name),
                )
                .at(&partition.path),
            );
            continue;
        }
        for column in &table.metadata().columns {
            let column_type = column.column_type();
            if !column_type.is_zero_copy() {
                continue;
            }
            let path = partition
                .path
                .join(format!("{}{COLUMN_FILE_SUFFIX}", column.name));
            let Some(needed) = partition.row_count.checked_mul(column_type.storage_size) else {
                issues.push(
                    TableIssue::new(
                        "row_count_overflow",
                        format!(
                            "{} rows of {} bytes overflow the address space",
                            partition.row_count, column_type.storage_size
                        ),
                    )
                    .at(&path)
                    .column(&column.name),
                );
                continue;
            };
            let needed = needed as u64;
            match std::fs::metadata(&path) {
                Err(_) => issues.push(
                    TableIssue::new("column_file_missing", "column file is missing")
                        .at(&path)
                        .column(&column.name),
                ),
                Ok(meta) if meta.len() < needed => issues.push(
                    TableIssue::new(
                        "column_file_short",
                        format!("column file holds {} bytes, {needed} needed", meta.len()),
                    )
                    .at(&path)
                    .column(&column.name),
                ),
                Ok(_) => {}
            }
        }
    }
}
