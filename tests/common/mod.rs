// Fixture builders that lay out table directories byte-for-byte.
#![allow(dead_code)]
use std::path::{Path, PathBuf};

use colmap::api::{
    ColumnMeta, PartitionBy, PartitionEntry, TableMetadata, TransactionState,
};

pub const HOUR_MICROS: i64 = 3_600_000_000;
/// 2021-09-29T00:00:00Z
pub const SEP_29: i64 = 1_632_873_600_000_000;
/// 2021-10-01T00:00:00Z
pub const OCT_01: i64 = 1_633_046_400_000_000;
/// 2021-10-02T00:00:00Z
pub const OCT_02: i64 = 1_633_132_800_000_000;

pub const INT: i32 = 5;
pub const LONG: i32 = 6;
pub const TIMESTAMP: i32 = 8;
pub const DOUBLE: i32 = 10;
pub const BOOLEAN: i32 = 1;
pub const STRING: i32 = 11;

pub trait NeBytes: Copy {
    fn ne_bytes(self) -> Vec<u8>;
}

macro_rules! ne_bytes {
    ($($ty:ty),*) => {
        $(impl NeBytes for $ty {
            fn ne_bytes(self) -> Vec<u8> {
                self.to_ne_bytes().to_vec()
            }
        })*
    };
}

ne_bytes!(u8, i16, i32, i64, f32, f64);

pub fn column(name: &str, type_id: i32) -> ColumnMeta {
    ColumnMeta {
        name: name.to_string(),
        type_id,
        flags: 0,
        index_block_size: 0,
    }
}

pub fn metadata(
    partition_by: PartitionBy,
    timestamp_index: Option<usize>,
    columns: Vec<ColumnMeta>,
) -> TableMetadata {
    TableMetadata {
        partition_by,
        timestamp_index,
        schema_version: 417,
        table_id: 1,
        max_uncommitted_rows: 500_000,
        commit_lag: 0,
        columns,
    }
}

/// Transaction state for partitions given as `(timestamp, size, name_txn)`.
/// The last partition's size becomes the transient row count.
pub fn transaction(partitions: &[(i64, i64, i64)]) -> TransactionState {
    let entries: Vec<PartitionEntry> = partitions
        .iter()
        .enumerate()
        .map(|(id, (timestamp, size, name_txn))| PartitionEntry {
            id,
            timestamp: *timestamp,
            size: *size,
            name_txn: *name_txn,
            data_txn: -1,
        })
        .collect();
    let transient = entries.last().map_or(0, |entry| entry.size);
    let fixed = entries.iter().rev().skip(1).map(|entry| entry.size).sum();
    TransactionState {
        txn_id: 3,
        transient_row_count: transient,
        fixed_row_count: fixed,
        min_timestamp: entries.first().map_or(0, |entry| entry.timestamp),
        max_timestamp: entries.last().map_or(0, |entry| entry.timestamp),
        struct_version: 1,
        data_version: 0,
        partition_table_version: 1,
        txn_check: 3,
        symbol_count: 0,
        partitions: entries,
    }
}

pub fn write_table_files(root: &Path, meta: &TableMetadata, txn: &TransactionState) {
    std::fs::create_dir_all(root).expect("table dir");
    std::fs::write(root.join("_meta"), meta.encode()).expect("write _meta");
    write_txn(root, txn);
}

pub fn write_txn(root: &Path, txn: &TransactionState) {
    std::fs::write(root.join("_txn"), txn.encode()).expect("write _txn");
}

pub fn write_column<T: NeBytes>(partition_dir: &Path, name: &str, values: &[T]) -> PathBuf {
    std::fs::create_dir_all(partition_dir).expect("partition dir");
    let path = partition_dir.join(format!("{name}.d"));
    let bytes: Vec<u8> = values.iter().flat_map(|value| value.ne_bytes()).collect();
    std::fs::write(&path, bytes).expect("write column");
    path
}

/// `weather`: DAY-partitioned `int INT, double DOUBLE, ts TIMESTAMP` with 7 rows
/// over 2021-09-29 (4), 2021-10-01 (2) and 2021-10-02 (1). The last partition's
/// files hold one extra uncommitted row.
pub fn day_table(data_root: &Path) -> PathBuf {
    let root = data_root.join("weather");
    let meta = metadata(
        PartitionBy::Day,
        Some(2),
        vec![column("int", INT), column("double", DOUBLE), column("ts", TIMESTAMP)],
    );
    let txn = transaction(&[(SEP_29, 4, -1), (OCT_01, 2, -1), (OCT_02, 1, -1)]);
    write_table_files(&root, &meta, &txn);

    let layout: [(&str, i64, &[i32]); 3] = [
        ("2021-09-29", SEP_29, &[1, 2, 3, 4]),
        ("2021-10-01", OCT_01, &[5, 6]),
        ("2021-10-02", OCT_02, &[7, 99]),
    ];
    for (dir, day, ints) in layout {
        let partition = root.join(dir);
        let doubles: Vec<f64> = ints.iter().map(|value| f64::from(*value) + 0.5).collect();
        let stamps: Vec<i64> = (0..ints.len() as i64).map(|hour| day + hour * HOUR_MICROS).collect();
        write_column(&partition, "int", ints);
        write_column(&partition, "double", &doubles);
        write_column(&partition, "ts", &stamps);
    }
    root
}

pub fn day_table_ints() -> Vec<i32> {
    (1..=7).collect()
}

pub fn day_table_timestamps() -> Vec<i64> {
    let mut stamps = Vec::new();
    for (day, rows) in [(SEP_29, 4), (OCT_01, 2), (OCT_02, 1)] {
        stamps.extend((0..rows).map(|hour| day + hour * HOUR_MICROS));
    }
    stamps
}

/// `plain`: unpartitioned, no designated timestamp; `id LONG, flag BOOLEAN, label STRING`
/// with 5 rows in `default/`.
pub fn none_table(data_root: &Path) -> PathBuf {
    let root = data_root.join("plain");
    let meta = metadata(
        PartitionBy::None,
        None,
        vec![column("id", LONG), column("flag", BOOLEAN), column("label", STRING)],
    );
    let mut txn = transaction(&[]);
    txn.transient_row_count = 5;
    write_table_files(&root, &meta, &txn);

    let partition = root.join("default");
    write_column(&partition, "id", &[10i64, 20, i64::MIN, 40, 50]);
    write_column(&partition, "flag", &[1u8, 0, 1, 1, 0]);
    root
}
