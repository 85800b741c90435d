//! Purpose: Centralize the on-disk layout contract of a table directory.
//! Exports: file names, header offsets, strides, and sentinel constants.
//! Role: Single source for decoders, encoders, and path resolution.
//! Invariants: Offsets are a contract with the storage engine; never derive them.
//! Invariants: All integers are native-endian for the reading platform.

pub const META_FILE: &str = "_meta";
pub const TXN_FILE: &str = "_txn";
pub const COLUMN_FILE_SUFFIX: &str = ".d";
pub const DEFAULT_PARTITION_DIR: &str = "default";

// `_meta` header (i32 fields unless noted).
pub const META_COLUMN_COUNT: u64 = 0;
pub const META_PARTITION_BY: u64 = 4;
pub const META_TIMESTAMP_INDEX: u64 = 8;
pub const META_SCHEMA_VERSION: u64 = 12;
pub const META_TABLE_ID: u64 = 16;
pub const META_MAX_UNCOMMITTED_ROWS: u64 = 20;
/// i64.
pub const META_COMMIT_LAG: u64 = 24;
pub const META_COLUMN_BLOCKS: u64 = 128;
pub const META_COLUMN_BLOCK_LEN: u64 = 16;

// `_txn` header (i64 fields unless noted).
pub const TXN_ID: u64 = 0;
pub const TXN_TRANSIENT_ROW_COUNT: u64 = 8;
pub const TXN_FIXED_ROW_COUNT: u64 = 16;
pub const TXN_MIN_TIMESTAMP: u64 = 24;
pub const TXN_MAX_TIMESTAMP: u64 = 32;
pub const TXN_STRUCT_VERSION: u64 = 40;
pub const TXN_DATA_VERSION: u64 = 48;
pub const TXN_PARTITION_TABLE_VERSION: u64 = 56;
pub const TXN_CHECK: u64 = 64;
/// i32.
pub const TXN_SYMBOL_COUNT: u64 = 72;
pub const TXN_SYMBOLS: u64 = 76;
pub const TXN_SYMBOL_ENTRY_LEN: u64 = 8;
pub const TXN_PARTITION_ENTRY_LEN: u64 = 32;
pub const TXN_PARTITION_FIELDS: i64 = 4;

/// Raw `name_txn`/`data_txn` pattern meaning "no generation suffix".
pub const TXN_UNSET_RAW: u64 = 0xFFFF_FFFF_FFFF_FFFF;
pub const TXN_UNSET: i64 = -1;

/// Offset of the partition table length field for a given symbol count.
pub fn partition_table_offset(symbol_count: i32) -> u64 {
    TXN_SYMBOLS + symbol_count as u64 * TXN_SYMBOL_ENTRY_LEN
}

/// Offset of the first column name record for a given column count.
pub fn meta_names_offset(column_count: i32) -> u64 {
    META_COLUMN_BLOCKS + column_count as u64 * META_COLUMN_BLOCK_LEN
}
