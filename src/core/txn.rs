//! Purpose: Decode the `_txn` commit record and its partition table.
//! Exports: `TransactionState`, `PartitionEntry`, `decode_transaction`, `read_transaction`.
//! Role: Supplies committed row counts and partition extents to the resolver.
//! Invariants: `row_count()` is `transient_row_count + fixed_row_count`, or `None` on overflow.
//! Invariants: The all-ones generation pattern decodes to `TXN_UNSET`.
use std::io::Cursor;
use std::path::Path;

use crate::core::binary::{self, layout_error};
use crate::core::error::{Error, ErrorKind, io_error_kind};
use crate::core::format::{
    TXN_CHECK, TXN_DATA_VERSION, TXN_FILE, TXN_FIXED_ROW_COUNT, TXN_ID, TXN_MAX_TIMESTAMP,
    TXN_MIN_TIMESTAMP, TXN_PARTITION_ENTRY_LEN, TXN_PARTITION_FIELDS, TXN_PARTITION_TABLE_VERSION,
    TXN_STRUCT_VERSION, TXN_SYMBOL_COUNT, TXN_SYMBOL_ENTRY_LEN, TXN_SYMBOLS,
    TXN_TRANSIENT_ROW_COUNT, TXN_UNSET, TXN_UNSET_RAW, partition_table_offset,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PartitionEntry {
    pub id: usize,
    /// Partition floor in epoch microseconds.
    pub timestamp: i64,
    pub size: i64,
    pub name_txn: i64,
    pub data_txn: i64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TransactionState {
    pub txn_id: i64,
    pub transient_row_count: i64,
    pub fixed_row_count: i64,
    pub min_timestamp: i64,
    pub max_timestamp: i64,
    pub struct_version: i64,
    pub data_version: i64,
    pub partition_table_version: i64,
    pub txn_check: i64,
    pub symbol_count: i32,
    pub partitions: Vec<PartitionEntry>,
}

impl TransactionState {
    /// Committed rows; `None` when the two counts overflow.
    pub fn row_count(&self) -> Option<i64> {
        self.transient_row_count.checked_add(self.fixed_row_count)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Writes the committed layout; symbol slots are zero-filled.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for value in [
            self.txn_id,
            self.transient_row_count,
            self.fixed_row_count,
            self.min_timestamp,
            self.max_timestamp,
            self.struct_version,
            self.data_version,
            self.partition_table_version,
            self.txn_check,
        ] {
            buf.extend_from_slice(&value.to_ne_bytes());
        }
        buf.extend_from_slice(&self.symbol_count.to_ne_bytes());
        buf.resize(partition_table_offset(self.symbol_count) as usize, 0);

        let table_len = self.partitions.len() as u64 * TXN_PARTITION_ENTRY_LEN;
        buf.extend_from_slice(&(table_len as i32).to_ne_bytes());
        for entry in &self.partitions {
            for value in [
                entry.timestamp,
                entry.size,
                encode_generation(entry.name_txn),
                encode_generation(entry.data_txn),
            ] {
                buf.extend_from_slice(&value.to_ne_bytes());
            }
        }
        buf
    }
}

fn encode_generation(value: i64) -> i64 {
    if value == TXN_UNSET {
        TXN_UNSET_RAW as i64
    } else {
        value
    }
}

fn decode_generation(raw: i64) -> i64 {
    if raw as u64 == TXN_UNSET_RAW {
        TXN_UNSET
    } else {
        raw
    }
}

pub fn read_transaction(table_root: &Path) -> Result<TransactionState, Error> {
    let path = table_root.join(TXN_FILE);
    let bytes = std::fs::read(&path).map_err(|err| {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::Corrupt
        } else {
            io_error_kind(&err)
        };
        Error::new(kind)
            .with_message("failed to read transaction file")
            .with_path(&path)
            .with_source(err)
    })?;
    decode_transaction(&bytes).map_err(|err| err.with_path(&path))
}

pub fn decode_transaction(bytes: &[u8]) -> Result<TransactionState, Error> {
    let mut cursor = Cursor::new(bytes);
    let len = bytes.len() as u64;

    let symbol_count = binary::read_i32(&mut cursor, TXN_SYMBOL_COUNT)
        .map_err(|err| layout_error(err, TXN_FILE, "symbol_count", TXN_SYMBOL_COUNT))?;
    if symbol_count < 0 {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("negative symbol count {symbol_count}"))
            .with_offset(TXN_SYMBOL_COUNT));
    }
    let table_offset = partition_table_offset(symbol_count);
    if table_offset > len {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!(
                "{symbol_count} symbol entries of {TXN_SYMBOL_ENTRY_LEN} bytes from {TXN_SYMBOLS} exceed file length {len}"
            ))
            .with_offset(TXN_SYMBOLS));
    }

    let table_len = binary::read_i32(&mut cursor, table_offset)
        .map_err(|err| layout_error(err, TXN_FILE, "partition table length", table_offset))?;
    if table_len < 0 {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("negative partition table length {table_len}"))
            .with_offset(table_offset));
    }
    let partition_count = (i64::from(table_len) / 8 / TXN_PARTITION_FIELDS) as u64;
    let entries_end = table_offset + 4 + partition_count * TXN_PARTITION_ENTRY_LEN;
    if entries_end > len {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!(
                "{partition_count} partition entries exceed file length {len}"
            ))
            .with_offset(table_offset));
    }

    let mut partitions = Vec::with_capacity(partition_count as usize);
    for id in 0..partition_count {
        let base = table_offset + 4 + id * TXN_PARTITION_ENTRY_LEN;
        partitions.push(PartitionEntry {
            id: id as usize,
            timestamp: txn_i64(&mut cursor, base, "partition timestamp")?,
            size: txn_i64(&mut cursor, base + 8, "partition size")?,
            name_txn: decode_generation(txn_i64(&mut cursor, base + 16, "partition name_txn")?),
            data_txn: decode_generation(txn_i64(&mut cursor, base + 24, "partition data_txn")?),
        });
    }

    let state = TransactionState {
        txn_id: txn_i64(&mut cursor, TXN_ID, "txn_id")?,
        transient_row_count: txn_i64(&mut cursor, TXN_TRANSIENT_ROW_COUNT, "transient_row_count")?,
        fixed_row_count: txn_i64(&mut cursor, TXN_FIXED_ROW_COUNT, "fixed_row_count")?,
        min_timestamp: txn_i64(&mut cursor, TXN_MIN_TIMESTAMP, "min_timestamp")?,
        max_timestamp: txn_i64(&mut cursor, TXN_MAX_TIMESTAMP, "max_timestamp")?,
        struct_version: txn_i64(&mut cursor, TXN_STRUCT_VERSION, "struct_version")?,
        data_version: txn_i64(&mut cursor, TXN_DATA_VERSION, "data_version")?,
        partition_table_version: txn_i64(
            &mut cursor,
            TXN_PARTITION_TABLE_VERSION,
            "partition_table_version",
        )?,
        txn_check: txn_i64(&mut cursor, TXN_CHECK, "txn_check")?,
        symbol_count,
        partitions,
    };

    tracing::debug!(
        txn = state.txn_id,
        rows = ?state.row_count(),
        partitions = state.partitions.len(),
        "decoded transaction state"
    );
    Ok(state)
}

fn txn_i64(cursor: &mut Cursor<&[u8]>, offset: u64, field: &str) -> Result<i64, Error> {
    binary::read_i64(cursor, offset).map_err(|err| layout_error(err, TXN_FILE, field, offset))
}
