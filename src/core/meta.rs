//! Purpose: Decode the `_meta` file into an immutable table schema snapshot.
//! Exports: `TableMetadata`, `ColumnMeta`, `PartitionBy`, `ReaderOptions`, `decode_metadata`.
//! Role: First step of every table open; feeds partition resolution and view building.
//! Invariants: Decoding is pure over bytes; a fresh value is returned on every call.
//! Invariants: Type blocks and name records are decoded in the same column order.
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use crate::core::binary::{self, layout_error};
use crate::core::error::{Error, ErrorKind, io_error_kind};
use crate::core::format::{
    META_COLUMN_BLOCK_LEN, META_COLUMN_BLOCKS, META_COLUMN_COUNT, META_COMMIT_LAG, META_FILE,
    META_MAX_UNCOMMITTED_ROWS, META_PARTITION_BY, META_SCHEMA_VERSION, META_TABLE_ID,
    META_TIMESTAMP_INDEX, meta_names_offset,
};
use crate::core::types::{self, ColumnType};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PartitionBy {
    Day,
    Month,
    Year,
    None,
}

impl PartitionBy {
    /// Unknown values fall back to `None`, matching how the engine treats them.
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => PartitionBy::Day,
            1 => PartitionBy::Month,
            2 => PartitionBy::Year,
            _ => PartitionBy::None,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            PartitionBy::Day => 0,
            PartitionBy::Month => 1,
            PartitionBy::Year => 2,
            PartitionBy::None => 3,
        }
    }

    pub fn is_partitioned(self) -> bool {
        self != PartitionBy::None
    }
}

impl fmt::Display for PartitionBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PartitionBy::Day => "DAY",
            PartitionBy::Month => "MONTH",
            PartitionBy::Year => "YEAR",
            PartitionBy::None => "NONE",
        };
        f.write_str(label)
    }
}

/// How column names in the name region are encoded.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NameEncoding {
    /// `2n` bytes of UTF-16 code units.
    #[default]
    Utf16,
    /// `2n` bytes with zero padding; zero bytes are dropped and the rest read as UTF-8.
    NullStrippedUtf8,
}

/// Which header values count as a designated timestamp index.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TimestampIndexRule {
    /// `0 <= idx < column_count`.
    #[default]
    NonNegative,
    /// `0 < idx < column_count`.
    Positive,
}

impl TimestampIndexRule {
    fn accepts(self, index: i32, column_count: i32) -> bool {
        let lower = match self {
            TimestampIndexRule::NonNegative => 0,
            TimestampIndexRule::Positive => 1,
        };
        index >= lower && index < column_count
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReaderOptions {
    pub name_encoding: NameEncoding,
    pub timestamp_index_rule: TimestampIndexRule,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_encoding(mut self, encoding: NameEncoding) -> Self {
        self.name_encoding = encoding;
        self
    }

    pub fn with_timestamp_index_rule(mut self, rule: TimestampIndexRule) -> Self {
        self.timestamp_index_rule = rule;
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub type_id: i32,
    pub flags: i64,
    pub index_block_size: i32,
}

impl ColumnMeta {
    pub fn column_type(&self) -> &'static ColumnType {
        types::resolve(self.type_id)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableMetadata {
    pub partition_by: PartitionBy,
    pub timestamp_index: Option<usize>,
    pub schema_version: i32,
    pub table_id: i32,
    pub max_uncommitted_rows: i32,
    pub commit_lag: i64,
    pub columns: Vec<ColumnMeta>,
}

impl TableMetadata {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn timestamp_column(&self) -> Option<&ColumnMeta> {
        self.timestamp_index.and_then(|index| self.columns.get(index))
    }

    /// Lays the schema out byte-for-byte as `_meta` does (UTF-16 names).
    pub fn encode(&self) -> Vec<u8> {
        let column_count = self.columns.len() as i32;
        let mut buf = vec![0u8; meta_names_offset(column_count) as usize];
        let timestamp_index = self.timestamp_index.map(|i| i as i32).unwrap_or(-1);

        put(&mut buf, META_COLUMN_COUNT, &column_count.to_ne_bytes());
        put(&mut buf, META_PARTITION_BY, &self.partition_by.raw().to_ne_bytes());
        put(&mut buf, META_TIMESTAMP_INDEX, &timestamp_index.to_ne_bytes());
        put(&mut buf, META_SCHEMA_VERSION, &self.schema_version.to_ne_bytes());
        put(&mut buf, META_TABLE_ID, &self.table_id.to_ne_bytes());
        put(&mut buf, META_MAX_UNCOMMITTED_ROWS, &self.max_uncommitted_rows.to_ne_bytes());
        put(&mut buf, META_COMMIT_LAG, &self.commit_lag.to_ne_bytes());

        for (i, column) in self.columns.iter().enumerate() {
            let block = META_COLUMN_BLOCKS + i as u64 * META_COLUMN_BLOCK_LEN;
            put(&mut buf, block, &column.type_id.to_ne_bytes());
            put(&mut buf, block + 4, &column.flags.to_ne_bytes());
            put(&mut buf, block + 12, &column.index_block_size.to_ne_bytes());
        }

        for column in &self.columns {
            let units: Vec<u16> = column.name.encode_utf16().collect();
            buf.extend_from_slice(&(units.len() as i32).to_ne_bytes());
            for unit in units {
                buf.extend_from_slice(&unit.to_ne_bytes());
            }
        }
        buf
    }
}

fn put(buf: &mut [u8], offset: u64, bytes: &[u8]) {
    let start = offset as usize;
    buf[start..start + bytes.len()].copy_from_slice(bytes);
}

pub fn read_metadata(table_root: &Path, options: &ReaderOptions) -> Result<TableMetadata, Error> {
    let path = table_root.join(META_FILE);
    let bytes = std::fs::read(&path).map_err(|err| {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::TableNotFound
        } else {
            io_error_kind(&err)
        };
        Error::new(kind)
            .with_message("failed to read table metadata")
            .with_path(&path)
            .with_source(err)
    })?;
    decode_metadata(&bytes, options).map_err(|err| err.with_path(&path))
}

pub fn decode_metadata(bytes: &[u8], options: &ReaderOptions) -> Result<TableMetadata, Error> {
    let mut cursor = Cursor::new(bytes);
    let len = bytes.len() as u64;

    let column_count = meta_i32(&mut cursor, META_COLUMN_COUNT, "column_count")?;
    if column_count < 0 {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("negative column count {column_count}"))
            .with_offset(META_COLUMN_COUNT));
    }
    let names_offset = meta_names_offset(column_count);
    if names_offset > len {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("{column_count} column blocks exceed file length {len}"))
            .with_offset(META_COLUMN_BLOCKS));
    }

    let partition_raw = meta_i32(&mut cursor, META_PARTITION_BY, "partition_by")?;
    let partition_by = PartitionBy::from_raw(partition_raw);
    if partition_by.raw() != partition_raw {
        tracing::warn!(partition_raw, "unknown partition_by value, treating as NONE");
    }
    let timestamp_raw = meta_i32(&mut cursor, META_TIMESTAMP_INDEX, "timestamp_index")?;
    let timestamp_index = options
        .timestamp_index_rule
        .accepts(timestamp_raw, column_count)
        .then_some(timestamp_raw as usize);
    let schema_version = meta_i32(&mut cursor, META_SCHEMA_VERSION, "schema_version")?;
    let table_id = meta_i32(&mut cursor, META_TABLE_ID, "table_id")?;
    let max_uncommitted_rows =
        meta_i32(&mut cursor, META_MAX_UNCOMMITTED_ROWS, "max_uncommitted_rows")?;
    let commit_lag = binary::read_i64(&mut cursor, META_COMMIT_LAG)
        .map_err(|err| layout_error(err, META_FILE, "commit_lag", META_COMMIT_LAG))?;

    let mut columns = Vec::with_capacity(column_count as usize);
    let mut name_offset = names_offset;
    for i in 0..column_count as u64 {
        let block = META_COLUMN_BLOCKS + i * META_COLUMN_BLOCK_LEN;
        let type_id = meta_i32(&mut cursor, block, "column type")?;
        let flags = binary::read_i64(&mut cursor, block + 4)
            .map_err(|err| layout_error(err, META_FILE, "column flags", block + 4))?;
        let index_block_size = meta_i32(&mut cursor, block + 12, "index block size")?;

        let name_len = meta_i32(&mut cursor, name_offset, "column name length")?;
        if name_len < 0 {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message(format!("negative name length {name_len} for column {i}"))
                .with_offset(name_offset));
        }
        let name_bytes = name_len as u64 * 2;
        if name_offset + 4 + name_bytes > len {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message(format!("name of column {i} runs past end of file"))
                .with_offset(name_offset));
        }
        let raw = binary::read_bytes(&mut cursor, name_offset + 4, name_bytes as usize)
            .map_err(|err| layout_error(err, META_FILE, "column name", name_offset + 4))?;
        let name = decode_name(&raw, options.name_encoding)
            .map_err(|err| err.with_offset(name_offset + 4))?;
        name_offset += 4 + name_bytes;

        columns.push(ColumnMeta {
            name,
            type_id,
            flags,
            index_block_size,
        });
    }

    tracing::debug!(
        columns = columns.len(),
        %partition_by,
        timestamp_index = ?timestamp_index,
        "decoded table metadata"
    );

    Ok(TableMetadata {
        partition_by,
        timestamp_index,
        schema_version,
        table_id,
        max_uncommitted_rows,
        commit_lag,
        columns,
    })
}

fn meta_i32(cursor: &mut Cursor<&[u8]>, offset: u64, field: &str) -> Result<i32, Error> {
    binary::read_i32(cursor, offset).map_err(|err| layout_error(err, META_FILE, field, offset))
}

fn decode_name(raw: &[u8], encoding: NameEncoding) -> Result<String, Error> {
    match encoding {
        NameEncoding::Utf16 => {
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).map_err(|err| {
                Error::new(ErrorKind::Corrupt)
                    .with_message("column name is not valid UTF-16")
                    .with_source(err)
            })
        }
        NameEncoding::NullStrippedUtf8 => {
            let stripped: Vec<u8> = raw.iter().copied().filter(|byte| *byte != 0).collect();
            String::from_utf8(stripped).map_err(|err| {
                Error::new(ErrorKind::Corrupt)
                    .with_message("column name is not valid UTF-8")
                    .with_source(err)
            })
        }
    }
}
