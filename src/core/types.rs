//! Purpose: Static registry of column types keyed by their stable numeric id.
//! Exports: `ColumnType`, `Repr`, `NullSentinel`, `Mapping`, `resolve`, `from_name`.
//! Role: Drives storage sizes, null handling, and zero-copy eligibility.
//! Invariants: `REGISTRY[id].id == id` for every entry; ids never change meaning.
//! Invariants: Unknown ids resolve to `UNDEFINED` instead of failing.

/// In-memory representation of one stored value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Repr {
    Void,
    /// One byte, 0 or 1.
    Bool,
    I8,
    I16,
    /// UTF-16 code unit.
    U16,
    I32,
    I64,
    F32,
    F64,
    Variable,
}

/// Bit pattern (storage width, zero-extended) meaning "no value".
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NullSentinel {
    None,
    Bits(u64),
    NaN,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mapping {
    ZeroCopy,
    Unsupported,
}

#[derive(Debug, Eq, PartialEq)]
pub struct ColumnType {
    pub id: i32,
    pub name: &'static str,
    pub storage_size: usize,
    pub repr: Repr,
    pub null: NullSentinel,
    pub mapping: Mapping,
}

impl ColumnType {
    pub fn is_zero_copy(&self) -> bool {
        self.mapping == Mapping::ZeroCopy
    }

    const fn fixed(
        id: i32,
        name: &'static str,
        storage_size: usize,
        repr: Repr,
        null: NullSentinel,
    ) -> Self {
        Self {
            id,
            name,
            storage_size,
            repr,
            null,
            mapping: Mapping::ZeroCopy,
        }
    }

    const fn unmappable(id: i32, name: &'static str, repr: Repr) -> Self {
        Self {
            id,
            name,
            storage_size: 0,
            repr,
            null: NullSentinel::None,
            mapping: Mapping::Unsupported,
        }
    }
}

const LONG_NULL: NullSentinel = NullSentinel::Bits(0x8000_0000_0000_0000);

pub const UNDEFINED: ColumnType = ColumnType::unmappable(0, "UNDEFINED", Repr::Void);
pub const BOOLEAN: ColumnType = ColumnType::fixed(1, "BOOLEAN", 1, Repr::Bool, NullSentinel::None);
pub const BYTE: ColumnType = ColumnType::fixed(2, "BYTE", 1, Repr::I8, NullSentinel::None);
pub const SHORT: ColumnType = ColumnType::fixed(3, "SHORT", 2, Repr::I16, NullSentinel::None);
pub const CHAR: ColumnType = ColumnType::fixed(4, "CHAR", 2, Repr::U16, NullSentinel::None);
pub const INT: ColumnType =
    ColumnType::fixed(5, "INT", 4, Repr::I32, NullSentinel::Bits(0x8000_0000));
pub const LONG: ColumnType = ColumnType::fixed(6, "LONG", 8, Repr::I64, LONG_NULL);
pub const DATE: ColumnType = ColumnType::fixed(7, "DATE", 8, Repr::I64, LONG_NULL);
pub const TIMESTAMP: ColumnType = ColumnType::fixed(8, "TIMESTAMP", 8, Repr::I64, LONG_NULL);
pub const FLOAT: ColumnType = ColumnType::fixed(9, "FLOAT", 4, Repr::F32, NullSentinel::NaN);
pub const DOUBLE: ColumnType = ColumnType::fixed(10, "DOUBLE", 8, Repr::F64, NullSentinel::NaN);
pub const STRING: ColumnType = ColumnType::unmappable(11, "STRING", Repr::Variable);
pub const SYMBOL: ColumnType = ColumnType::unmappable(12, "SYMBOL", Repr::Variable);
pub const LONG256: ColumnType = ColumnType::unmappable(13, "LONG256", Repr::Variable);
pub const GEOBYTE: ColumnType =
    ColumnType::fixed(14, "GEOBYTE", 1, Repr::I8, NullSentinel::Bits(0xFF));
pub const GEOSHORT: ColumnType =
    ColumnType::fixed(15, "GEOSHORT", 2, Repr::I16, NullSentinel::Bits(0xFFFF));
pub const GEOINT: ColumnType =
    ColumnType::fixed(16, "GEOINT", 4, Repr::I32, NullSentinel::Bits(0xFFFF_FFFF));
pub const GEOLONG: ColumnType =
    ColumnType::fixed(17, "GEOLONG", 8, Repr::I64, NullSentinel::Bits(u64::MAX));
pub const BINARY: ColumnType = ColumnType::unmappable(18, "BINARY", Repr::Variable);
pub const PARAMETER: ColumnType = ColumnType::unmappable(19, "PARAMETER", Repr::Void);
pub const CURSOR: ColumnType = ColumnType::unmappable(20, "CURSOR", Repr::Void);
pub const VAR_ARG: ColumnType = ColumnType::unmappable(21, "VAR_ARG", Repr::Void);
pub const RECORD: ColumnType = ColumnType::unmappable(22, "RECORD", Repr::Void);
pub const GEOHASH: ColumnType = ColumnType::unmappable(23, "GEOHASH", Repr::Void);
pub const NULL: ColumnType = ColumnType::unmappable(24, "NULL", Repr::Void);

// Indexed by id; keep the order.
static REGISTRY: [ColumnType; 25] = [
    UNDEFINED, BOOLEAN, BYTE, SHORT, CHAR, INT, LONG, DATE, TIMESTAMP, FLOAT, DOUBLE, STRING,
    SYMBOL, LONG256, GEOBYTE, GEOSHORT, GEOINT, GEOLONG, BINARY, PARAMETER, CURSOR, VAR_ARG,
    RECORD, GEOHASH, NULL,
];

pub fn resolve(type_id: i32) -> &'static ColumnType {
    usize::try_from(type_id)
        .ok()
        .and_then(|index| REGISTRY.get(index))
        .unwrap_or(&REGISTRY[0])
}

/// Case-insensitive lookup by type name, e.g. `"double"` or `"TIMESTAMP"`.
pub fn from_name(name: &str) -> Option<&'static ColumnType> {
    let name = name.trim();
    REGISTRY
        .iter()
        .find(|column_type| column_type.name.eq_ignore_ascii_case(name))
}

pub fn all() -> &'static [ColumnType] {
    &REGISTRY
}
