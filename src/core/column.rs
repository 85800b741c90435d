// Read-only typed buffers over memory-mapped column files.
use std::fs::File;
use std::marker::PhantomData;
use std::path::Path;

use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::core::error::{Error, ErrorKind, io_error_kind};
use crate::core::types::{ColumnType, NullSentinel, Repr};

mod sealed {
    pub trait Sealed {}
}

/// Plain value types a column file can be reinterpreted as.
///
/// Every bit pattern of `Self` must be a valid value; only the primitive
/// integer and float types implement this.
pub trait NativeType: Copy + std::fmt::Debug + sealed::Sealed + 'static {
    const REPR: Repr;

    /// Storage bits, zero-extended to 64.
    fn to_bits(self) -> u64;

    fn is_nan(self) -> bool {
        false
    }

    fn is_null(self, sentinel: NullSentinel) -> bool {
        match sentinel {
            NullSentinel::None => false,
            NullSentinel::Bits(bits) => self.to_bits() == bits,
            NullSentinel::NaN => self.is_nan(),
        }
    }
}

macro_rules! native_int {
    ($ty:ty, $unsigned:ty, $repr:expr) => {
        impl sealed::Sealed for $ty {}
        impl NativeType for $ty {
            const REPR: Repr = $repr;

            fn to_bits(self) -> u64 {
                u64::from(self as $unsigned)
            }
        }
    };
}

native_int!(u8, u8, Repr::Bool);
native_int!(i8, u8, Repr::I8);
native_int!(i16, u16, Repr::I16);
native_int!(u16, u16, Repr::U16);
native_int!(i32, u32, Repr::I32);
native_int!(i64, u64, Repr::I64);

impl sealed::Sealed for f32 {}
impl NativeType for f32 {
    const REPR: Repr = Repr::F32;

    fn to_bits(self) -> u64 {
        u64::from(f32::to_bits(self))
    }

    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl sealed::Sealed for f64 {}
impl NativeType for f64 {
    const REPR: Repr = Repr::F64;

    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

/// Owner of the bytes behind a buffer. Zero-length columns need no mapping.
#[derive(Debug)]
pub(crate) enum Region {
    Mapped(Mmap),
    Empty,
}

impl Region {
    fn bytes(&self) -> &[u8] {
        match self {
            Region::Mapped(mmap) => &mmap[..],
            Region::Empty => &[],
        }
    }
}

/// Typed, read-only values of one mapped column.
///
/// Mapped bytes are shared with the file, so no accessor hands out `&mut`:
///
/// ```compile_fail
/// fn overwrite(buf: &colmap::api::ColumnBuffer<i32>) {
///     buf.as_slice()[0] = 1;
/// }
/// ```
///
/// ```compile_fail
/// fn overwrite(data: &colmap::api::ColumnData) {
///     data.as_bytes()[0] = 0xFF;
/// }
/// ```
#[derive(Debug)]
pub struct ColumnBuffer<T: NativeType> {
    region: Region,
    len: usize,
    column_type: &'static ColumnType,
    _marker: PhantomData<T>,
}

impl<T: NativeType> ColumnBuffer<T> {
    fn new(region: Region, len: usize, column_type: &'static ColumnType) -> Result<Self, Error> {
        let bytes = region.bytes();
        let needed = len * size_of::<T>();
        if bytes.len() < needed {
            return Err(Error::new(ErrorKind::Internal).with_message(format!(
                "region of {} bytes cannot hold {len} values of {}",
                bytes.len(),
                column_type.name
            )));
        }
        if len > 0 && bytes.as_ptr().align_offset(align_of::<T>()) != 0 {
            return Err(Error::new(ErrorKind::Internal)
                .with_message(format!("mapping is not aligned for {}", column_type.name)));
        }
        Ok(Self {
            region,
            len,
            column_type,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column_type(&self) -> &'static ColumnType {
        self.column_type
    }

    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            return &[];
        }
        // SAFETY: length and alignment were checked in `new`; `T` accepts any bit pattern
        // and the region is never written through while borrowed.
        unsafe { std::slice::from_raw_parts(self.region.bytes().as_ptr().cast::<T>(), self.len) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.region.bytes()[..self.len * size_of::<T>()]
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).copied()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.as_slice().iter().copied()
    }

    pub fn is_null(&self, index: usize) -> Option<bool> {
        self.get(index).map(|value| value.is_null(self.column_type.null))
    }

    pub fn null_count(&self) -> usize {
        let sentinel = self.column_type.null;
        if sentinel == NullSentinel::None {
            return 0;
        }
        self.iter().filter(|value| value.is_null(sentinel)).count()
    }
}

/// One scalar read out of a column, with null sentinels applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Char(u16),
    Float(f64),
}

#[derive(Debug)]
pub enum ColumnData {
    Bool(ColumnBuffer<u8>),
    I8(ColumnBuffer<i8>),
    I16(ColumnBuffer<i16>),
    U16(ColumnBuffer<u16>),
    I32(ColumnBuffer<i32>),
    I64(ColumnBuffer<i64>),
    F32(ColumnBuffer<f32>),
    F64(ColumnBuffer<f64>),
}

macro_rules! each_buffer {
    ($data:expr, $buf:ident => $body:expr) => {
        match $data {
            ColumnData::Bool($buf) => $body,
            ColumnData::I8($buf) => $body,
            ColumnData::I16($buf) => $body,
            ColumnData::U16($buf) => $body,
            ColumnData::I32($buf) => $body,
            ColumnData::I64($buf) => $body,
            ColumnData::F32($buf) => $body,
            ColumnData::F64($buf) => $body,
        }
    };
}

impl ColumnData {
    pub(crate) fn from_region(
        region: Region,
        len: usize,
        column_type: &'static ColumnType,
    ) -> Result<Self, Error> {
        let data = match column_type.repr {
            Repr::Bool => ColumnData::Bool(ColumnBuffer::new(region, len, column_type)?),
            Repr::I8 => ColumnData::I8(ColumnBuffer::new(region, len, column_type)?),
            Repr::I16 => ColumnData::I16(ColumnBuffer::new(region, len, column_type)?),
            Repr::U16 => ColumnData::U16(ColumnBuffer::new(region, len, column_type)?),
            Repr::I32 => ColumnData::I32(ColumnBuffer::new(region, len, column_type)?),
            Repr::I64 => ColumnData::I64(ColumnBuffer::new(region, len, column_type)?),
            Repr::F32 => ColumnData::F32(ColumnBuffer::new(region, len, column_type)?),
            Repr::F64 => ColumnData::F64(ColumnBuffer::new(region, len, column_type)?),
            Repr::Void | Repr::Variable => return Err(unsupported(column_type)),
        };
        Ok(data)
    }

    pub(crate) fn empty(column_type: &'static ColumnType) -> Result<Self, Error> {
        Self::from_region(Region::Empty, 0, column_type)
    }

    pub fn len(&self) -> usize {
        each_buffer!(self, buf => buf.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> &'static ColumnType {
        each_buffer!(self, buf => buf.column_type())
    }

    pub fn as_bytes(&self) -> &[u8] {
        each_buffer!(self, buf => buf.as_bytes())
    }

    pub fn null_count(&self) -> usize {
        each_buffer!(self, buf => buf.null_count())
    }

    pub fn scalar(&self, index: usize) -> Option<Scalar> {
        if self.is_null_at(index)? {
            return Some(Scalar::Null);
        }
        let value = match self {
            ColumnData::Bool(buf) => Scalar::Bool(buf.get(index)? != 0),
            ColumnData::I8(buf) => Scalar::Int(i64::from(buf.get(index)?)),
            ColumnData::I16(buf) => Scalar::Int(i64::from(buf.get(index)?)),
            ColumnData::U16(buf) => Scalar::Char(buf.get(index)?),
            ColumnData::I32(buf) => Scalar::Int(i64::from(buf.get(index)?)),
            ColumnData::I64(buf) => Scalar::Int(buf.get(index)?),
            ColumnData::F32(buf) => Scalar::Float(f64::from(buf.get(index)?)),
            ColumnData::F64(buf) => Scalar::Float(buf.get(index)?),
        };
        Some(value)
    }

    fn is_null_at(&self, index: usize) -> Option<bool> {
        each_buffer!(self, buf => buf.is_null(index))
    }
}

fn unsupported(column_type: &ColumnType) -> Error {
    Error::new(ErrorKind::UnsupportedType).with_message(format!(
        "type {} ({}) cannot be mapped as fixed-width values",
        column_type.name, column_type.id
    ))
}

/// Maps the first `rows` values of a column file read-only.
pub fn map_column_file(
    path: &Path,
    column_type: &'static ColumnType,
    rows: usize,
) -> Result<ColumnData, Error> {
    if !column_type.is_zero_copy() {
        return Err(unsupported(column_type).with_path(path));
    }
    let byte_len = rows.checked_mul(column_type.storage_size).ok_or_else(|| {
        Error::new(ErrorKind::Corrupt)
            .with_message(format!("{rows} rows overflow the addressable size"))
            .with_path(path)
    })?;

    let file = File::open(path).map_err(|err| {
        let kind = if err.kind() == std::io::ErrorKind::NotFound {
            ErrorKind::ColumnFileMissing
        } else {
            io_error_kind(&err)
        };
        Error::new(kind)
            .with_message("failed to open column file")
            .with_path(path)
            .with_source(err)
    })?;
    let file_len = file
        .metadata()
        .map(|meta| meta.len())
        .map_err(|err| Error::new(io_error_kind(&err)).with_path(path).with_source(err))?;
    if file_len < byte_len as u64 {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!(
                "column file holds {file_len} bytes, {rows} rows of {} need {byte_len}",
                column_type.name
            ))
            .with_path(path));
    }

    let region = if byte_len == 0 {
        Region::Empty
    } else {
        let mmap = unsafe {
            MmapOptions::new()
                .len(byte_len)
                .map(&file)
                .map_err(|err| Error::new(io_error_kind(&err)).with_path(path).with_source(err))?
        };
        Region::Mapped(mmap)
    };
    tracing::debug!(path = %path.display(), rows, bytes = byte_len, "mapped column file");
    ColumnData::from_region(region, rows, column_type).map_err(|err| err.with_path(path))
}

/// Copies same-typed parts back to back into one anonymous read-only mapping.
pub fn concat_columns(
    column_type: &'static ColumnType,
    parts: &[ColumnData],
) -> Result<ColumnData, Error> {
    let rows: usize = parts.iter().map(ColumnData::len).sum();
    let byte_len = rows * column_type.storage_size;
    if byte_len == 0 {
        return ColumnData::empty(column_type);
    }

    let mut staging = MmapMut::map_anon(byte_len)
        .map_err(|err| Error::new(io_error_kind(&err)).with_source(err))?;
    let mut at = 0;
    for part in parts {
        if part.column_type().id != column_type.id {
            return Err(Error::new(ErrorKind::Internal).with_message(format!(
                "cannot concatenate {} into {}",
                part.column_type().name,
                column_type.name
            )));
        }
        let bytes = part.as_bytes();
        staging[at..at + bytes.len()].copy_from_slice(bytes);
        at += bytes.len();
    }
    let mmap = staging
        .make_read_only()
        .map_err(|err| Error::new(io_error_kind(&err)).with_source(err))?;
    ColumnData::from_region(Region::Mapped(mmap), rows, column_type)
}
