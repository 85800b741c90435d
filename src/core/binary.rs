// Native-endian fixed-width reads at absolute offsets.
use std::io::{self, Read, Seek, SeekFrom};

use crate::core::error::{Error, ErrorKind};

pub fn read_i32<R: Read + Seek>(reader: &mut R, offset: u64) -> io::Result<i32> {
    Ok(i32::from_ne_bytes(read_array(reader, offset)?))
}

pub fn read_i64<R: Read + Seek>(reader: &mut R, offset: u64) -> io::Result<i64> {
    Ok(i64::from_ne_bytes(read_array(reader, offset)?))
}

/// Reads exactly `len` bytes at `offset`; a short file is an error, never zero-filled.
pub fn read_bytes<R: Read + Seek>(reader: &mut R, offset: u64, len: usize) -> io::Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_array<R: Read + Seek, const N: usize>(reader: &mut R, offset: u64) -> io::Result<[u8; N]> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Wraps a failed layout read as `Corrupt` (truncation) or `Io`, keeping the offset.
pub(crate) fn layout_error(err: io::Error, file: &str, field: &str, offset: u64) -> Error {
    let kind = if err.kind() == io::ErrorKind::UnexpectedEof {
        ErrorKind::Corrupt
    } else {
        ErrorKind::Io
    };
    Error::new(kind)
        .with_message(format!("failed to read {field} from {file}"))
        .with_offset(offset)
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::{layout_error, read_bytes, read_i32, read_i64};
    use crate::core::error::ErrorKind;
    use std::io::{Cursor, Write};

    #[test]
    fn reads_native_endian_at_offset() {
        let mut buf = vec![0xAAu8; 4];
        buf.extend_from_slice(&(-7i32).to_ne_bytes());
        buf.extend_from_slice(&0x0102_0304_0506_0708i64.to_ne_bytes());

        let mut cursor = Cursor::new(buf.as_slice());
        assert_eq!(read_i32(&mut cursor, 4).unwrap(), -7);
        assert_eq!(read_i64(&mut cursor, 8).unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(read_bytes(&mut cursor, 0, 2).unwrap(), vec![0xAA, 0xAA]);
    }

    #[test]
    fn short_read_is_an_error() {
        let buf = [1u8, 2, 3, 4, 5, 6];
        let mut cursor = Cursor::new(&buf[..]);
        let err = read_i64(&mut cursor, 0).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);

        let err = read_i32(&mut cursor, 4).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn reads_from_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blob");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(&42i32.to_ne_bytes()).expect("write");
        drop(file);

        let mut file = std::fs::File::open(&path).expect("open");
        assert_eq!(read_i32(&mut file, 0).unwrap(), 42);
        assert!(read_i32(&mut file, 2).is_err());
    }

    #[test]
    fn truncation_maps_to_corrupt() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err = layout_error(eof, "_meta", "column_count", 0);
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(err.offset(), Some(0));

        let other = std::io::Error::other("boom");
        assert_eq!(layout_error(other, "_txn", "txn_id", 0).kind(), ErrorKind::Io);
    }
}
