//! The Bitcoin variable-length integer encoding, shared by `core::script`
//! and `core::tx`.
//!
//! `< 0xFD` direct; `0xFD` + 2 little-endian bytes; `0xFE` + 4; `0xFF` + 8.

use std::io::{self, Read};

use crate::{Error, Result};

/// Reads a varint from `r`, returning the decoded value.
pub fn read(r: &mut impl Read) -> Result<u64> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag)
        .map_err(|e| Error::MalformedEncoding(format!("varint tag: {e}")))?;
    match tag[0] {
        0xfd => Ok(read_int::<2>(r)? as u64),
        0xfe => Ok(read_int::<4>(r)? as u64),
        0xff => read_int::<8>(r),
        n => Ok(n as u64),
    }
}

fn read_int<const N: usize>(r: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf[..N])
        .map_err(|e| Error::MalformedEncoding(format!("varint body: {e}")))?;
    Ok(u64::from_le_bytes(buf))
}

/// Encodes `i` as a varint.
pub fn write(i: u64) -> Vec<u8> {
    if i < 0xfd {
        vec![i as u8]
    } else if i < 0x1_0000 {
        let mut out = vec![0xfd];
        out.extend_from_slice(&(i as u16).to_le_bytes());
        out
    } else if i < 0x1_0000_0000 {
        let mut out = vec![0xfe];
        out.extend_from_slice(&(i as u32).to_le_bytes());
        out
    } else {
        let mut out = vec![0xff];
        out.extend_from_slice(&i.to_le_bytes());
        out
    }
}

/// Reads `n` raw bytes from `r`, wrapping the I/O error.
pub fn read_bytes(r: &mut impl Read, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)
        .map_err(|e| Error::MalformedEncoding(format!("expected {n} bytes: {e}")))?;
    Ok(buf)
}

/// Reads a little-endian fixed-size integer from `r`.
pub fn read_u32_le(r: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)
        .map_err(|e| Error::MalformedEncoding(format!("u32: {e}")))?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads a little-endian `i32` from `r`.
pub fn read_i32_le(r: &mut impl Read) -> Result<i32> {
    Ok(read_u32_le(r)? as i32)
}

/// Reads a little-endian `u64` from `r`.
pub fn read_u64_le(r: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)
        .map_err(|e| Error::MalformedEncoding(format!("u64: {e}")))?;
    Ok(u64::from_le_bytes(buf))
}

/// Reads `n` bytes and reverses them, for the display-order <-> wire-order
/// flip on transaction and block hashes.
pub fn read_reversed(r: &mut impl Read, n: usize) -> Result<Vec<u8>> {
    let mut bytes = read_bytes(r, n)?;
    bytes.reverse();
    Ok(bytes)
}

/// A `std::io::Cursor`-backed reader over an owned byte buffer, used by
/// every `decode` entry point in this crate.
pub fn cursor(bytes: &[u8]) -> io::Cursor<&[u8]> {
    io::Cursor::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(i: u64) {
        let encoded = write(i);
        let decoded = read(&mut cursor(&encoded)).unwrap();
        assert_eq!(decoded, i);
    }

    #[test]
    fn round_trips_across_size_classes() {
        for i in [0, 1, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
            roundtrip(i);
        }
    }

    #[test]
    fn direct_encoding_is_a_single_byte() {
        assert_eq!(write(100), vec![100]);
    }

    #[test]
    fn fd_prefix_for_two_byte_values() {
        assert_eq!(write(0x1234), vec![0xfd, 0x34, 0x12]);
    }
}
