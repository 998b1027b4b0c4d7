use alloc::vec::Vec;

use crate::error::{StreamError, StreamResult};
use crate::record::RecordReader;

// -----------------------------------------------------------------------------
// Varint helpers

#[inline]
const fn zigzag_encode(n: i128) -> u128 {
    ((n << 1) ^ (n >> 127)) as u128
}

#[inline]
const fn zigzag_decode(n: u128) -> i128 {
    ((n >> 1) as i128) ^ -((n & 1) as i128)
}

#[inline]
fn to_len(len: u64) -> StreamResult<usize> {
    usize::try_from(len).map_err(|_| StreamError::LengthOverflow(len))
}

// -----------------------------------------------------------------------------
// ValueWriter

/// Append-only writer of typed primitives.
///
/// Writing into memory cannot fail, so every method here is infallible.
/// Failures only appear on the [`RecordWriter`](crate::RecordWriter) layer.
#[derive(Debug, Default, Clone)]
pub struct ValueWriter {
    buf: Vec<u8>,
}

impl ValueWriter {
    #[inline]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    #[inline]
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    /// LEB128 unsigned varint.
    #[inline]
    pub fn write_var_u64(&mut self, v: u64) {
        self.write_var_u128(v as u128);
    }

    /// LEB128 unsigned varint.
    pub fn write_var_u128(&mut self, mut v: u128) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    /// Zigzag signed varint.
    #[inline]
    pub fn write_var_i64(&mut self, v: i64) {
        self.write_var_u128(zigzag_encode(v as i128));
    }

    /// Zigzag signed varint.
    #[inline]
    pub fn write_var_i128(&mut self, v: i128) {
        self.write_var_u128(zigzag_encode(v));
    }

    #[inline]
    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    #[inline]
    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    #[inline]
    pub fn write_char(&mut self, v: char) {
        self.write_var_u64(v as u64);
    }

    /// Appends bytes without a length prefix.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends a length-prefixed byte string.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_var_u64(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    /// Appends a length-prefixed UTF-8 string.
    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

// -----------------------------------------------------------------------------
// ValueReader

/// Sequential reader of typed primitives over a borrowed buffer.
///
/// Byte strings and strings are returned as borrows of the input.
#[derive(Debug, Clone)]
pub struct ValueReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ValueReader<'a> {
    #[inline]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Number of bytes not read yet.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Reads `len` bytes without a length prefix.
    pub fn read_raw(&mut self, len: usize) -> StreamResult<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(StreamError::UnexpectedEof {
                needed: len,
                remaining,
            });
        }
        let bytes = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Returns every byte not read yet and moves to the end.
    #[inline]
    pub fn read_rest(&mut self) -> &'a [u8] {
        let bytes = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        bytes
    }

    #[inline]
    pub fn read_u8(&mut self) -> StreamResult<u8> {
        Ok(self.read_raw(1)?[0])
    }

    pub fn read_bool(&mut self) -> StreamResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(StreamError::InvalidBool(other)),
        }
    }

    pub fn read_var_u128(&mut self) -> StreamResult<u128> {
        let mut result = 0_u128;
        let mut shift = 0_u32;
        loop {
            let byte = self.read_u8()?;
            let low = (byte & 0x7F) as u128;
            if shift >= 128 || (shift > 0 && low >> (128 - shift) != 0) {
                return Err(StreamError::VarIntOverflow { bits: 128 });
            }
            result |= low << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    #[inline]
    pub fn read_var_u64(&mut self) -> StreamResult<u64> {
        u64::try_from(self.read_var_u128()?).map_err(|_| StreamError::VarIntOverflow { bits: 64 })
    }

    #[inline]
    pub fn read_var_i128(&mut self) -> StreamResult<i128> {
        Ok(zigzag_decode(self.read_var_u128()?))
    }

    #[inline]
    pub fn read_var_i64(&mut self) -> StreamResult<i64> {
        i64::try_from(self.read_var_i128()?).map_err(|_| StreamError::VarIntOverflow { bits: 64 })
    }

    pub fn read_f32(&mut self) -> StreamResult<f32> {
        let mut bits = [0_u8; 4];
        bits.copy_from_slice(self.read_raw(4)?);
        Ok(f32::from_bits(u32::from_le_bytes(bits)))
    }

    pub fn read_f64(&mut self) -> StreamResult<f64> {
        let mut bits = [0_u8; 8];
        bits.copy_from_slice(self.read_raw(8)?);
        Ok(f64::from_bits(u64::from_le_bytes(bits)))
    }

    pub fn read_char(&mut self) -> StreamResult<char> {
        let code = self.read_var_u64()?;
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or(StreamError::InvalidChar(code))
    }

    /// Reads a length-prefixed byte string.
    pub fn read_bytes(&mut self) -> StreamResult<&'a [u8]> {
        let len = to_len(self.read_var_u64()?)?;
        self.read_raw(len)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> StreamResult<&'a str> {
        core::str::from_utf8(self.read_bytes()?).map_err(|_| StreamError::InvalidUtf8)
    }

    /// Reads a record header and hands out a reader over its body.
    pub fn read_record(&mut self) -> StreamResult<RecordReader<'a>> {
        let version = self.read_var_u64()?;
        let version = u32::try_from(version).map_err(|_| StreamError::VarIntOverflow { bits: 32 })?;
        let declared = self.read_var_u64()?;
        let remaining = self.remaining();
        let len = to_len(declared)?;
        if len > remaining {
            return Err(StreamError::TruncatedRecord {
                declared,
                remaining,
            });
        }
        let body = self.read_raw(len)?;
        Ok(RecordReader::new(version, body))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{ValueReader, ValueWriter};
    use crate::StreamError;

    #[test]
    fn varint_layout() {
        let mut w = ValueWriter::new();
        w.write_var_u64(0);
        w.write_var_u64(127);
        w.write_var_u64(128);
        w.write_var_u64(300);
        assert_eq!(w.as_bytes(), &[0x00, 0x7F, 0x80, 0x01, 0xAC, 0x02]);
    }

    #[test]
    fn zigzag_layout() {
        let mut w = ValueWriter::new();
        w.write_var_i64(0);
        w.write_var_i64(-1);
        w.write_var_i64(1);
        w.write_var_i64(-2);
        assert_eq!(w.as_bytes(), &[0, 1, 2, 3]);
    }

    #[test]
    fn extremes() {
        let mut w = ValueWriter::new();
        w.write_var_u128(u128::MAX);
        w.write_var_i128(i128::MIN);
        w.write_var_i64(i64::MAX);
        w.write_f64(-0.5);
        w.write_char('\u{1F980}');
        let bytes = w.into_bytes();

        let mut r = ValueReader::new(&bytes);
        assert_eq!(r.read_var_u128().unwrap(), u128::MAX);
        assert_eq!(r.read_var_i128().unwrap(), i128::MIN);
        assert_eq!(r.read_var_i64().unwrap(), i64::MAX);
        assert_eq!(r.read_f64().unwrap(), -0.5);
        assert_eq!(r.read_char().unwrap(), '\u{1F980}');
        assert!(r.is_empty());
    }

    #[test]
    fn varint_overflow() {
        let bytes = [0xFF; 20];
        let mut r = ValueReader::new(&bytes);
        assert_eq!(
            r.read_var_u128(),
            Err(StreamError::VarIntOverflow { bits: 128 })
        );

        let mut w = ValueWriter::new();
        w.write_var_u128(u64::MAX as u128 + 1);
        let bytes = w.into_bytes();
        let mut r = ValueReader::new(&bytes);
        assert_eq!(r.read_var_u64(), Err(StreamError::VarIntOverflow { bits: 64 }));
    }

    #[test]
    fn invalid_input() {
        let mut r = ValueReader::new(&[2]);
        assert_eq!(r.read_bool(), Err(StreamError::InvalidBool(2)));

        let mut w = ValueWriter::new();
        w.write_var_u64(0xD800);
        w.write_bytes(&[0xC3, 0x28]);
        let bytes = w.into_bytes();
        let mut r = ValueReader::new(&bytes);
        assert_eq!(r.read_char(), Err(StreamError::InvalidChar(0xD800)));
        assert_eq!(r.read_str(), Err(StreamError::InvalidUtf8));

        let mut r = ValueReader::new(&[5, 1, 2]);
        assert_eq!(
            r.read_bytes(),
            Err(StreamError::UnexpectedEof {
                needed: 5,
                remaining: 2
            })
        );
    }

    #[test]
    fn truncated_record() {
        let mut r = ValueReader::new(&[0, 9, 1]);
        assert!(matches!(
            r.read_record(),
            Err(StreamError::TruncatedRecord {
                declared: 9,
                remaining: 1
            })
        ));
    }
}
