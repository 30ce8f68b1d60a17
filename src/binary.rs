//! Leaf-level encoding and decoding of the Avro binary wire format.
//!
//! Everything schema-shaped lives above this layer; these routines only know
//! about zig-zag varints, little-endian floats, length prefixes and raw bytes.

use crate::error::{AvroResult, Error};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use integer_encoding::VarIntWriter;
use std::io::{Read, Write};

// A zig-zag varint long occupies at most 10 bytes on the wire.
pub(crate) const MAX_VARINT_BYTES: usize = 10;

///////////////////////////////////////////////////////////////////////////////
/// Encoding
///////////////////////////////////////////////////////////////////////////////

pub(crate) fn encode_null<W: Write>(_writer: &mut W) -> AvroResult<()> {
    Ok(())
}

pub(crate) fn encode_bool<W: Write>(value: bool, writer: &mut W) -> AvroResult<()> {
    writer
        .write_all(&[value as u8])
        .map_err(Error::EncodeFailed)
}

pub(crate) fn encode_int<W: Write>(value: i32, writer: &mut W) -> AvroResult<()> {
    writer
        .write_varint(value)
        .map_err(Error::EncodeFailed)
        .map(|_| ())
}

pub(crate) fn encode_long<W: Write>(value: i64, writer: &mut W) -> AvroResult<()> {
    writer
        .write_varint(value)
        .map_err(Error::EncodeFailed)
        .map(|_| ())
}

pub(crate) fn encode_float<W: Write>(value: f32, writer: &mut W) -> AvroResult<()> {
    writer
        .write_f32::<LittleEndian>(value)
        .map_err(Error::EncodeFailed)
}

pub(crate) fn encode_double<W: Write>(value: f64, writer: &mut W) -> AvroResult<()> {
    writer
        .write_f64::<LittleEndian>(value)
        .map_err(Error::EncodeFailed)
}

pub(crate) fn encode_raw_bytes<W: Write>(value: &[u8], writer: &mut W) -> AvroResult<()> {
    writer.write_all(value).map_err(Error::EncodeFailed)
}

pub(crate) fn encode_bytes<W: Write>(value: &[u8], writer: &mut W) -> AvroResult<()> {
    encode_long(value.len() as i64, writer)?;
    encode_raw_bytes(value, writer)
}

pub(crate) fn encode_str<W: Write>(value: &str, writer: &mut W) -> AvroResult<()> {
    encode_bytes(value.as_bytes(), writer)
}

///////////////////////////////////////////////////////////////////////////////
/// Decoding
///////////////////////////////////////////////////////////////////////////////

#[inline]
fn read_byte<R: Read>(reader: &mut R) -> AvroResult<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf).map_err(Error::DecodeFailed)?;
    Ok(buf[0])
}

pub(crate) fn decode_bool<R: Read>(reader: &mut R) -> AvroResult<bool> {
    match read_byte(reader)? {
        0x00 => Ok(false),
        0x01 => Ok(true),
        other => Err(Error::InvalidBoolean(other)),
    }
}

/// Decodes a zig-zag varint long. The varint reads are hand-rolled rather
/// than delegated so that a stream with more than 10 continuation bytes is
/// rejected instead of silently wrapping.
pub(crate) fn decode_long<R: Read>(reader: &mut R) -> AvroResult<i64> {
    let mut accum: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if shift as usize >= MAX_VARINT_BYTES * 7 {
            return Err(Error::VarintOverflow);
        }
        let byte = read_byte(reader)?;
        accum |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(((accum >> 1) as i64) ^ -((accum & 1) as i64))
}

pub(crate) fn decode_int<R: Read>(reader: &mut R) -> AvroResult<i32> {
    let value = decode_long(reader)?;
    if value < i64::from(i32::MIN) || value > i64::from(i32::MAX) {
        return Err(Error::IntOutOfRange(value));
    }
    Ok(value as i32)
}

pub(crate) fn decode_float<R: Read>(reader: &mut R) -> AvroResult<f32> {
    reader
        .read_f32::<LittleEndian>()
        .map_err(Error::DecodeFailed)
}

pub(crate) fn decode_double<R: Read>(reader: &mut R) -> AvroResult<f64> {
    reader
        .read_f64::<LittleEndian>()
        .map_err(Error::DecodeFailed)
}

pub(crate) fn decode_bytes<R: Read>(reader: &mut R) -> AvroResult<Vec<u8>> {
    let len = decode_long(reader)?;
    if len < 0 {
        return Err(Error::NegativeLength(len));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).map_err(Error::DecodeFailed)?;
    Ok(buf)
}

pub(crate) fn decode_string<R: Read>(reader: &mut R) -> AvroResult<String> {
    let buf = decode_bytes(reader)?;
    String::from_utf8(buf).map_err(|_| Error::InvalidUtf8)
}

pub(crate) fn decode_fixed<R: Read>(size: usize, reader: &mut R) -> AvroResult<Vec<u8>> {
    let mut buf = vec![0u8; size];
    reader.read_exact(&mut buf).map_err(Error::DecodeFailed)?;
    Ok(buf)
}

///////////////////////////////////////////////////////////////////////////////
/// Skipping
///////////////////////////////////////////////////////////////////////////////

/// Consumes a varint without materializing its value.
pub(crate) fn skip_varint<R: Read>(reader: &mut R) -> AvroResult<()> {
    for _ in 0..MAX_VARINT_BYTES {
        if read_byte(reader)? & 0x80 == 0 {
            return Ok(());
        }
    }
    Err(Error::VarintOverflow)
}

/// Consumes exactly `n` bytes. Sources are not required to be seekable, so
/// this drains through a scratch buffer.
pub(crate) fn skip_exact<R: Read>(reader: &mut R, n: u64) -> AvroResult<()> {
    let mut scratch = [0u8; 512];
    let mut remaining = n;
    while remaining > 0 {
        let chunk = remaining.min(scratch.len() as u64) as usize;
        reader
            .read_exact(&mut scratch[..chunk])
            .map_err(Error::DecodeFailed)?;
        remaining -= chunk as u64;
    }
    Ok(())
}

/// Consumes a length-prefixed bytes or string value.
pub(crate) fn skip_bytes_value<R: Read>(reader: &mut R) -> AvroResult<()> {
    let len = decode_long(reader)?;
    if len < 0 {
        return Err(Error::NegativeLength(len));
    }
    skip_exact(reader, len as u64)
}

///////////////////////////////////////////////////////////////////////////////
/// Public leaf-value adapters
///////////////////////////////////////////////////////////////////////////////

/// A thin adapter over a byte sink exposing the Avro wire primitives.
///
/// Intended for callers that need to frame raw values without a full schema,
/// such as an object-container-file implementation layered on this crate.
/// ```
/// use avrojet::BinaryEncoder;
///
/// let mut encoder = BinaryEncoder::new(vec![]);
/// encoder.write_int(150).unwrap();
/// assert_eq!(encoder.into_inner(), &[0xac, 0x02]);
/// ```
pub struct BinaryEncoder<W> {
    out: W,
}

impl<W: Write> BinaryEncoder<W> {
    /// Wraps the given sink.
    pub fn new(out: W) -> Self {
        BinaryEncoder { out }
    }

    /// Writes an avro null (zero bytes).
    pub fn write_null(&mut self) -> AvroResult<()> {
        encode_null(&mut self.out)
    }

    /// Writes a boolean as a single `0x00`/`0x01` byte.
    pub fn write_boolean(&mut self, value: bool) -> AvroResult<()> {
        encode_bool(value, &mut self.out)
    }

    /// Writes an int as a zig-zag varint.
    pub fn write_int(&mut self, value: i32) -> AvroResult<()> {
        encode_int(value, &mut self.out)
    }

    /// Writes a long as a zig-zag varint.
    pub fn write_long(&mut self, value: i64) -> AvroResult<()> {
        encode_long(value, &mut self.out)
    }

    /// Writes a float as 4 little-endian bytes.
    pub fn write_float(&mut self, value: f32) -> AvroResult<()> {
        encode_float(value, &mut self.out)
    }

    /// Writes a double as 8 little-endian bytes.
    pub fn write_double(&mut self, value: f64) -> AvroResult<()> {
        encode_double(value, &mut self.out)
    }

    /// Writes length-prefixed bytes.
    pub fn write_bytes(&mut self, value: &[u8]) -> AvroResult<()> {
        encode_bytes(value, &mut self.out)
    }

    /// Writes a length-prefixed utf-8 string.
    pub fn write_str(&mut self, value: &str) -> AvroResult<()> {
        encode_str(value, &mut self.out)
    }

    /// Writes raw bytes with no prefix, as a fixed value is encoded.
    pub fn write_fixed(&mut self, value: &[u8]) -> AvroResult<()> {
        encode_raw_bytes(value, &mut self.out)
    }

    /// Consumes self and yields the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// A thin adapter over a byte source exposing the Avro wire primitives.
pub struct BinaryDecoder<R> {
    source: R,
}

impl<R: Read> BinaryDecoder<R> {
    /// Wraps the given source.
    pub fn new(source: R) -> Self {
        BinaryDecoder { source }
    }

    /// Reads an avro null (zero bytes).
    pub fn read_null(&mut self) -> AvroResult<()> {
        Ok(())
    }

    /// Reads a boolean byte.
    pub fn read_boolean(&mut self) -> AvroResult<bool> {
        decode_bool(&mut self.source)
    }

    /// Reads a zig-zag varint and checks the 32-bit range.
    pub fn read_int(&mut self) -> AvroResult<i32> {
        decode_int(&mut self.source)
    }

    /// Reads a zig-zag varint long.
    pub fn read_long(&mut self) -> AvroResult<i64> {
        decode_long(&mut self.source)
    }

    /// Reads a 4-byte little-endian float.
    pub fn read_float(&mut self) -> AvroResult<f32> {
        decode_float(&mut self.source)
    }

    /// Reads an 8-byte little-endian double.
    pub fn read_double(&mut self) -> AvroResult<f64> {
        decode_double(&mut self.source)
    }

    /// Reads length-prefixed bytes.
    pub fn read_bytes(&mut self) -> AvroResult<Vec<u8>> {
        decode_bytes(&mut self.source)
    }

    /// Reads a length-prefixed utf-8 string.
    pub fn read_str(&mut self) -> AvroResult<String> {
        decode_string(&mut self.source)
    }

    /// Reads exactly `size` raw bytes, as a fixed value is encoded.
    pub fn read_fixed(&mut self, size: usize) -> AvroResult<Vec<u8>> {
        decode_fixed(size, &mut self.source)
    }

    /// Discards exactly `n` bytes.
    pub fn skip(&mut self, n: u64) -> AvroResult<()> {
        skip_exact(&mut self.source, n)
    }

    /// Consumes self and yields the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn long_bytes(value: i64) -> Vec<u8> {
        let mut buf = vec![];
        encode_long(value, &mut buf).unwrap();
        buf
    }

    #[test]
    fn zig_zag_known_vectors() {
        assert_eq!(long_bytes(0), &[0x00]);
        assert_eq!(long_bytes(-1), &[0x01]);
        assert_eq!(long_bytes(1), &[0x02]);
        assert_eq!(long_bytes(-2), &[0x03]);
        assert_eq!(long_bytes(150), &[0xac, 0x02]);
    }

    #[test]
    fn long_round_trips_at_bounds() {
        for value in &[
            0i64,
            1,
            -1,
            i64::from(i32::MAX),
            i64::from(i32::MIN),
            i64::MAX,
            i64::MIN,
        ] {
            let buf = long_bytes(*value);
            assert!(buf.len() <= MAX_VARINT_BYTES);
            assert_eq!(decode_long(&mut buf.as_slice()).unwrap(), *value);
        }
    }

    #[test]
    fn int_round_trips_at_bounds() {
        for value in &[0i32, 150, -150, i32::MAX, i32::MIN] {
            let mut buf = vec![];
            encode_int(*value, &mut buf).unwrap();
            assert_eq!(decode_int(&mut buf.as_slice()).unwrap(), *value);
        }
    }

    #[test]
    fn int_decode_rejects_out_of_range() {
        let buf = long_bytes(i64::from(i32::MAX) + 1);
        let err = decode_int(&mut buf.as_slice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn varint_longer_than_ten_bytes_fails() {
        let buf = [0xffu8; 11];
        let err = decode_long(&mut buf.as_ref()).unwrap_err();
        assert!(matches!(err, Error::VarintOverflow));

        let err = skip_varint(&mut [0xffu8; 11].as_ref()).unwrap_err();
        assert!(matches!(err, Error::VarintOverflow));
    }

    #[test]
    fn boolean_rejects_other_bytes() {
        assert!(!decode_bool(&mut [0x00u8].as_ref()).unwrap());
        assert!(decode_bool(&mut [0x01u8].as_ref()).unwrap());
        let err = decode_bool(&mut [0x02u8].as_ref()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn bytes_rejects_negative_length() {
        // zig-zag -6 as a length prefix
        let buf = [0x0bu8];
        let err = decode_bytes(&mut buf.as_ref()).unwrap_err();
        assert!(matches!(err, Error::NegativeLength(-6)));
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let mut buf = vec![];
        encode_bytes(&[0xff, 0xfe], &mut buf).unwrap();
        let err = decode_string(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8));
    }

    #[test]
    fn string_with_embedded_nul_round_trips() {
        let mut buf = vec![];
        encode_str("a\0b", &mut buf).unwrap();
        assert_eq!(decode_string(&mut buf.as_slice()).unwrap(), "a\0b");
    }

    #[test]
    fn short_read_is_corrupt_data() {
        let mut buf = vec![];
        encode_long(20, &mut buf).unwrap();
        buf.extend_from_slice(b"short");
        let err = decode_bytes(&mut buf.as_slice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }

    #[test]
    fn skip_helpers_leave_source_positioned() {
        let mut buf = vec![];
        encode_long(1234567, &mut buf).unwrap();
        encode_str("payload", &mut buf).unwrap();
        encode_bool(true, &mut buf).unwrap();

        let mut source = buf.as_slice();
        skip_varint(&mut source).unwrap();
        skip_bytes_value(&mut source).unwrap();
        assert!(decode_bool(&mut source).unwrap());
    }

    #[test]
    fn encoder_decoder_adapters() {
        let mut encoder = BinaryEncoder::new(vec![]);
        encoder.write_null().unwrap();
        encoder.write_boolean(true).unwrap();
        encoder.write_int(150).unwrap();
        encoder.write_str("foo").unwrap();
        encoder.write_fixed(&[1, 2, 3]).unwrap();

        let buf = encoder.into_inner();
        let mut decoder = BinaryDecoder::new(buf.as_slice());
        decoder.read_null().unwrap();
        assert!(decoder.read_boolean().unwrap());
        assert_eq!(decoder.read_int().unwrap(), 150);
        assert_eq!(decoder.read_str().unwrap(), "foo");
        assert_eq!(decoder.read_fixed(3).unwrap(), vec![1, 2, 3]);
    }
}
