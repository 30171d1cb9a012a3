//! Bit-level primitives shared by the codecs: LSB-first bit packing,
//! ULEB128 varints and zig-zag integers.

use bytes::Bytes;

use crate::{ParquetError, Result};

/// Maximum bytes of a ULEB128-encoded `u64`
const MAX_VLQ_BYTE_LEN: usize = 10;

/// Returns `ceil(value / divisor)`
#[inline]
pub fn ceil(value: usize, divisor: usize) -> usize {
    value.div_ceil(divisor)
}

/// Number of bits needed to represent `value`; 0 for 0
#[inline]
pub fn num_required_bits(value: u64) -> u8 {
    (64 - value.leading_zeros()) as u8
}

/// Bit width needed to index a table of `len` entries: `ceil(log2(len))`
#[inline]
pub fn index_bit_width(len: usize) -> u8 {
    if len <= 1 {
        0
    } else {
        num_required_bits((len - 1) as u64)
    }
}

#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[inline]
fn mask(num_bits: usize) -> u64 {
    if num_bits >= 64 {
        u64::MAX
    } else {
        (1u64 << num_bits) - 1
    }
}

/// Packs `values` LSB-first at `bit_width` bits each. The output is padded
/// to a whole byte.
pub fn pack_values(values: &[u64], bit_width: u8) -> Vec<u8> {
    let mut writer = BitWriter::with_capacity(ceil(values.len() * bit_width as usize, 8));
    for &value in values {
        writer.put_value(value, bit_width as usize);
    }
    writer.consume()
}

/// Unpacks `out.len()` values of `bit_width` bits from `reader`
pub fn unpack_values(reader: &mut BitReader, bit_width: u8, out: &mut [u64]) -> Result<()> {
    for slot in out.iter_mut() {
        *slot = reader.get_value(bit_width as usize)?;
    }
    Ok(())
}

/// Appends bit-packed values, varints and aligned integers to a byte buffer
#[derive(Debug, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    // Bits not yet flushed to `buffer`, LSB first
    buffered_values: u64,
    // Number of valid bits in `buffered_values`. Always < 64.
    bit_offset: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            buffered_values: 0,
            bit_offset: 0,
        }
    }

    /// Number of bytes written so far, counting a partially filled byte
    #[inline]
    pub fn bytes_written(&self) -> usize {
        self.buffer.len() + ceil(self.bit_offset, 8)
    }

    /// Appends the low `num_bits` bits of `value`
    #[inline]
    pub fn put_value(&mut self, value: u64, num_bits: usize) {
        debug_assert!(num_bits <= 64);
        if num_bits == 0 {
            return;
        }
        let value = value & mask(num_bits);
        self.buffered_values |= value << self.bit_offset;
        self.bit_offset += num_bits;

        if self.bit_offset >= 64 {
            self.buffer
                .extend_from_slice(&self.buffered_values.to_le_bytes());
            self.bit_offset -= 64;
            self.buffered_values = if self.bit_offset == 0 {
                0
            } else {
                value >> (num_bits - self.bit_offset)
            };
        }
    }

    /// Writes any buffered bits, zero-padding the last byte
    #[inline]
    pub fn flush(&mut self) {
        let num_bytes = ceil(self.bit_offset, 8);
        self.buffer
            .extend_from_slice(&self.buffered_values.to_le_bytes()[..num_bytes]);
        self.buffered_values = 0;
        self.bit_offset = 0;
    }

    /// Writes the low `num_bytes` bytes of `value` little-endian, starting at
    /// the next byte boundary
    pub fn put_aligned(&mut self, value: u64, num_bytes: usize) {
        debug_assert!(num_bytes <= 8);
        self.flush();
        self.buffer
            .extend_from_slice(&value.to_le_bytes()[..num_bytes]);
    }

    /// Overwrites a byte previously reserved with [`BitWriter::skip`]
    pub fn put_aligned_offset(&mut self, value: u8, offset: usize) {
        self.buffer[offset] = value;
    }

    /// Reserves `num_bytes` zeroed bytes and returns their starting offset
    pub fn skip(&mut self, num_bytes: usize) -> usize {
        self.flush();
        let offset = self.buffer.len();
        self.buffer.resize(offset + num_bytes, 0);
        offset
    }

    /// Writes a ULEB128 varint at the next byte boundary
    pub fn put_vlq_int(&mut self, mut value: u64) {
        self.flush();
        while value >= 0x80 {
            self.buffer.push((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.buffer.push(value as u8);
    }

    /// Writes a zig-zag encoded varint
    pub fn put_zigzag_vlq_int(&mut self, value: i64) {
        self.put_vlq_int(zigzag_encode(value));
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.flush();
        self.buffer.extend_from_slice(bytes);
    }

    /// Flushes and returns the written bytes
    pub fn consume(mut self) -> Vec<u8> {
        self.flush();
        self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.buffered_values = 0;
        self.bit_offset = 0;
    }
}

/// Reads bit-packed values, varints and aligned integers from a window of a
/// shared page buffer.
///
/// Offsets reported in errors are absolute positions in the page buffer.
#[derive(Debug, Clone)]
pub struct BitReader {
    buffer: Bytes,
    byte_offset: usize,
    bit_offset: usize,
    end: usize,
}

impl BitReader {
    /// Create a reader over `buffer[start..end]`
    pub fn new(buffer: Bytes, start: usize, end: usize) -> Result<Self> {
        if start > end || end > buffer.len() {
            return Err(ParquetError::decoding(
                start,
                "bind bit reader",
                format!(
                    "range {}..{} is outside of a {} byte buffer",
                    start,
                    end,
                    buffer.len()
                ),
            ));
        }
        Ok(Self {
            buffer,
            byte_offset: start,
            bit_offset: 0,
            end,
        })
    }

    /// Create a reader over the whole buffer
    pub fn from_bytes(buffer: Bytes) -> Self {
        let end = buffer.len();
        Self {
            buffer,
            byte_offset: 0,
            bit_offset: 0,
            end,
        }
    }

    /// Offset of the next unread byte, rounding a partially read byte up
    #[inline]
    pub fn byte_offset(&self) -> usize {
        self.byte_offset + ceil(self.bit_offset, 8)
    }

    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    fn bits_left(&self) -> usize {
        (self.end - self.byte_offset) * 8 - self.bit_offset
    }

    /// Moves the cursor to the next byte boundary
    #[inline]
    pub fn align(&mut self) {
        if self.bit_offset > 0 {
            self.byte_offset += 1;
            self.bit_offset = 0;
        }
    }

    /// Reads a `num_bits` wide value
    pub fn get_value(&mut self, num_bits: usize) -> Result<u64> {
        debug_assert!(num_bits <= 64);
        if num_bits == 0 {
            return Ok(0);
        }
        if self.bits_left() < num_bits {
            return Err(ParquetError::decoding(
                self.byte_offset,
                "read bit-packed value",
                format!("need {} bits but only {} remain", num_bits, self.bits_left()),
            ));
        }

        let mut value = 0u64;
        let mut read = 0;
        while read < num_bits {
            let byte = self.buffer[self.byte_offset] as u64;
            let take = (8 - self.bit_offset).min(num_bits - read);
            let bits = (byte >> self.bit_offset) & mask(take);
            value |= bits << read;
            read += take;
            self.bit_offset += take;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }
        Ok(value)
    }

    /// Advances past `num_values` values of `bit_width` bits without
    /// unpacking them
    pub fn skip_values(&mut self, num_values: usize, bit_width: usize) -> Result<()> {
        let num_bits = num_values * bit_width;
        if self.bits_left() < num_bits {
            return Err(ParquetError::decoding(
                self.byte_offset,
                "skip bit-packed values",
                format!(
                    "need {} bits but only {} remain",
                    num_bits,
                    self.bits_left()
                ),
            ));
        }
        let total = self.bit_offset + num_bits;
        self.byte_offset += total / 8;
        self.bit_offset = total % 8;
        Ok(())
    }

    /// Reads a `num_bytes` little-endian integer from the next byte boundary
    pub fn get_aligned(&mut self, num_bytes: usize) -> Result<u64> {
        debug_assert!(num_bytes <= 8);
        self.align();
        if self.end - self.byte_offset < num_bytes {
            return Err(ParquetError::decoding(
                self.byte_offset,
                "read aligned value",
                format!(
                    "need {} bytes but only {} remain",
                    num_bytes,
                    self.end - self.byte_offset
                ),
            ));
        }
        let mut raw = [0u8; 8];
        raw[..num_bytes]
            .copy_from_slice(&self.buffer[self.byte_offset..self.byte_offset + num_bytes]);
        self.byte_offset += num_bytes;
        Ok(u64::from_le_bytes(raw))
    }

    /// Reads a ULEB128 varint from the next byte boundary
    pub fn get_vlq_int(&mut self) -> Result<u64> {
        self.align();
        let start = self.byte_offset;
        let mut value = 0u64;
        for i in 0..MAX_VLQ_BYTE_LEN {
            if self.byte_offset >= self.end {
                return Err(ParquetError::decoding(
                    start,
                    "read varint",
                    "buffer ended inside a varint",
                ));
            }
            let byte = self.buffer[self.byte_offset];
            self.byte_offset += 1;
            let payload = (byte & 0x7F) as u64;
            if i == MAX_VLQ_BYTE_LEN - 1 && payload > 1 {
                break;
            }
            value |= payload << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ParquetError::decoding(
            start,
            "read varint",
            "varint does not fit in 64 bits",
        ))
    }

    /// Reads a zig-zag encoded varint
    pub fn get_zigzag_vlq_int(&mut self) -> Result<i64> {
        self.get_vlq_int().map(zigzag_decode)
    }

    /// Returns the next `num_bytes` bytes as a zero-copy slice of the buffer
    pub fn get_bytes(&mut self, num_bytes: usize) -> Result<Bytes> {
        self.align();
        if self.end - self.byte_offset < num_bytes {
            return Err(ParquetError::decoding(
                self.byte_offset,
                "read bytes",
                format!(
                    "need {} bytes but only {} remain",
                    num_bytes,
                    self.end - self.byte_offset
                ),
            ));
        }
        let start = self.byte_offset;
        self.byte_offset += num_bytes;
        Ok(self.buffer.slice(start..start + num_bytes))
    }

    /// Advances the cursor by `num_bytes` whole bytes
    pub fn skip_bytes(&mut self, num_bytes: usize) -> Result<()> {
        self.get_bytes(num_bytes).map(|_| ())
    }
}
