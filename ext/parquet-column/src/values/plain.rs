//! PLAIN encoding.
//!
//! Fixed-width numbers are stored little-endian back to back, byte arrays
//! carry a 4-byte little-endian length prefix, fixed-length byte arrays are
//! concatenated and booleans are bit-packed one bit per value.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::bit_util::{self, BitReader, BitWriter};
use crate::values::{take_values, ValuesReader, ValuesWriter};
use crate::{ErrorContext, Encoding, ParquetError, PhysicalType, Result};

fn type_mismatch(physical_type: PhysicalType, what: &str) -> ParquetError {
    ParquetError::Unsupported(format!(
        "PLAIN codec for {} columns cannot handle {} values",
        physical_type.type_name(),
        what
    ))
}

fn underrun(offset: usize, operation: &'static str, needed: usize, available: usize) -> ParquetError {
    ParquetError::decoding(
        offset,
        operation,
        format!("need {} bytes but only {} remain", needed, available),
    )
    .with_encoding(Encoding::Plain)
}

/// PLAIN writer for INT32, INT64, FLOAT, DOUBLE and BYTE_ARRAY columns
#[derive(Debug)]
pub struct PlainValuesWriter {
    physical_type: PhysicalType,
    buffer: BytesMut,
    num_values: usize,
}

impl PlainValuesWriter {
    pub fn new(physical_type: PhysicalType) -> Result<Self> {
        match physical_type {
            PhysicalType::Boolean | PhysicalType::FixedLenByteArray(_) => {
                Err(ParquetError::Configuration(format!(
                    "{} columns need a dedicated PLAIN writer",
                    physical_type.type_name()
                )))
            }
            _ => Ok(Self {
                physical_type,
                buffer: BytesMut::new(),
                num_values: 0,
            }),
        }
    }

    fn expect_type(&self, expected: PhysicalType, what: &str) -> Result<()> {
        if self.physical_type == expected {
            Ok(())
        } else {
            Err(type_mismatch(self.physical_type, what))
        }
    }
}

impl ValuesWriter for PlainValuesWriter {
    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.expect_type(PhysicalType::Int32, "int32")?;
        self.buffer.put_i32_le(value);
        self.num_values += 1;
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.expect_type(PhysicalType::Int64, "int64")?;
        self.buffer.put_i64_le(value);
        self.num_values += 1;
        Ok(())
    }

    fn write_f32(&mut self, value: f32) -> Result<()> {
        self.expect_type(PhysicalType::Float, "float")?;
        self.buffer.put_f32_le(value);
        self.num_values += 1;
        Ok(())
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.expect_type(PhysicalType::Double, "double")?;
        self.buffer.put_f64_le(value);
        self.num_values += 1;
        Ok(())
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.expect_type(PhysicalType::ByteArray, "byte array")?;
        let len = u32::try_from(value.len()).map_err(|_| {
            ParquetError::invalid_argument(format!(
                "byte array of {} bytes exceeds the 4-byte length prefix",
                value.len()
            ))
        })?;
        self.buffer.put_u32_le(len);
        self.buffer.put_slice(value);
        self.num_values += 1;
        Ok(())
    }

    fn num_buffered_values(&self) -> usize {
        self.num_values
    }

    fn estimated_size(&self) -> usize {
        self.buffer.len()
    }

    fn finish_page(&mut self) -> Result<Bytes> {
        self.num_values = 0;
        Ok(self.buffer.split().freeze())
    }
}

/// PLAIN reader for INT32, INT64, FLOAT, DOUBLE and BYTE_ARRAY columns
#[derive(Debug)]
pub struct PlainValuesReader {
    physical_type: PhysicalType,
    buffer: Bytes,
    offset: usize,
    end: usize,
    remaining: usize,
}

impl PlainValuesReader {
    pub fn new(physical_type: PhysicalType) -> Result<Self> {
        match physical_type {
            PhysicalType::Boolean | PhysicalType::FixedLenByteArray(_) => {
                Err(ParquetError::Configuration(format!(
                    "{} columns need a dedicated PLAIN reader",
                    physical_type.type_name()
                )))
            }
            _ => Ok(Self {
                physical_type,
                buffer: Bytes::new(),
                offset: 0,
                end: 0,
                remaining: 0,
            }),
        }
    }

    /// Claims the next `width` bytes of a fixed-width value and returns
    /// their start offset
    fn next_fixed(&mut self, expected: PhysicalType, what: &str, operation: &'static str) -> Result<usize> {
        if self.physical_type != expected {
            return Err(type_mismatch(self.physical_type, what));
        }
        let width = self.physical_type.plain_width().unwrap_or(0);
        take_values(&mut self.remaining, 1, self.offset, Encoding::Plain, operation)?;
        if self.end - self.offset < width {
            return Err(underrun(self.offset, operation, width, self.end - self.offset));
        }
        let start = self.offset;
        self.offset += width;
        Ok(start)
    }

    fn read_length_prefixed(&mut self, operation: &'static str) -> Result<Bytes> {
        let prefix_offset = self.offset;
        if self.end - self.offset < 4 {
            return Err(underrun(prefix_offset, operation, 4, self.end - self.offset));
        }
        let len = (&self.buffer[self.offset..self.offset + 4]).get_u32_le() as usize;
        let start = self.offset + 4;
        if self.end - start < len {
            return Err(ParquetError::decoding(
                prefix_offset,
                operation,
                format!(
                    "byte array length {} exceeds the {} bytes left in the page",
                    len,
                    self.end - start
                ),
            )
            .with_encoding(Encoding::Plain));
        }
        self.offset = start + len;
        Ok(self.buffer.slice(start..start + len))
    }
}

impl ValuesReader for PlainValuesReader {
    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }

    fn init_from_page(
        &mut self,
        value_count: usize,
        buffer: Bytes,
        offset: usize,
    ) -> Result<usize> {
        if offset > buffer.len() {
            return Err(ParquetError::decoding(
                offset,
                "bind page",
                format!("offset is past the end of a {} byte buffer", buffer.len()),
            )
            .with_encoding(Encoding::Plain));
        }
        self.buffer = buffer;
        self.offset = offset;
        self.end = self.buffer.len();
        self.remaining = value_count;

        match self.physical_type.plain_width() {
            Some(width) => {
                let needed = value_count.checked_mul(width).unwrap_or(usize::MAX);
                let available = self.end - offset;
                if needed > available {
                    return Err(ParquetError::decoding(
                        offset,
                        "bind page",
                        format!(
                            "page declares {} values ({} bytes) but only {} bytes remain",
                            value_count, needed, available
                        ),
                    )
                    .with_encoding(Encoding::Plain));
                }
                self.end = offset + needed;
            }
            None => {
                // walk the length prefixes to find where this page ends
                let mut cursor = offset;
                for _ in 0..value_count {
                    if self.end - cursor < 4 {
                        return Err(underrun(cursor, "bind page", 4, self.end - cursor));
                    }
                    let len = (&self.buffer[cursor..cursor + 4]).get_u32_le() as usize;
                    if self.end - cursor - 4 < len {
                        return Err(underrun(cursor, "bind page", len, self.end - cursor - 4));
                    }
                    cursor += 4 + len;
                }
                self.end = cursor;
            }
        }
        Ok(self.end)
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn skip_n(&mut self, count: usize) -> Result<()> {
        take_values(&mut self.remaining, count, self.offset, Encoding::Plain, "skip values")?;
        match self.physical_type.plain_width() {
            Some(width) => {
                let bytes = count * width;
                if self.end - self.offset < bytes {
                    return Err(underrun(self.offset, "skip values", bytes, self.end - self.offset));
                }
                self.offset += bytes;
            }
            None => {
                for _ in 0..count {
                    self.read_length_prefixed("skip values")?;
                }
            }
        }
        Ok(())
    }

    fn read_i32(&mut self) -> Result<i32> {
        let start = self.next_fixed(PhysicalType::Int32, "int32", "read int32")?;
        Ok((&self.buffer[start..start + 4]).get_i32_le())
    }

    fn read_i64(&mut self) -> Result<i64> {
        let start = self.next_fixed(PhysicalType::Int64, "int64", "read int64")?;
        Ok((&self.buffer[start..start + 8]).get_i64_le())
    }

    fn read_f32(&mut self) -> Result<f32> {
        let start = self.next_fixed(PhysicalType::Float, "float", "read float")?;
        Ok((&self.buffer[start..start + 4]).get_f32_le())
    }

    fn read_f64(&mut self) -> Result<f64> {
        let start = self.next_fixed(PhysicalType::Double, "double", "read double")?;
        Ok((&self.buffer[start..start + 8]).get_f64_le())
    }

    fn read_bytes(&mut self) -> Result<Bytes> {
        if self.physical_type != PhysicalType::ByteArray {
            return Err(type_mismatch(self.physical_type, "byte array"));
        }
        take_values(&mut self.remaining, 1, self.offset, Encoding::Plain, "read byte array")?;
        self.read_length_prefixed("read byte array")
    }

    fn read_i32_batch(&mut self, out: &mut [i32]) -> Result<()> {
        if self.physical_type != PhysicalType::Int32 {
            return Err(type_mismatch(self.physical_type, "int32"));
        }
        take_values(&mut self.remaining, out.len(), self.offset, Encoding::Plain, "read int32")?;
        let bytes = out.len() * 4;
        if self.end - self.offset < bytes {
            return Err(underrun(self.offset, "read int32", bytes, self.end - self.offset));
        }
        let mut src = &self.buffer[self.offset..self.offset + bytes];
        for slot in out.iter_mut() {
            *slot = src.get_i32_le();
        }
        self.offset += bytes;
        Ok(())
    }

    fn read_i64_batch(&mut self, out: &mut [i64]) -> Result<()> {
        if self.physical_type != PhysicalType::Int64 {
            return Err(type_mismatch(self.physical_type, "int64"));
        }
        take_values(&mut self.remaining, out.len(), self.offset, Encoding::Plain, "read int64")?;
        let bytes = out.len() * 8;
        if self.end - self.offset < bytes {
            return Err(underrun(self.offset, "read int64", bytes, self.end - self.offset));
        }
        let mut src = &self.buffer[self.offset..self.offset + bytes];
        for slot in out.iter_mut() {
            *slot = src.get_i64_le();
        }
        self.offset += bytes;
        Ok(())
    }
}

/// PLAIN writer for FIXED_LEN_BYTE_ARRAY columns
#[derive(Debug)]
pub struct FixedLenByteArrayPlainValuesWriter {
    length: usize,
    buffer: BytesMut,
    num_values: usize,
}

impl FixedLenByteArrayPlainValuesWriter {
    pub fn new(length: usize) -> Result<Self> {
        if length == 0 {
            return Err(ParquetError::configuration(
                "fixed-length byte arrays need a length greater than 0",
            ));
        }
        Ok(Self {
            length,
            buffer: BytesMut::new(),
            num_values: 0,
        })
    }
}

impl ValuesWriter for FixedLenByteArrayPlainValuesWriter {
    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        if value.len() != self.length {
            return Err(ParquetError::invalid_argument(format!(
                "expected a fixed-length value of {} bytes, got {}",
                self.length,
                value.len()
            )));
        }
        self.buffer.put_slice(value);
        self.num_values += 1;
        Ok(())
    }

    fn num_buffered_values(&self) -> usize {
        self.num_values
    }

    fn estimated_size(&self) -> usize {
        self.buffer.len()
    }

    fn finish_page(&mut self) -> Result<Bytes> {
        self.num_values = 0;
        Ok(self.buffer.split().freeze())
    }
}

/// PLAIN reader for FIXED_LEN_BYTE_ARRAY columns
#[derive(Debug)]
pub struct FixedLenByteArrayPlainValuesReader {
    length: usize,
    buffer: Bytes,
    offset: usize,
    remaining: usize,
}

impl FixedLenByteArrayPlainValuesReader {
    pub fn new(length: usize) -> Result<Self> {
        if length == 0 {
            return Err(ParquetError::configuration(
                "fixed-length byte arrays need a length greater than 0",
            ));
        }
        Ok(Self {
            length,
            buffer: Bytes::new(),
            offset: 0,
            remaining: 0,
        })
    }
}

impl ValuesReader for FixedLenByteArrayPlainValuesReader {
    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }

    fn init_from_page(
        &mut self,
        value_count: usize,
        buffer: Bytes,
        offset: usize,
    ) -> Result<usize> {
        let needed = value_count.checked_mul(self.length).unwrap_or(usize::MAX);
        let available = buffer.len().saturating_sub(offset);
        if offset > buffer.len() || needed > available {
            return Err(ParquetError::decoding(
                offset,
                "bind page",
                format!(
                    "page declares {} values of {} bytes but only {} bytes remain",
                    value_count, self.length, available
                ),
            )
            .with_encoding(Encoding::Plain));
        }
        self.buffer = buffer;
        self.offset = offset;
        self.remaining = value_count;
        Ok(offset + needed)
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn skip_n(&mut self, count: usize) -> Result<()> {
        take_values(&mut self.remaining, count, self.offset, Encoding::Plain, "skip values")?;
        self.offset += count * self.length;
        Ok(())
    }

    fn read_bytes(&mut self) -> Result<Bytes> {
        take_values(
            &mut self.remaining,
            1,
            self.offset,
            Encoding::Plain,
            "read fixed-length byte array",
        )?;
        let start = self.offset;
        self.offset += self.length;
        Ok(self.buffer.slice(start..self.offset))
    }
}

/// PLAIN writer for BOOLEAN columns, one bit per value
#[derive(Debug, Default)]
pub struct BooleanPlainValuesWriter {
    bit_writer: BitWriter,
    num_values: usize,
}

impl BooleanPlainValuesWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValuesWriter for BooleanPlainValuesWriter {
    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }

    fn write_boolean(&mut self, value: bool) -> Result<()> {
        self.bit_writer.put_value(value as u64, 1);
        self.num_values += 1;
        Ok(())
    }

    fn num_buffered_values(&self) -> usize {
        self.num_values
    }

    fn estimated_size(&self) -> usize {
        self.bit_writer.bytes_written()
    }

    fn finish_page(&mut self) -> Result<Bytes> {
        self.num_values = 0;
        Ok(Bytes::from(std::mem::take(&mut self.bit_writer).consume()))
    }
}

/// PLAIN reader for BOOLEAN columns
#[derive(Debug, Default)]
pub struct BooleanPlainValuesReader {
    bit_reader: Option<BitReader>,
    remaining: usize,
}

impl BooleanPlainValuesReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn reader(&mut self) -> Result<&mut BitReader> {
        self.bit_reader
            .as_mut()
            .ok_or_else(|| ParquetError::internal("PLAIN reader used before init_from_page"))
    }
}

impl ValuesReader for BooleanPlainValuesReader {
    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }

    fn init_from_page(
        &mut self,
        value_count: usize,
        buffer: Bytes,
        offset: usize,
    ) -> Result<usize> {
        let end = offset + bit_util::ceil(value_count, 8);
        if end > buffer.len() {
            return Err(ParquetError::decoding(
                offset,
                "bind page",
                format!(
                    "page declares {} booleans but only {} bytes remain",
                    value_count,
                    buffer.len().saturating_sub(offset)
                ),
            )
            .with_encoding(Encoding::Plain));
        }
        self.bit_reader = Some(BitReader::new(buffer, offset, end)?);
        self.remaining = value_count;
        Ok(end)
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn skip_n(&mut self, count: usize) -> Result<()> {
        let offset = self.reader()?.byte_offset();
        take_values(&mut self.remaining, count, offset, Encoding::Plain, "skip values")?;
        self.reader()?.skip_values(count, 1).in_encoding(Encoding::Plain)
    }

    fn read_boolean(&mut self) -> Result<bool> {
        let offset = self.reader()?.byte_offset();
        take_values(&mut self.remaining, 1, offset, Encoding::Plain, "read boolean")?;
        Ok(self.reader()?.get_value(1).in_encoding(Encoding::Plain)? != 0)
    }
}
