//! DELTA_LENGTH_BYTE_ARRAY and DELTA_BYTE_ARRAY encodings.
//!
//! DELTA_LENGTH_BYTE_ARRAY stores every length with DELTA_BINARY_PACKED and
//! then the concatenated bytes. DELTA_BYTE_ARRAY stores the length of the
//! prefix shared with the previous value, then the remaining suffixes as
//! DELTA_LENGTH_BYTE_ARRAY.

use bytes::{BufMut, Bytes, BytesMut};

use crate::values::delta::{DeltaBitPackingDecoder, DeltaBitPackingEncoder};
use crate::values::{take_values, ValuesReader, ValuesWriter};
use crate::{DecodingError, Encoding, ErrorContext, ParquetError, PhysicalType, Result};

fn length_as_i32(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| {
        ParquetError::invalid_argument(format!(
            "byte array of {} bytes is too long for a delta length",
            len
        ))
    })
}

/// Decode a DELTA_BINARY_PACKED length stream at `offset` holding exactly
/// `value_count` non-negative lengths. Returns the lengths and the end of
/// the stream.
fn decode_lengths(
    buffer: &Bytes,
    offset: usize,
    value_count: usize,
    encoding: Encoding,
    what: &'static str,
) -> Result<(Vec<usize>, usize)> {
    let mut decoder = DeltaBitPackingDecoder::<i32>::new();
    let end = decoder.init(buffer.clone(), offset).in_encoding(encoding)?;
    if decoder.total_values() != value_count {
        return Err(ParquetError::decoding(
            offset,
            "bind page",
            format!(
                "page declares {} values but stores {} {}s",
                value_count,
                decoder.total_values(),
                what
            ),
        )
        .with_encoding(encoding));
    }
    let mut raw = vec![0i32; value_count];
    decoder.get_batch(&mut raw).in_encoding(encoding)?;

    let mut lengths = Vec::with_capacity(raw.len());
    for (i, len) in raw.into_iter().enumerate() {
        let len = usize::try_from(len).map_err(|_| {
            ParquetError::Decoding(
                DecodingError::new(offset, what, format!("{} {} is negative: {}", what, i, len))
                    .with_encoding(encoding),
            )
        })?;
        lengths.push(len);
    }
    Ok((lengths, end))
}

/// Writer for DELTA_LENGTH_BYTE_ARRAY pages
#[derive(Debug)]
pub struct DeltaLengthByteArrayValuesWriter {
    lengths: DeltaBitPackingEncoder<i32>,
    data: BytesMut,
}

impl Default for DeltaLengthByteArrayValuesWriter {
    fn default() -> Self {
        Self {
            lengths: DeltaBitPackingEncoder::with_default_geometry(),
            data: BytesMut::new(),
        }
    }
}

impl DeltaLengthByteArrayValuesWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValuesWriter for DeltaLengthByteArrayValuesWriter {
    fn encoding(&self) -> Encoding {
        Encoding::DeltaLengthByteArray
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.lengths.put(length_as_i32(value.len())?);
        self.data.put_slice(value);
        Ok(())
    }

    fn num_buffered_values(&self) -> usize {
        self.lengths.len()
    }

    fn estimated_size(&self) -> usize {
        self.lengths.estimated_size() + self.data.len()
    }

    fn finish_page(&mut self) -> Result<Bytes> {
        let lengths = self.lengths.finish();
        let mut out = BytesMut::with_capacity(lengths.len() + self.data.len());
        out.put_slice(&lengths);
        out.put_slice(&self.data);
        self.data.clear();
        Ok(out.freeze())
    }
}

/// Reader for DELTA_LENGTH_BYTE_ARRAY pages. Lengths are decoded up front so
/// skipping only sums them.
#[derive(Debug, Default)]
pub struct DeltaLengthByteArrayValuesReader {
    buffer: Bytes,
    lengths: Vec<usize>,
    next: usize,
    offset: usize,
    remaining: usize,
}

impl DeltaLengthByteArrayValuesReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(
        &mut self,
        value_count: usize,
        buffer: Bytes,
        offset: usize,
        encoding: Encoding,
    ) -> Result<usize> {
        let (lengths, data_start) =
            decode_lengths(&buffer, offset, value_count, encoding, "length")?;
        let available = buffer.len() - data_start;
        let total = lengths
            .iter()
            .try_fold(0usize, |acc, &len| acc.checked_add(len))
            .filter(|&total| total <= available)
            .ok_or_else(|| {
                ParquetError::decoding(
                    data_start,
                    "bind page",
                    format!(
                        "lengths add up to more than the {} bytes that remain",
                        available
                    ),
                )
                .with_encoding(encoding)
            })?;
        let end = data_start + total;
        self.buffer = buffer;
        self.lengths = lengths;
        self.next = 0;
        self.offset = data_start;
        self.remaining = value_count;
        Ok(end)
    }

    fn next_value(&mut self) -> Bytes {
        let len = self.lengths[self.next];
        let start = self.offset;
        self.next += 1;
        self.offset += len;
        self.buffer.slice(start..start + len)
    }
}

impl ValuesReader for DeltaLengthByteArrayValuesReader {
    fn encoding(&self) -> Encoding {
        Encoding::DeltaLengthByteArray
    }

    fn init_from_page(
        &mut self,
        value_count: usize,
        buffer: Bytes,
        offset: usize,
    ) -> Result<usize> {
        self.bind(value_count, buffer, offset, Encoding::DeltaLengthByteArray)
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn skip_n(&mut self, count: usize) -> Result<()> {
        take_values(
            &mut self.remaining,
            count,
            self.offset,
            Encoding::DeltaLengthByteArray,
            "skip values",
        )?;
        let skipped: usize = self.lengths[self.next..self.next + count].iter().sum();
        self.next += count;
        self.offset += skipped;
        Ok(())
    }

    fn read_bytes(&mut self) -> Result<Bytes> {
        take_values(
            &mut self.remaining,
            1,
            self.offset,
            Encoding::DeltaLengthByteArray,
            "read byte array",
        )?;
        Ok(self.next_value())
    }
}

/// Writer for DELTA_BYTE_ARRAY pages (incremental or front compression)
#[derive(Debug)]
pub struct DeltaByteArrayWriter {
    physical_type: PhysicalType,
    prefix_lengths: DeltaBitPackingEncoder<i32>,
    suffixes: DeltaLengthByteArrayValuesWriter,
    previous: Vec<u8>,
}

impl DeltaByteArrayWriter {
    pub fn new(physical_type: PhysicalType) -> Self {
        Self {
            physical_type,
            prefix_lengths: DeltaBitPackingEncoder::with_default_geometry(),
            suffixes: DeltaLengthByteArrayValuesWriter::new(),
            previous: Vec::new(),
        }
    }
}

impl ValuesWriter for DeltaByteArrayWriter {
    fn encoding(&self) -> Encoding {
        Encoding::DeltaByteArray
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        if let PhysicalType::FixedLenByteArray(len) = self.physical_type {
            if value.len() != len {
                return Err(ParquetError::invalid_argument(format!(
                    "expected a fixed-length value of {} bytes, got {}",
                    len,
                    value.len()
                )));
            }
        }
        let prefix = self
            .previous
            .iter()
            .zip(value)
            .take_while(|(a, b)| a == b)
            .count();
        self.prefix_lengths.put(length_as_i32(prefix)?);
        self.suffixes.write_bytes(&value[prefix..])?;
        self.previous.clear();
        self.previous.extend_from_slice(value);
        Ok(())
    }

    fn num_buffered_values(&self) -> usize {
        self.prefix_lengths.len()
    }

    fn estimated_size(&self) -> usize {
        self.prefix_lengths.estimated_size() + self.suffixes.estimated_size()
    }

    fn finish_page(&mut self) -> Result<Bytes> {
        let prefixes = self.prefix_lengths.finish();
        let suffixes = self.suffixes.finish_page()?;
        self.previous.clear();

        let mut out = BytesMut::with_capacity(prefixes.len() + suffixes.len());
        out.put_slice(&prefixes);
        out.put_slice(&suffixes);
        Ok(out.freeze())
    }
}

/// Reader for DELTA_BYTE_ARRAY pages
#[derive(Debug, Default)]
pub struct DeltaByteArrayReader {
    prefix_lengths: Vec<usize>,
    suffixes: DeltaLengthByteArrayValuesReader,
    previous: Bytes,
    next: usize,
    remaining: usize,
}

impl DeltaByteArrayReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_value(&mut self) -> Result<Bytes> {
        let prefix = self.prefix_lengths[self.next];
        let offset = self.suffixes.offset;
        if prefix > self.previous.len() {
            return Err(DecodingError::new(
                offset,
                "read byte array",
                format!(
                    "prefix length {} exceeds the previous value's {} bytes",
                    prefix,
                    self.previous.len()
                ),
            )
            .with_encoding(Encoding::DeltaByteArray)
            .into());
        }
        let suffix = self.suffixes.next_value();
        self.next += 1;

        let value = if prefix == 0 {
            suffix
        } else {
            let mut value = BytesMut::with_capacity(prefix + suffix.len());
            value.put_slice(&self.previous[..prefix]);
            value.put_slice(&suffix);
            value.freeze()
        };
        self.previous = value.clone();
        Ok(value)
    }
}

impl ValuesReader for DeltaByteArrayReader {
    fn encoding(&self) -> Encoding {
        Encoding::DeltaByteArray
    }

    fn init_from_page(
        &mut self,
        value_count: usize,
        buffer: Bytes,
        offset: usize,
    ) -> Result<usize> {
        let (prefix_lengths, suffixes_start) = decode_lengths(
            &buffer,
            offset,
            value_count,
            Encoding::DeltaByteArray,
            "prefix length",
        )?;
        let end = self.suffixes.bind(
            value_count,
            buffer,
            suffixes_start,
            Encoding::DeltaByteArray,
        )?;
        self.prefix_lengths = prefix_lengths;
        self.previous = Bytes::new();
        self.next = 0;
        self.remaining = value_count;
        Ok(end)
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn skip_n(&mut self, count: usize) -> Result<()> {
        take_values(
            &mut self.remaining,
            count,
            self.suffixes.offset,
            Encoding::DeltaByteArray,
            "skip values",
        )?;
        // values are rebuilt so the next prefix still resolves
        for _ in 0..count {
            self.next_value()?;
        }
        Ok(())
    }

    fn read_bytes(&mut self) -> Result<Bytes> {
        take_values(
            &mut self.remaining,
            1,
            self.suffixes.offset,
            Encoding::DeltaByteArray,
            "read byte array",
        )?;
        self.next_value()
    }
}
