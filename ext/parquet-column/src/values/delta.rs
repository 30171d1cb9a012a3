//! DELTA_BINARY_PACKED encoding for INT32 and INT64 columns.
//!
//! ```text
//! header := <block size> <miniblocks per block> <total count> <zigzag first value>
//! block  := <zigzag min delta> <one bit-width byte per miniblock> <miniblocks>
//! ```
//!
//! Every miniblock packs `delta - min_delta` for its values LSB-first at its
//! own bit width. Miniblocks past the last value are not written. Deltas are
//! computed with wrapping arithmetic in the column's own width.

use std::fmt::Debug;

use bytes::{BufMut, Bytes, BytesMut};
use num::traits::{PrimInt, WrappingAdd, WrappingSub};

use crate::bit_util::{self, BitReader, BitWriter};
use crate::values::{take_values, ValuesReader, ValuesWriter};
use crate::{Encoding, ErrorContext, ParquetError, Result};

/// Integer widths the delta codec operates on
pub trait DeltaInt: PrimInt + WrappingAdd + WrappingSub + Send + Debug + 'static {
    const BITS: u8;

    /// Sign-extend to 64 bits
    fn widen(self) -> i64;

    /// Narrow a 64-bit value, `None` when it does not fit
    fn narrow(value: i64) -> Option<Self>;

    /// The value's bit pattern read as an unsigned integer
    fn to_unsigned_bits(self) -> u64;

    fn from_unsigned_bits(bits: u64) -> Self;
}

macro_rules! impl_delta_int {
    ($ty:ty, $unsigned:ty, $bits:expr) => {
        impl DeltaInt for $ty {
            const BITS: u8 = $bits;

            fn widen(self) -> i64 {
                self as i64
            }

            fn narrow(value: i64) -> Option<Self> {
                <$ty>::try_from(value).ok()
            }

            fn to_unsigned_bits(self) -> u64 {
                self as $unsigned as u64
            }

            fn from_unsigned_bits(bits: u64) -> Self {
                bits as $unsigned as $ty
            }
        }
    };
}

impl_delta_int!(i32, u32, 32);
impl_delta_int!(i64, u64, 64);

pub const DEFAULT_BLOCK_SIZE: usize = 128;
pub const DEFAULT_MINIBLOCKS_PER_BLOCK: usize = 4;
/// Largest block a decoder unpacks at once
pub const MAX_BLOCK_SIZE: usize = 1 << 16;

/// Check block geometry: the block size is a positive multiple of 128 no
/// larger than [`MAX_BLOCK_SIZE`] and each miniblock holds a multiple of 32
/// values
pub fn validate_block_geometry(block_size: usize, miniblocks: usize) -> Result<usize> {
    if block_size == 0 || block_size % 128 != 0 {
        return Err(ParquetError::Configuration(format!(
            "delta block size must be a positive multiple of 128, got {}",
            block_size
        )));
    }
    if block_size > MAX_BLOCK_SIZE {
        return Err(ParquetError::Configuration(format!(
            "delta block size {} exceeds the maximum of {}",
            block_size, MAX_BLOCK_SIZE
        )));
    }
    if miniblocks == 0 || block_size % miniblocks != 0 || (block_size / miniblocks) % 32 != 0 {
        return Err(ParquetError::Configuration(format!(
            "{} miniblocks do not split a block of {} into multiples of 32 values",
            miniblocks, block_size
        )));
    }
    Ok(block_size / miniblocks)
}

/// Streaming DELTA_BINARY_PACKED encoder
#[derive(Debug)]
pub struct DeltaBitPackingEncoder<T: DeltaInt> {
    block_size: usize,
    miniblocks: usize,
    values_per_miniblock: usize,
    first_value: Option<T>,
    previous: T,
    total_values: usize,
    deltas: Vec<T>,
    blocks: BitWriter,
}

impl<T: DeltaInt> DeltaBitPackingEncoder<T> {
    pub fn new(block_size: usize, miniblocks: usize) -> Result<Self> {
        let values_per_miniblock = validate_block_geometry(block_size, miniblocks)?;
        Ok(Self {
            block_size,
            miniblocks,
            values_per_miniblock,
            first_value: None,
            previous: T::zero(),
            total_values: 0,
            deltas: Vec::with_capacity(block_size),
            blocks: BitWriter::new(),
        })
    }

    /// Encoder with the default geometry of 128 values in 4 miniblocks
    pub fn with_default_geometry() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            miniblocks: DEFAULT_MINIBLOCKS_PER_BLOCK,
            values_per_miniblock: DEFAULT_BLOCK_SIZE / DEFAULT_MINIBLOCKS_PER_BLOCK,
            first_value: None,
            previous: T::zero(),
            total_values: 0,
            deltas: Vec::with_capacity(DEFAULT_BLOCK_SIZE),
            blocks: BitWriter::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.total_values
    }

    pub fn is_empty(&self) -> bool {
        self.total_values == 0
    }

    pub fn estimated_size(&self) -> usize {
        // header, then flushed blocks, then the pending deltas at full width
        20 + self.blocks.bytes_written() + self.deltas.len() * (T::BITS as usize / 8)
    }

    pub fn put(&mut self, value: T) {
        self.total_values += 1;
        if self.first_value.is_none() {
            self.first_value = Some(value);
        } else {
            self.deltas.push(value.wrapping_sub(&self.previous));
            if self.deltas.len() == self.block_size {
                self.flush_block();
            }
        }
        self.previous = value;
    }

    fn flush_block(&mut self) {
        let min_delta = match self.deltas.iter().copied().min() {
            Some(min) => min,
            None => return,
        };
        self.blocks.put_zigzag_vlq_int(min_delta.widen());

        let chunks: Vec<&[T]> = self.deltas.chunks(self.values_per_miniblock).collect();
        let mut widths = vec![0u8; self.miniblocks];
        for (width, chunk) in widths.iter_mut().zip(&chunks) {
            let max = chunk
                .iter()
                .map(|d| d.wrapping_sub(&min_delta).to_unsigned_bits())
                .max()
                .unwrap_or(0);
            *width = bit_util::num_required_bits(max);
        }
        self.blocks.put_bytes(&widths);

        for (chunk, &width) in chunks.iter().zip(&widths) {
            for delta in chunk.iter() {
                self.blocks
                    .put_value(delta.wrapping_sub(&min_delta).to_unsigned_bits(), width as usize);
            }
            // zero-pad the last miniblock
            for _ in chunk.len()..self.values_per_miniblock {
                self.blocks.put_value(0, width as usize);
            }
        }
        self.deltas.clear();
    }

    /// Finish the page and reset the encoder
    pub fn finish(&mut self) -> Bytes {
        self.flush_block();

        let mut header = BitWriter::with_capacity(20);
        header.put_vlq_int(self.block_size as u64);
        header.put_vlq_int(self.miniblocks as u64);
        header.put_vlq_int(self.total_values as u64);
        header.put_zigzag_vlq_int(self.first_value.map_or(0, |v| v.widen()));
        let header = header.consume();
        let blocks = std::mem::take(&mut self.blocks).consume();

        let mut out = BytesMut::with_capacity(header.len() + blocks.len());
        out.put_slice(&header);
        out.put_slice(&blocks);

        self.first_value = None;
        self.previous = T::zero();
        self.total_values = 0;
        out.freeze()
    }
}

/// DELTA_BINARY_PACKED decoder that unpacks one block at a time
#[derive(Debug)]
pub struct DeltaBitPackingDecoder<T: DeltaInt> {
    reader: Option<BitReader>,
    block_size: usize,
    miniblocks: usize,
    values_per_miniblock: usize,
    total_values: usize,
    values_left: usize,
    deltas_left: usize,
    first_value: Option<T>,
    last_value: T,
    block: Vec<T>,
    block_pos: usize,
}

impl<T: DeltaInt> Default for DeltaBitPackingDecoder<T> {
    fn default() -> Self {
        Self {
            reader: None,
            block_size: 0,
            miniblocks: 0,
            values_per_miniblock: 0,
            total_values: 0,
            values_left: 0,
            deltas_left: 0,
            first_value: None,
            last_value: T::zero(),
            block: Vec::new(),
            block_pos: 0,
        }
    }
}

impl<T: DeltaInt> DeltaBitPackingDecoder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total values declared by the page header
    pub fn total_values(&self) -> usize {
        self.total_values
    }

    /// Values not yet read or skipped
    pub fn values_left(&self) -> usize {
        self.values_left
    }

    /// Offset of the next unread byte
    pub fn byte_offset(&self) -> usize {
        self.reader.as_ref().map_or(0, |r| r.byte_offset())
    }

    /// Parse the header at `offset` and walk the block headers to find the
    /// end of the stream. Returns the end offset.
    pub fn init(&mut self, buffer: Bytes, offset: usize) -> Result<usize> {
        let mut reader = BitReader::new(buffer.clone(), offset, buffer.len())?;

        let block_size = read_usize(&mut reader, "read block size")?;
        let miniblocks_offset = reader.byte_offset();
        let miniblocks = read_usize(&mut reader, "read miniblock count")?;
        let total_values = read_usize(&mut reader, "read value count")?;
        let first_offset = reader.byte_offset();
        let first_value = narrow::<T>(reader.get_zigzag_vlq_int()?, first_offset, "read first value")?;

        let values_per_miniblock = validate_block_geometry(block_size, miniblocks).map_err(|e| {
            ParquetError::decoding(miniblocks_offset, "read block geometry", e.to_string())
        })?;

        let data_start = reader.byte_offset();
        let mut deltas_left = total_values.saturating_sub(1);
        while deltas_left > 0 {
            let in_block = deltas_left.min(block_size);
            reader.get_zigzag_vlq_int()?;
            let widths_offset = reader.byte_offset();
            let widths = reader.get_bytes(miniblocks)?;
            for (i, &width) in widths
                .iter()
                .take(bit_util::ceil(in_block, values_per_miniblock))
                .enumerate()
            {
                check_width::<T>(width, widths_offset + i)?;
                let packed = values_per_miniblock
                    .checked_mul(width as usize)
                    .map(|bits| bits / 8)
                    .ok_or_else(|| {
                        ParquetError::decoding(
                            widths_offset + i,
                            "walk miniblocks",
                            format!(
                                "{} values at bit width {} overflow the byte count",
                                values_per_miniblock, width
                            ),
                        )
                    })?;
                reader.skip_bytes(packed)?;
            }
            deltas_left -= in_block;
        }
        let end = reader.byte_offset();

        self.reader = Some(BitReader::new(buffer, data_start, end)?);
        self.block_size = block_size;
        self.miniblocks = miniblocks;
        self.values_per_miniblock = values_per_miniblock;
        self.total_values = total_values;
        self.values_left = total_values;
        self.deltas_left = total_values.saturating_sub(1);
        self.first_value = if total_values > 0 { Some(first_value) } else { None };
        self.last_value = first_value;
        self.block.clear();
        self.block_pos = 0;
        Ok(end)
    }

    fn load_block(&mut self) -> Result<()> {
        let in_block = self.deltas_left.min(self.block_size);
        let miniblocks = self.miniblocks;
        let per_miniblock = self.values_per_miniblock;
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ParquetError::internal("delta decoder used before init"))?;

        let min_offset = reader.byte_offset();
        let min_delta = narrow::<T>(reader.get_zigzag_vlq_int()?, min_offset, "read min delta")?;
        let widths_offset = reader.byte_offset();
        let widths = reader.get_bytes(miniblocks)?;

        let mut last = self.last_value;
        self.block.clear();
        self.block_pos = 0;
        for (i, &width) in widths
            .iter()
            .take(bit_util::ceil(in_block, per_miniblock))
            .enumerate()
        {
            check_width::<T>(width, widths_offset + i)?;
            let count = per_miniblock.min(in_block - i * per_miniblock);
            for _ in 0..count {
                let raw = reader.get_value(width as usize)?;
                let delta = min_delta.wrapping_add(&T::from_unsigned_bits(raw));
                last = last.wrapping_add(&delta);
                self.block.push(last);
            }
            reader.skip_values(per_miniblock - count, width as usize)?;
        }
        self.last_value = last;
        self.deltas_left -= in_block;
        Ok(())
    }

    fn exhausted(&self) -> ParquetError {
        ParquetError::decoding(
            self.byte_offset(),
            "read delta value",
            format!("all {} values were already read", self.total_values),
        )
    }

    pub fn get(&mut self) -> Result<T> {
        if self.values_left == 0 {
            return Err(self.exhausted());
        }
        if let Some(first) = self.first_value.take() {
            self.values_left -= 1;
            return Ok(first);
        }
        if self.block_pos == self.block.len() {
            self.load_block()?;
        }
        let value = self.block[self.block_pos];
        self.block_pos += 1;
        self.values_left -= 1;
        Ok(value)
    }

    pub fn get_batch(&mut self, out: &mut [T]) -> Result<()> {
        for slot in out.iter_mut() {
            *slot = self.get()?;
        }
        Ok(())
    }

    /// Skip `count` values; blocks are still unpacked so later values resolve
    pub fn skip(&mut self, mut count: usize) -> Result<()> {
        if count > self.values_left {
            return Err(self.exhausted());
        }
        if count > 0 && self.first_value.take().is_some() {
            self.values_left -= 1;
            count -= 1;
        }
        while count > 0 {
            if self.block_pos == self.block.len() {
                self.load_block()?;
            }
            let n = count.min(self.block.len() - self.block_pos);
            self.block_pos += n;
            self.values_left -= n;
            count -= n;
        }
        Ok(())
    }
}

fn read_usize(reader: &mut BitReader, operation: &'static str) -> Result<usize> {
    let offset = reader.byte_offset();
    let value = reader.get_vlq_int()?;
    usize::try_from(value).map_err(|_| {
        ParquetError::decoding(offset, operation, format!("{} does not fit in usize", value))
    })
}

fn narrow<T: DeltaInt>(value: i64, offset: usize, operation: &'static str) -> Result<T> {
    T::narrow(value).ok_or_else(|| {
        ParquetError::decoding(
            offset,
            operation,
            format!("{} does not fit in {} bits", value, T::BITS),
        )
    })
}

fn check_width<T: DeltaInt>(width: u8, offset: usize) -> Result<()> {
    if width > T::BITS {
        return Err(ParquetError::decoding(
            offset,
            "read miniblock bit width",
            format!("bit width {} exceeds {}", width, T::BITS),
        ));
    }
    Ok(())
}

/// [`ValuesWriter`] over a [`DeltaBitPackingEncoder`]
#[derive(Debug)]
pub struct DeltaBitPackingValuesWriter<T: DeltaInt> {
    encoder: DeltaBitPackingEncoder<T>,
}

impl<T: DeltaInt> DeltaBitPackingValuesWriter<T> {
    pub fn new(block_size: usize, miniblocks: usize) -> Result<Self> {
        Ok(Self {
            encoder: DeltaBitPackingEncoder::new(block_size, miniblocks)?,
        })
    }
}

/// [`ValuesReader`] over a [`DeltaBitPackingDecoder`]
#[derive(Debug, Default)]
pub struct DeltaBitPackingValuesReader<T: DeltaInt> {
    decoder: DeltaBitPackingDecoder<T>,
    remaining: usize,
}

impl<T: DeltaInt> DeltaBitPackingValuesReader<T> {
    pub fn new() -> Self {
        Self {
            decoder: DeltaBitPackingDecoder::new(),
            remaining: 0,
        }
    }

    fn bind(&mut self, value_count: usize, buffer: Bytes, offset: usize) -> Result<usize> {
        let end = self
            .decoder
            .init(buffer, offset)
            .in_encoding(Encoding::DeltaBinaryPacked)?;
        if self.decoder.total_values() != value_count {
            return Err(ParquetError::decoding(
                offset,
                "bind page",
                format!(
                    "page declares {} values but the stream holds {}",
                    value_count,
                    self.decoder.total_values()
                ),
            )
            .with_encoding(Encoding::DeltaBinaryPacked));
        }
        self.remaining = value_count;
        Ok(end)
    }

    fn next(&mut self, operation: &'static str) -> Result<T> {
        take_values(
            &mut self.remaining,
            1,
            self.decoder.byte_offset(),
            Encoding::DeltaBinaryPacked,
            operation,
        )?;
        self.decoder.get().in_encoding(Encoding::DeltaBinaryPacked)
    }

    fn skip_values(&mut self, count: usize) -> Result<()> {
        take_values(
            &mut self.remaining,
            count,
            self.decoder.byte_offset(),
            Encoding::DeltaBinaryPacked,
            "skip values",
        )?;
        self.decoder
            .skip(count)
            .in_encoding(Encoding::DeltaBinaryPacked)
    }
}

macro_rules! impl_delta_values {
    ($ty:ty, $write:ident, $read:ident, $read_batch:ident, $what:literal) => {
        impl ValuesWriter for DeltaBitPackingValuesWriter<$ty> {
            fn encoding(&self) -> Encoding {
                Encoding::DeltaBinaryPacked
            }

            fn $write(&mut self, value: $ty) -> Result<()> {
                self.encoder.put(value);
                Ok(())
            }

            fn num_buffered_values(&self) -> usize {
                self.encoder.len()
            }

            fn estimated_size(&self) -> usize {
                self.encoder.estimated_size()
            }

            fn finish_page(&mut self) -> Result<Bytes> {
                Ok(self.encoder.finish())
            }
        }

        impl ValuesReader for DeltaBitPackingValuesReader<$ty> {
            fn encoding(&self) -> Encoding {
                Encoding::DeltaBinaryPacked
            }

            fn init_from_page(
                &mut self,
                value_count: usize,
                buffer: Bytes,
                offset: usize,
            ) -> Result<usize> {
                self.bind(value_count, buffer, offset)
            }

            fn remaining(&self) -> usize {
                self.remaining
            }

            fn skip_n(&mut self, count: usize) -> Result<()> {
                self.skip_values(count)
            }

            fn $read(&mut self) -> Result<$ty> {
                self.next($what)
            }

            fn $read_batch(&mut self, out: &mut [$ty]) -> Result<()> {
                take_values(
                    &mut self.remaining,
                    out.len(),
                    self.decoder.byte_offset(),
                    Encoding::DeltaBinaryPacked,
                    $what,
                )?;
                self.decoder
                    .get_batch(out)
                    .in_encoding(Encoding::DeltaBinaryPacked)
            }
        }
    };
}

impl_delta_values!(i32, write_i32, read_i32, read_i32_batch, "read int32");
impl_delta_values!(i64, write_i64, read_i64, read_i64_batch, "read int64");
