//! RLE / bit-packing hybrid encoding.
//!
//! A stream is a sequence of runs, each introduced by a ULEB128 header:
//!
//! ```text
//! rle-run        := <(len << 1)> <value padded to ceil(bit_width / 8) bytes, LE>
//! bit-packed-run := <(groups << 1) | 1> <groups * 8 values, LSB-first>
//! ```
//!
//! The same stream carries dictionary indices, definition levels and RLE
//! booleans. The standalone value page and level streams are prefixed with a
//! 4-byte little-endian length.

use std::mem;

use bytes::{BufMut, Bytes, BytesMut};

use crate::bit_util::{self, BitReader, BitWriter};
use crate::values::{take_values, ValuesReader, ValuesWriter};
use crate::{Encoding, ErrorContext, ParquetError, Result};

/// A bit-packed run holds at most 63 groups so its header fits one byte
const MAX_GROUPS_PER_BIT_PACKED_RUN: usize = 64;

/// Minimum number of repeats that is emitted as an RLE run
const MIN_RLE_RUN: usize = 8;

/// Encodes unsigned integers of a fixed bit width as an RLE/bit-packed
/// hybrid stream.
///
/// Values are buffered in groups of eight. A group that repeats a single
/// value at least eight times becomes an RLE run; everything else goes into
/// a bit-packed run whose header byte is reserved up front and patched once
/// the run closes.
#[derive(Debug)]
pub struct RleEncoder {
    bit_width: u8,
    bit_writer: BitWriter,
    buffered_values: [u64; 8],
    num_buffered_values: usize,
    current_value: u64,
    repeat_count: usize,
    // Values already written into the open bit-packed run
    bit_packed_count: usize,
    indicator_byte_pos: Option<usize>,
}

impl RleEncoder {
    pub fn new(bit_width: u8) -> Self {
        debug_assert!(bit_width <= 64);
        Self {
            bit_width,
            bit_writer: BitWriter::new(),
            buffered_values: [0; 8],
            num_buffered_values: 0,
            current_value: 0,
            repeat_count: 0,
            bit_packed_count: 0,
            indicator_byte_pos: None,
        }
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    /// Approximate size of the stream if it were flushed now
    pub fn estimated_size(&self) -> usize {
        self.bit_writer.bytes_written()
            + bit_util::ceil(self.num_buffered_values * self.bit_width as usize, 8)
            + 1
            + bit_util::ceil(self.bit_width as usize, 8)
    }

    pub fn put(&mut self, value: u64) {
        if self.current_value == value {
            self.repeat_count += 1;
            if self.repeat_count > MIN_RLE_RUN {
                // extends the pending RLE run
                return;
            }
        } else {
            if self.repeat_count >= MIN_RLE_RUN {
                debug_assert_eq!(self.bit_packed_count, 0);
                self.flush_rle_run();
            }
            self.repeat_count = 1;
            self.current_value = value;
        }

        self.buffered_values[self.num_buffered_values] = value;
        self.num_buffered_values += 1;
        if self.num_buffered_values == 8 {
            debug_assert_eq!(self.bit_packed_count % 8, 0);
            self.flush_buffered_values();
        }
    }

    /// Closes every open run. The last bit-packed group is padded with zeros.
    pub fn flush(&mut self) {
        if self.bit_packed_count == 0 && self.repeat_count == 0 && self.num_buffered_values == 0 {
            return;
        }
        let all_repeat = self.bit_packed_count == 0
            && (self.repeat_count == self.num_buffered_values || self.num_buffered_values == 0);
        if self.repeat_count > 0 && all_repeat {
            self.flush_rle_run();
        } else {
            if self.num_buffered_values > 0 {
                while self.num_buffered_values < 8 {
                    self.buffered_values[self.num_buffered_values] = 0;
                    self.num_buffered_values += 1;
                }
            }
            self.bit_packed_count += self.num_buffered_values;
            self.flush_bit_packed_run(true);
            self.repeat_count = 0;
        }
    }

    /// Flushes and returns the encoded stream, leaving the encoder empty
    pub fn take(&mut self) -> Vec<u8> {
        self.flush();
        let writer = mem::take(&mut self.bit_writer);
        self.current_value = 0;
        self.repeat_count = 0;
        self.bit_packed_count = 0;
        self.num_buffered_values = 0;
        self.indicator_byte_pos = None;
        writer.consume()
    }

    pub fn consume(mut self) -> Vec<u8> {
        self.take()
    }

    fn flush_rle_run(&mut self) {
        debug_assert!(self.repeat_count > 0);
        self.bit_writer.put_vlq_int((self.repeat_count as u64) << 1);
        self.bit_writer.put_aligned(
            self.current_value,
            bit_util::ceil(self.bit_width as usize, 8),
        );
        self.num_buffered_values = 0;
        self.repeat_count = 0;
    }

    fn flush_bit_packed_run(&mut self, update_indicator_byte: bool) {
        let indicator_pos = match self.indicator_byte_pos {
            Some(pos) => pos,
            None => {
                let pos = self.bit_writer.skip(1);
                self.indicator_byte_pos = Some(pos);
                pos
            }
        };

        for value in &self.buffered_values[..self.num_buffered_values] {
            self.bit_writer.put_value(*value, self.bit_width as usize);
        }
        self.num_buffered_values = 0;

        if update_indicator_byte {
            let num_groups = self.bit_packed_count / 8;
            self.bit_writer
                .put_aligned_offset(((num_groups << 1) | 1) as u8, indicator_pos);
            self.indicator_byte_pos = None;
            self.bit_packed_count = 0;
        }
    }

    fn flush_buffered_values(&mut self) {
        if self.repeat_count >= MIN_RLE_RUN {
            // the whole group turns into an RLE run; close any bit-packed run first
            self.num_buffered_values = 0;
            if self.bit_packed_count > 0 {
                self.flush_bit_packed_run(true);
            }
            return;
        }

        self.bit_packed_count += self.num_buffered_values;
        let num_groups = self.bit_packed_count / 8;
        if num_groups + 1 >= MAX_GROUPS_PER_BIT_PACKED_RUN {
            self.flush_bit_packed_run(true);
        } else {
            self.flush_bit_packed_run(false);
        }
        self.repeat_count = 0;
    }
}

/// Decodes an RLE/bit-packed hybrid stream
#[derive(Debug, Clone)]
pub struct RleDecoder {
    bit_width: u8,
    reader: BitReader,
    rle_left: usize,
    bit_packed_left: usize,
    current_value: u64,
}

impl RleDecoder {
    /// Create a decoder over `buffer[start..end]`
    pub fn new(bit_width: u8, buffer: Bytes, start: usize, end: usize) -> Result<Self> {
        if bit_width > 64 {
            return Err(ParquetError::decoding(
                start,
                "bind hybrid decoder",
                format!("bit width {} exceeds 64", bit_width),
            ));
        }
        Ok(Self {
            bit_width,
            reader: BitReader::new(buffer, start, end)?,
            rle_left: 0,
            bit_packed_left: 0,
            current_value: 0,
        })
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    /// Offset of the next unread byte in the page buffer
    pub fn byte_offset(&self) -> usize {
        self.reader.byte_offset()
    }

    fn reload(&mut self) -> Result<()> {
        let header_offset = self.reader.byte_offset();
        let indicator = self.reader.get_vlq_int()?;
        let run_len = usize::try_from(indicator >> 1).ok();

        if indicator & 1 == 1 {
            let values = run_len.and_then(|groups| groups.checked_mul(8));
            match values {
                Some(count) if count > 0 => self.bit_packed_left = count,
                _ => {
                    return Err(ParquetError::decoding(
                        header_offset,
                        "read run header",
                        format!("invalid bit-packed run header {}", indicator),
                    ))
                }
            }
        } else {
            match run_len {
                Some(count) if count > 0 => self.rle_left = count,
                _ => {
                    return Err(ParquetError::decoding(
                        header_offset,
                        "read run header",
                        format!("invalid RLE run header {}", indicator),
                    ))
                }
            }
            let value_offset = self.reader.byte_offset();
            let value = self
                .reader
                .get_aligned(bit_util::ceil(self.bit_width as usize, 8))?;
            if self.bit_width < 64 && value >> self.bit_width != 0 {
                return Err(ParquetError::decoding(
                    value_offset,
                    "read run value",
                    format!("value {} does not fit in {} bits", value, self.bit_width),
                ));
            }
            self.current_value = value;
        }
        Ok(())
    }

    /// Decode the next value
    pub fn get(&mut self) -> Result<u64> {
        if self.rle_left == 0 && self.bit_packed_left == 0 {
            self.reload()?;
        }
        if self.rle_left > 0 {
            self.rle_left -= 1;
            Ok(self.current_value)
        } else {
            self.bit_packed_left -= 1;
            self.reader.get_value(self.bit_width as usize)
        }
    }

    /// Decode `out.len()` values
    pub fn get_batch(&mut self, out: &mut [u64]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            if self.rle_left == 0 && self.bit_packed_left == 0 {
                self.reload()?;
            }
            if self.rle_left > 0 {
                let n = self.rle_left.min(out.len() - filled);
                out[filled..filled + n].fill(self.current_value);
                self.rle_left -= n;
                filled += n;
            } else {
                let n = self.bit_packed_left.min(out.len() - filled);
                bit_util::unpack_values(
                    &mut self.reader,
                    self.bit_width,
                    &mut out[filled..filled + n],
                )?;
                self.bit_packed_left -= n;
                filled += n;
            }
        }
        Ok(())
    }

    /// Skip `count` values without unpacking them
    pub fn skip(&mut self, mut count: usize) -> Result<()> {
        while count > 0 {
            if self.rle_left == 0 && self.bit_packed_left == 0 {
                self.reload()?;
            }
            if self.rle_left > 0 {
                let n = self.rle_left.min(count);
                self.rle_left -= n;
                count -= n;
            } else {
                let n = self.bit_packed_left.min(count);
                self.reader.skip_values(n, self.bit_width as usize)?;
                self.bit_packed_left -= n;
                count -= n;
            }
        }
        Ok(())
    }
}

/// Finds the end of a hybrid stream holding at least `value_count` values
/// that starts at `start`. Bit-packed runs must be complete.
pub fn hybrid_stream_end(
    buffer: &Bytes,
    start: usize,
    end: usize,
    bit_width: u8,
    value_count: usize,
) -> Result<usize> {
    let mut reader = BitReader::new(buffer.clone(), start, end)?;
    let mut covered = 0usize;
    while covered < value_count {
        let header_offset = reader.byte_offset();
        let indicator = reader.get_vlq_int()?;
        let run_len = usize::try_from(indicator >> 1).unwrap_or(0);
        if run_len == 0 {
            return Err(ParquetError::decoding(
                header_offset,
                "scan hybrid stream",
                format!("invalid run header {}", indicator),
            ));
        }
        if indicator & 1 == 1 {
            let run_bytes = run_len.checked_mul(bit_width as usize).ok_or_else(|| {
                ParquetError::decoding(header_offset, "scan hybrid stream", "run length overflows")
            })?;
            reader.skip_bytes(run_bytes)?;
            covered = covered.saturating_add(run_len.saturating_mul(8));
        } else {
            reader.skip_bytes(bit_util::ceil(bit_width as usize, 8))?;
            covered = covered.saturating_add(run_len);
        }
    }
    Ok(reader.byte_offset())
}

/// Reads the 4-byte little-endian length that prefixes standalone hybrid
/// streams. Returns the stream's `(start, end)` offsets.
pub(crate) fn read_length_prefix(buffer: &Bytes, offset: usize) -> Result<(usize, usize)> {
    let mut reader = BitReader::new(buffer.clone(), offset, buffer.len())?;
    let len = reader.get_aligned(4)? as usize;
    let start = offset + 4;
    match start.checked_add(len) {
        Some(end) if end <= buffer.len() => Ok((start, end)),
        _ => Err(ParquetError::decoding(
            offset,
            "read length prefix",
            format!(
                "stream of {} bytes overruns a {} byte buffer",
                len,
                buffer.len()
            ),
        )),
    }
}

/// Writes `data` prefixed with its 4-byte little-endian length
pub(crate) fn write_length_prefixed(data: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(data.len() + 4);
    out.put_u32_le(data.len() as u32);
    out.put_slice(data);
    out.freeze()
}

/// Writes booleans, or small non-negative integers, as a length-prefixed
/// hybrid stream (the `RLE` value encoding)
#[derive(Debug)]
pub struct RleValuesWriter {
    encoder: RleEncoder,
    num_values: usize,
}

impl RleValuesWriter {
    pub fn new(bit_width: u8) -> Self {
        Self {
            encoder: RleEncoder::new(bit_width),
            num_values: 0,
        }
    }
}

impl ValuesWriter for RleValuesWriter {
    fn encoding(&self) -> Encoding {
        Encoding::Rle
    }

    fn write_boolean(&mut self, value: bool) -> Result<()> {
        self.encoder.put(value as u64);
        self.num_values += 1;
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        let bit_width = self.encoder.bit_width();
        if value < 0 || bit_util::num_required_bits(value as u64) > bit_width {
            return Err(ParquetError::invalid_argument(format!(
                "value {} cannot be RLE-encoded at bit width {}",
                value, bit_width
            )));
        }
        self.encoder.put(value as u64);
        self.num_values += 1;
        Ok(())
    }

    fn num_buffered_values(&self) -> usize {
        self.num_values
    }

    fn estimated_size(&self) -> usize {
        4 + self.encoder.estimated_size()
    }

    fn finish_page(&mut self) -> Result<Bytes> {
        let data = self.encoder.take();
        self.num_values = 0;
        Ok(write_length_prefixed(&data))
    }
}

/// Reads a length-prefixed hybrid stream of booleans or small integers
#[derive(Debug)]
pub struct RleValuesReader {
    bit_width: u8,
    decoder: Option<RleDecoder>,
    remaining: usize,
}

impl RleValuesReader {
    pub fn new(bit_width: u8) -> Self {
        Self {
            bit_width,
            decoder: None,
            remaining: 0,
        }
    }

    fn next_value(&mut self, operation: &'static str) -> Result<u64> {
        let decoder = self.decoder.as_mut().ok_or_else(|| {
            ParquetError::internal("RLE reader used before init_from_page")
        })?;
        take_values(
            &mut self.remaining,
            1,
            decoder.byte_offset(),
            Encoding::Rle,
            operation,
        )?;
        decoder.get().in_encoding(Encoding::Rle)
    }
}

impl ValuesReader for RleValuesReader {
    fn encoding(&self) -> Encoding {
        Encoding::Rle
    }

    fn init_from_page(
        &mut self,
        value_count: usize,
        buffer: Bytes,
        offset: usize,
    ) -> Result<usize> {
        let (start, end) = read_length_prefix(&buffer, offset).in_encoding(Encoding::Rle)?;
        self.decoder = Some(RleDecoder::new(self.bit_width, buffer, start, end)?);
        self.remaining = value_count;
        Ok(end)
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn skip_n(&mut self, count: usize) -> Result<()> {
        let decoder = self.decoder.as_mut().ok_or_else(|| {
            ParquetError::internal("RLE reader used before init_from_page")
        })?;
        take_values(
            &mut self.remaining,
            count,
            decoder.byte_offset(),
            Encoding::Rle,
            "skip values",
        )?;
        decoder.skip(count).in_encoding(Encoding::Rle)
    }

    fn read_boolean(&mut self) -> Result<bool> {
        Ok(self.next_value("read boolean")? != 0)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.next_value("read int32")? as i32)
    }

    fn read_boolean_batch(&mut self, out: &mut [bool]) -> Result<()> {
        let mut raw = vec![0u64; out.len()];
        let decoder = self.decoder.as_mut().ok_or_else(|| {
            ParquetError::internal("RLE reader used before init_from_page")
        })?;
        take_values(
            &mut self.remaining,
            out.len(),
            decoder.byte_offset(),
            Encoding::Rle,
            "read boolean",
        )?;
        decoder.get_batch(&mut raw).in_encoding(Encoding::Rle)?;
        for (slot, value) in out.iter_mut().zip(raw) {
            *slot = value != 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(values: &[u64], bit_width: u8) -> Vec<u8> {
        let mut encoder = RleEncoder::new(bit_width);
        for &v in values {
            encoder.put(v);
        }
        encoder.consume()
    }

    fn decode(data: Vec<u8>, bit_width: u8, count: usize) -> Vec<u64> {
        let buffer = Bytes::from(data);
        let len = buffer.len();
        let mut decoder = RleDecoder::new(bit_width, buffer, 0, len).unwrap();
        let mut out = vec![0; count];
        decoder.get_batch(&mut out).unwrap();
        out
    }

    #[test]
    fn test_rle_then_bit_packed_layout() {
        let mut values = vec![5u64; 8];
        values.extend(0..8);
        let data = encode(&values, 3);
        assert_eq!(data, vec![0x10, 0x05, 0x03, 0x88, 0xC6, 0xFA]);
        assert_eq!(decode(data, 3, 16), values);
    }

    #[test]
    fn test_single_long_run() {
        let data = encode(&[1; 100], 1);
        // (100 << 1) as varint, then one value byte
        assert_eq!(data, vec![0xC8, 0x01, 0x01]);
        assert_eq!(decode(data, 1, 100), vec![1; 100]);
    }

    #[test]
    fn test_short_tail_is_zero_padded() {
        let values = vec![1, 2, 3];
        let data = encode(&values, 2);
        // one bit-packed group: header then 2 bytes
        assert_eq!(data.len(), 3);
        assert_eq!(data[0], 0x03);
        let decoded = decode(data, 2, 8);
        assert_eq!(&decoded[..3], &values[..]);
        assert_eq!(&decoded[3..], &[0; 5]);
    }

    #[test]
    fn test_long_bit_packed_runs_split() {
        let values: Vec<u64> = (0..1000).map(|i| i % 7).collect();
        let data = encode(&values, 3);
        // a run holds at most 63 groups
        assert_eq!(data[0], (63 << 1) | 1);
        assert_eq!(decode(data, 3, 1000), values);
    }

    #[test]
    fn test_zero_bit_width() {
        let data = encode(&[0; 20], 0);
        assert_eq!(decode(data, 0, 20), vec![0; 20]);
    }

    #[test]
    fn test_skip_across_runs() {
        let mut values = vec![9u64; 30];
        values.extend((0..50).map(|i| i % 4));
        values.extend(vec![2u64; 40]);
        let data = Bytes::from(encode(&values, 4));
        let len = data.len();
        let mut decoder = RleDecoder::new(4, data, 0, len).unwrap();
        decoder.skip(25).unwrap();
        assert_eq!(decoder.get().unwrap(), 9);
        decoder.skip(10).unwrap();
        assert_eq!(decoder.get().unwrap(), values[36]);
        decoder.skip(50).unwrap();
        assert_eq!(decoder.get().unwrap(), 2);
    }

    #[test]
    fn test_truncated_stream_errors() {
        let mut data = encode(&(0..16).collect::<Vec<_>>(), 4);
        data.truncate(4);
        let buffer = Bytes::from(data);
        let mut decoder = RleDecoder::new(4, buffer, 0, 4).unwrap();
        let mut out = vec![0; 16];
        let err = decoder.get_batch(&mut out).unwrap_err();
        assert!(err.as_decoding().is_some());
    }

    #[test]
    fn test_run_value_wider_than_bit_width() {
        // RLE run of 4 copies of 0xFF at bit width 2
        let buffer = Bytes::from_static(&[0x08, 0xFF]);
        let mut decoder = RleDecoder::new(2, buffer, 0, 2).unwrap();
        let err = decoder.get().unwrap_err();
        assert_eq!(err.as_decoding().unwrap().offset, 1);
    }

    #[test]
    fn test_stream_end_scan() {
        let mut values = vec![3u64; 12];
        values.extend((0..9).map(|i| i % 4));
        let data = encode(&values, 2);
        let len = data.len();
        let mut padded = data.clone();
        padded.extend_from_slice(&[0xAA, 0xBB]);
        let buffer = Bytes::from(padded);
        assert_eq!(
            hybrid_stream_end(&buffer, 0, buffer.len(), 2, values.len()).unwrap(),
            len
        );
    }

    #[test]
    fn test_boolean_values_round_trip() {
        let bools: Vec<bool> = (0..37).map(|i| i % 3 == 0 || i > 30).collect();
        let mut writer = RleValuesWriter::new(1);
        for &b in &bools {
            writer.write_boolean(b).unwrap();
        }
        assert_eq!(writer.num_buffered_values(), 37);
        let page = writer.finish_page().unwrap();
        assert_eq!(writer.num_buffered_values(), 0);

        let mut reader = RleValuesReader::new(1);
        let end = reader.init_from_page(37, page.clone(), 0).unwrap();
        assert_eq!(end, page.len());
        let mut out = vec![false; 30];
        reader.read_boolean_batch(&mut out).unwrap();
        assert_eq!(&out[..], &bools[..30]);
        reader.skip_n(2).unwrap();
        assert_eq!(reader.read_boolean().unwrap(), bools[32]);
        assert_eq!(reader.remaining(), 4);
        reader.skip_n(4).unwrap();
        assert!(reader.read_boolean().is_err());
    }

    #[test]
    fn test_length_prefix_overrun() {
        let buffer = Bytes::from_static(&[10, 0, 0, 0, 1, 2]);
        let err = RleValuesReader::new(1)
            .init_from_page(2, buffer, 0)
            .unwrap_err();
        let decoding = err.as_decoding().unwrap();
        assert_eq!(decoding.encoding, Some(Encoding::Rle));
        assert_eq!(decoding.offset, 0);
    }

    #[test]
    fn test_levels_reject_out_of_range() {
        let mut writer = RleValuesWriter::new(1);
        writer.write_i32(1).unwrap();
        assert!(writer.write_i32(2).is_err());
        assert!(writer.write_i32(-1).is_err());
    }
}
