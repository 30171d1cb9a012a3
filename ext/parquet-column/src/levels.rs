//! Definition and repetition level streams.
//!
//! Levels are stored as a length-prefixed RLE/bit-packed hybrid stream with
//! bit width `num_required_bits(max_level)`. A column whose max level is 0
//! stores no stream at all.

use bytes::Bytes;

use crate::bit_util;
use crate::values::rle::{read_length_prefix, write_length_prefixed, RleDecoder, RleEncoder};
use crate::{ErrorContext, Encoding, ParquetError, Result};

/// Bit width of a level stream with the given maximum level
pub fn level_bit_width(max_level: i16) -> u8 {
    bit_util::num_required_bits(max_level.max(0) as u64)
}

/// Encodes a sequence of levels for one page
#[derive(Debug)]
pub struct LevelEncoder {
    max_level: i16,
    encoder: RleEncoder,
    num_levels: usize,
}

impl LevelEncoder {
    pub fn new(max_level: i16) -> Self {
        Self {
            max_level,
            encoder: RleEncoder::new(level_bit_width(max_level)),
            num_levels: 0,
        }
    }

    pub fn max_level(&self) -> i16 {
        self.max_level
    }

    pub fn len(&self) -> usize {
        self.num_levels
    }

    pub fn is_empty(&self) -> bool {
        self.num_levels == 0
    }

    pub fn put(&mut self, level: i16) -> Result<()> {
        if level < 0 || level > self.max_level {
            return Err(ParquetError::invalid_argument(format!(
                "level {} is outside 0..={}",
                level, self.max_level
            )));
        }
        self.encoder.put(level as u64);
        self.num_levels += 1;
        Ok(())
    }

    pub fn estimated_size(&self) -> usize {
        if self.max_level == 0 {
            0
        } else {
            4 + self.encoder.estimated_size()
        }
    }

    /// Finish the stream for the current page and reset the encoder
    pub fn finish(&mut self) -> Bytes {
        self.num_levels = 0;
        if self.max_level == 0 {
            return Bytes::new();
        }
        write_length_prefixed(&self.encoder.take())
    }
}

/// Decodes the level stream of one page
#[derive(Debug, Clone, Copy)]
pub struct LevelDecoder {
    max_level: i16,
}

impl LevelDecoder {
    pub fn new(max_level: i16) -> Self {
        Self { max_level }
    }

    pub fn max_level(&self) -> i16 {
        self.max_level
    }

    /// Decode `count` levels at `offset`, returning them with the offset
    /// following the stream
    pub fn decode(&self, buffer: &Bytes, offset: usize, count: usize) -> Result<(Vec<i16>, usize)> {
        decode_levels(self.max_level, buffer, offset, count)
    }
}

/// Decode `count` levels starting at `offset`. Returns the levels and the
/// offset following the stream.
pub fn decode_levels(
    max_level: i16,
    buffer: &Bytes,
    offset: usize,
    count: usize,
) -> Result<(Vec<i16>, usize)> {
    // page headers store the count as an i32
    if i32::try_from(count).is_err() {
        return Err(ParquetError::decoding(
            offset,
            "read levels",
            format!("{} levels exceed the page limit of {}", count, i32::MAX),
        ));
    }
    if max_level == 0 {
        return Ok((vec![0; count], offset));
    }
    let (start, end) = read_length_prefix(buffer, offset).in_encoding(Encoding::Rle)?;
    let mut decoder = RleDecoder::new(level_bit_width(max_level), buffer.clone(), start, end)?;

    // decode in batches so a short stream fails before its declared count is allocated
    let mut raw = [0u64; LEVEL_BATCH];
    let mut levels = Vec::with_capacity(count.min(LEVEL_BATCH));
    while levels.len() < count {
        let batch = &mut raw[..LEVEL_BATCH.min(count - levels.len())];
        decoder.get_batch(batch).in_encoding(Encoding::Rle)?;
        for &value in batch.iter() {
            if value > max_level as u64 {
                return Err(ParquetError::decoding(
                    start,
                    "read levels",
                    format!("level {} exceeds the maximum of {}", value, max_level),
                )
                .with_encoding(Encoding::Rle));
            }
            levels.push(value as i16);
        }
    }
    Ok((levels, end))
}

const LEVEL_BATCH: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_levels_round_trip() {
        let levels: Vec<i16> = (0..50).map(|i| if i % 5 == 0 { 0 } else { 1 }).collect();
        let mut encoder = LevelEncoder::new(1);
        for &l in &levels {
            encoder.put(l).unwrap();
        }
        assert_eq!(encoder.len(), 50);
        let stream = encoder.finish();
        assert!(encoder.is_empty());

        let (decoded, end) = decode_levels(1, &stream, 0, 50).unwrap();
        assert_eq!(decoded, levels);
        assert_eq!(end, stream.len());
    }

    #[test]
    fn test_max_level_zero_has_no_stream() {
        let mut encoder = LevelEncoder::new(0);
        encoder.put(0).unwrap();
        assert!(encoder.finish().is_empty());
        let (levels, end) = decode_levels(0, &Bytes::new(), 0, 3).unwrap();
        assert_eq!(levels, vec![0, 0, 0]);
        assert_eq!(end, 0);
    }

    #[test]
    fn test_out_of_range_levels() {
        let mut encoder = LevelEncoder::new(1);
        assert!(encoder.put(2).is_err());
        assert!(encoder.put(-1).is_err());

        // RLE run of 3 copies of level 3 at bit width 2, but max level 2
        let stream = Bytes::from_static(&[2, 0, 0, 0, 0x06, 0x03]);
        let err = decode_levels(2, &stream, 0, 3).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"));
    }

    #[test]
    fn test_short_stream_with_large_declared_count() {
        // a single 4-level RLE run while the page claims a billion levels
        let stream = Bytes::from_static(&[2, 0, 0, 0, 0x08, 0x01]);
        let err = decode_levels(1, &stream, 0, 1 << 30).unwrap_err();
        assert!(matches!(err, ParquetError::Decoding(_)));

        let err = decode_levels(0, &Bytes::new(), 0, 1 << 40).unwrap_err();
        assert!(err.to_string().contains("page limit"), "{}", err);
    }

    #[test]
    fn test_bit_widths() {
        assert_eq!(level_bit_width(0), 0);
        assert_eq!(level_bit_width(1), 1);
        assert_eq!(level_bit_width(3), 2);
        assert_eq!(level_bit_width(4), 3);
    }
}
