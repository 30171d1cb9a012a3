//! Dictionary encoding (`PLAIN_DICTIONARY` / `RLE_DICTIONARY`).
//!
//! Distinct values are collected in first-seen order and written once as a
//! PLAIN dictionary page. Data pages hold one bit-width byte followed by an
//! RLE/bit-packed hybrid stream of indices into that dictionary.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexSet;
use ordered_float::OrderedFloat;

use crate::bit_util;
use crate::values::rle::{hybrid_stream_end, RleDecoder, RleEncoder};
use crate::values::{
    new_values_reader, take_values, DictionaryPageData, ValuesReader, ValuesWriter,
};
use crate::{
    ColumnDescriptor, DecodingError, Encoding, ErrorContext, ParquetError, ParquetValue,
    PhysicalType, Result,
};

/// Decoded dictionary of a column chunk, shared read-only between the page
/// readers of that chunk
#[derive(Debug, Clone, PartialEq)]
pub enum Dictionary {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    /// Variable or fixed-length byte arrays
    Bytes(Vec<Bytes>),
}

impl Dictionary {
    /// Decode a PLAIN dictionary page of `num_values` entries
    pub fn decode(page: Bytes, num_values: usize, descr: &ColumnDescriptor) -> Result<Self> {
        let physical_type = descr.physical_type();
        if physical_type == PhysicalType::Boolean {
            return Err(ParquetError::Configuration(format!(
                "Column '{}' is Boolean and cannot be dictionary-encoded",
                descr.name()
            )));
        }
        let mut reader = new_values_reader(descr, Encoding::Plain, None)?;
        reader.init_from_page(num_values, page, 0)?;

        Ok(match physical_type {
            PhysicalType::Int32 => {
                let mut values = vec![0; num_values];
                reader.read_i32_batch(&mut values)?;
                Dictionary::Int32(values)
            }
            PhysicalType::Int64 => {
                let mut values = vec![0; num_values];
                reader.read_i64_batch(&mut values)?;
                Dictionary::Int64(values)
            }
            PhysicalType::Float => {
                let mut values = vec![0.0; num_values];
                reader.read_f32_batch(&mut values)?;
                Dictionary::Float(values)
            }
            PhysicalType::Double => {
                let mut values = vec![0.0; num_values];
                reader.read_f64_batch(&mut values)?;
                Dictionary::Double(values)
            }
            _ => {
                let mut values = vec![Bytes::new(); num_values];
                reader.read_bytes_batch(&mut values)?;
                Dictionary::Bytes(values)
            }
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Dictionary::Int32(v) => v.len(),
            Dictionary::Int64(v) => v.len(),
            Dictionary::Float(v) => v.len(),
            Dictionary::Double(v) => v.len(),
            Dictionary::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an entry as a [`ParquetValue`]
    pub fn value(&self, index: usize) -> Option<ParquetValue> {
        match self {
            Dictionary::Int32(v) => v.get(index).map(|x| ParquetValue::Int32(*x)),
            Dictionary::Int64(v) => v.get(index).map(|x| ParquetValue::Int64(*x)),
            Dictionary::Float(v) => v.get(index).map(|x| ParquetValue::Float32(OrderedFloat(*x))),
            Dictionary::Double(v) => v.get(index).map(|x| ParquetValue::Float64(OrderedFloat(*x))),
            Dictionary::Bytes(v) => v.get(index).map(|x| ParquetValue::Bytes(x.clone())),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Dictionary::Int32(_) => "int32",
            Dictionary::Int64(_) => "int64",
            Dictionary::Float(_) => "float",
            Dictionary::Double(_) => "double",
            Dictionary::Bytes(_) => "byte array",
        }
    }
}

// Floats are keyed by bit pattern so -0.0/0.0 and NaN payloads stay distinct
#[derive(Debug)]
enum DictionaryEntries {
    Int32(IndexSet<i32>),
    Int64(IndexSet<i64>),
    Float(IndexSet<u32>),
    Double(IndexSet<u64>),
    Bytes(IndexSet<Bytes>),
}

impl DictionaryEntries {
    fn len(&self) -> usize {
        match self {
            DictionaryEntries::Int32(s) => s.len(),
            DictionaryEntries::Int64(s) => s.len(),
            DictionaryEntries::Float(s) => s.len(),
            DictionaryEntries::Double(s) => s.len(),
            DictionaryEntries::Bytes(s) => s.len(),
        }
    }

    /// Write entry `index` through the typed writer methods
    fn write_entry(&self, index: usize, writer: &mut dyn ValuesWriter) -> Result<()> {
        let missing = || ParquetError::internal(format!("dictionary index {} was never assigned", index));
        match self {
            DictionaryEntries::Int32(s) => writer.write_i32(*s.get_index(index).ok_or_else(missing)?),
            DictionaryEntries::Int64(s) => writer.write_i64(*s.get_index(index).ok_or_else(missing)?),
            DictionaryEntries::Float(s) => {
                writer.write_f32(f32::from_bits(*s.get_index(index).ok_or_else(missing)?))
            }
            DictionaryEntries::Double(s) => {
                writer.write_f64(f64::from_bits(*s.get_index(index).ok_or_else(missing)?))
            }
            DictionaryEntries::Bytes(s) => writer.write_bytes(s.get_index(index).ok_or_else(missing)?),
        }
    }
}

/// Builds a dictionary and encodes each page as indices into it.
///
/// Only entries referenced by finished pages are emitted in the dictionary
/// page.
#[derive(Debug)]
pub struct DictionaryValuesWriter {
    physical_type: PhysicalType,
    encoding: Encoding,
    entries: DictionaryEntries,
    dictionary_bytes: usize,
    max_entries: usize,
    max_bytes: usize,
    indices: Vec<u32>,
    // entries referenced by finished pages
    committed_entries: usize,
}

impl DictionaryValuesWriter {
    pub fn new(
        physical_type: PhysicalType,
        encoding: Encoding,
        max_entries: usize,
        max_bytes: usize,
    ) -> Self {
        let entries = match physical_type {
            PhysicalType::Int32 => DictionaryEntries::Int32(IndexSet::new()),
            PhysicalType::Int64 => DictionaryEntries::Int64(IndexSet::new()),
            PhysicalType::Float => DictionaryEntries::Float(IndexSet::new()),
            PhysicalType::Double => DictionaryEntries::Double(IndexSet::new()),
            _ => DictionaryEntries::Bytes(IndexSet::new()),
        };
        Self {
            physical_type,
            encoding,
            entries,
            dictionary_bytes: 0,
            max_entries,
            max_bytes,
            indices: Vec::new(),
            committed_entries: 0,
        }
    }

    /// Number of distinct values seen so far
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// PLAIN size of the dictionary built so far
    pub fn dictionary_bytes(&self) -> usize {
        self.dictionary_bytes
    }

    /// Check whether the dictionary has outgrown its configured limits
    pub fn is_over_limit(&self) -> bool {
        self.entries.len() > self.max_entries || self.dictionary_bytes > self.max_bytes
    }

    /// Check whether any finished page references the dictionary
    pub fn has_dictionary_pages(&self) -> bool {
        self.committed_entries > 0
    }

    fn push_index(&mut self, index: usize, inserted: bool, size: usize) {
        if inserted {
            self.dictionary_bytes += size;
        }
        self.indices.push(index as u32);
    }

    fn mismatch(&self, what: &str) -> ParquetError {
        ParquetError::Unsupported(format!(
            "{} writer for {} columns cannot write {} values",
            self.encoding,
            self.physical_type.type_name(),
            what
        ))
    }

    /// Write the values buffered for the current page, in their original
    /// order, into `writer` and drop them from this writer
    pub fn replay_into(&mut self, writer: &mut dyn ValuesWriter) -> Result<()> {
        for index in std::mem::take(&mut self.indices) {
            self.entries.write_entry(index as usize, writer)?;
        }
        Ok(())
    }
}

impl ValuesWriter for DictionaryValuesWriter {
    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        let (index, inserted) = match &mut self.entries {
            DictionaryEntries::Int32(set) => set.insert_full(value),
            _ => return Err(self.mismatch("int32")),
        };
        self.push_index(index, inserted, 4);
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        let (index, inserted) = match &mut self.entries {
            DictionaryEntries::Int64(set) => set.insert_full(value),
            _ => return Err(self.mismatch("int64")),
        };
        self.push_index(index, inserted, 8);
        Ok(())
    }

    fn write_f32(&mut self, value: f32) -> Result<()> {
        let (index, inserted) = match &mut self.entries {
            DictionaryEntries::Float(set) => set.insert_full(value.to_bits()),
            _ => return Err(self.mismatch("float")),
        };
        self.push_index(index, inserted, 4);
        Ok(())
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        let (index, inserted) = match &mut self.entries {
            DictionaryEntries::Double(set) => set.insert_full(value.to_bits()),
            _ => return Err(self.mismatch("double")),
        };
        self.push_index(index, inserted, 8);
        Ok(())
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        let size = match self.physical_type {
            PhysicalType::ByteArray => 4 + value.len(),
            PhysicalType::FixedLenByteArray(len) if len == value.len() => len,
            PhysicalType::FixedLenByteArray(len) => {
                return Err(ParquetError::invalid_argument(format!(
                    "expected a fixed-length value of {} bytes, got {}",
                    len,
                    value.len()
                )))
            }
            _ => return Err(self.mismatch("byte array")),
        };
        let (index, inserted) = match &mut self.entries {
            DictionaryEntries::Bytes(set) => match set.get_index_of(value) {
                Some(index) => (index, false),
                None => set.insert_full(Bytes::copy_from_slice(value)),
            },
            _ => return Err(self.mismatch("byte array")),
        };
        self.push_index(index, inserted, size);
        Ok(())
    }

    fn num_buffered_values(&self) -> usize {
        self.indices.len()
    }

    fn estimated_size(&self) -> usize {
        let bit_width = bit_util::index_bit_width(self.entries.len()) as usize;
        1 + bit_util::ceil(self.indices.len() * bit_width, 8) + 8
    }

    fn finish_page(&mut self) -> Result<Bytes> {
        let bit_width = bit_util::index_bit_width(self.entries.len());
        let mut encoder = RleEncoder::new(bit_width);
        for &index in &self.indices {
            encoder.put(index as u64);
        }
        let data = encoder.consume();

        let mut out = BytesMut::with_capacity(data.len() + 1);
        out.put_u8(bit_width);
        out.put_slice(&data);

        self.indices.clear();
        self.committed_entries = self.entries.len();
        Ok(out.freeze())
    }

    fn dictionary_page(&mut self) -> Result<Option<DictionaryPageData>> {
        if self.committed_entries == 0 {
            return Ok(None);
        }
        let mut plain = crate::values::new_plain_writer(self.physical_type)?;
        for index in 0..self.committed_entries {
            self.entries.write_entry(index, plain.as_mut())?;
        }
        Ok(Some(DictionaryPageData {
            buffer: plain.finish_page()?,
            num_values: self.committed_entries,
        }))
    }
}

/// Dictionary writer that switches to PLAIN once the dictionary outgrows its
/// limits.
///
/// On fallback the current page's buffered values are replayed into the
/// PLAIN writer in their original order; pages finished earlier stay
/// dictionary-encoded and the dictionary page is still produced for them.
pub struct FallbackValuesWriter {
    dictionary: DictionaryValuesWriter,
    plain: Box<dyn ValuesWriter>,
    fell_back: bool,
}

impl FallbackValuesWriter {
    pub fn new(dictionary: DictionaryValuesWriter, plain: Box<dyn ValuesWriter>) -> Self {
        Self {
            dictionary,
            plain,
            fell_back: false,
        }
    }

    pub fn has_fallen_back(&self) -> bool {
        self.fell_back
    }

    fn after_write(&mut self) -> Result<()> {
        if !self.fell_back && self.dictionary.is_over_limit() {
            self.dictionary.replay_into(self.plain.as_mut())?;
            self.fell_back = true;
        }
        Ok(())
    }
}

macro_rules! fallback_write {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self, value: $ty) -> Result<()> {
            if self.fell_back {
                return self.plain.$name(value);
            }
            self.dictionary.$name(value)?;
            self.after_write()
        }
    };
}

impl ValuesWriter for FallbackValuesWriter {
    fn encoding(&self) -> Encoding {
        if self.fell_back {
            self.plain.encoding()
        } else {
            self.dictionary.encoding()
        }
    }

    fallback_write!(write_i32, i32);
    fallback_write!(write_i64, i64);
    fallback_write!(write_f32, f32);
    fallback_write!(write_f64, f64);
    fallback_write!(write_bytes, &[u8]);

    fn num_buffered_values(&self) -> usize {
        if self.fell_back {
            self.plain.num_buffered_values()
        } else {
            self.dictionary.num_buffered_values()
        }
    }

    fn estimated_size(&self) -> usize {
        if self.fell_back {
            self.plain.estimated_size()
        } else {
            self.dictionary.estimated_size()
        }
    }

    fn finish_page(&mut self) -> Result<Bytes> {
        if self.fell_back {
            self.plain.finish_page()
        } else {
            self.dictionary.finish_page()
        }
    }

    fn dictionary_page(&mut self) -> Result<Option<DictionaryPageData>> {
        self.dictionary.dictionary_page()
    }
}

/// Reads dictionary-encoded data pages, resolving indices against a shared
/// [`Dictionary`]
#[derive(Debug)]
pub struct DictionaryValuesReader {
    dictionary: Arc<Dictionary>,
    encoding: Encoding,
    decoder: Option<RleDecoder>,
    remaining: usize,
}

impl DictionaryValuesReader {
    pub fn new(dictionary: Arc<Dictionary>, encoding: Encoding) -> Self {
        Self {
            dictionary,
            encoding,
            decoder: None,
            remaining: 0,
        }
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    fn decoder(&mut self) -> Result<&mut RleDecoder> {
        self.decoder
            .as_mut()
            .ok_or_else(|| ParquetError::internal("dictionary reader used before init_from_page"))
    }

    fn next_index(&mut self, operation: &'static str) -> Result<usize> {
        let encoding = self.encoding;
        let offset = self.decoder()?.byte_offset();
        take_values(&mut self.remaining, 1, offset, encoding, operation)?;
        let index = self.decoder()?.get().in_encoding(encoding)? as usize;
        self.check_index(index, offset, operation)?;
        Ok(index)
    }

    fn check_index(&self, index: usize, offset: usize, operation: &'static str) -> Result<()> {
        if index >= self.dictionary.len() {
            return Err(DecodingError::new(
                offset,
                operation,
                format!(
                    "dictionary index {} out of range for {} entries",
                    index,
                    self.dictionary.len()
                ),
            )
            .with_encoding(self.encoding)
            .into());
        }
        Ok(())
    }

    fn mismatch(&self, what: &str) -> ParquetError {
        ParquetError::Unsupported(format!(
            "{} dictionary cannot produce {} values",
            self.dictionary.kind(),
            what
        ))
    }
}

impl ValuesReader for DictionaryValuesReader {
    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn init_from_page(
        &mut self,
        value_count: usize,
        buffer: Bytes,
        offset: usize,
    ) -> Result<usize> {
        let bit_width = match buffer.get(offset) {
            Some(&width) => width,
            None => {
                return Err(DecodingError::new(offset, "read bit width", "page is empty")
                    .with_encoding(self.encoding)
                    .into())
            }
        };
        if bit_width > 32 {
            return Err(DecodingError::new(
                offset,
                "read bit width",
                format!("index bit width {} exceeds 32", bit_width),
            )
            .with_encoding(self.encoding)
            .into());
        }
        let start = offset + 1;
        let end = hybrid_stream_end(&buffer, start, buffer.len(), bit_width, value_count)
            .in_encoding(self.encoding)?;
        self.decoder = Some(RleDecoder::new(bit_width, buffer, start, end)?);
        self.remaining = value_count;
        Ok(end)
    }

    fn remaining(&self) -> usize {
        self.remaining
    }

    fn skip_n(&mut self, count: usize) -> Result<()> {
        let encoding = self.encoding;
        let offset = self.decoder()?.byte_offset();
        take_values(&mut self.remaining, count, offset, encoding, "skip values")?;
        self.decoder()?.skip(count).in_encoding(encoding)
    }

    fn read_dictionary_id(&mut self) -> Result<u32> {
        Ok(self.next_index("read dictionary id")? as u32)
    }

    fn read_i32(&mut self) -> Result<i32> {
        if !matches!(*self.dictionary, Dictionary::Int32(_)) {
            return Err(self.mismatch("int32"));
        }
        let index = self.next_index("read int32")?;
        match &*self.dictionary {
            Dictionary::Int32(v) => Ok(v[index]),
            _ => Err(self.mismatch("int32")),
        }
    }

    fn read_i64(&mut self) -> Result<i64> {
        if !matches!(*self.dictionary, Dictionary::Int64(_)) {
            return Err(self.mismatch("int64"));
        }
        let index = self.next_index("read int64")?;
        match &*self.dictionary {
            Dictionary::Int64(v) => Ok(v[index]),
            _ => Err(self.mismatch("int64")),
        }
    }

    fn read_f32(&mut self) -> Result<f32> {
        if !matches!(*self.dictionary, Dictionary::Float(_)) {
            return Err(self.mismatch("float"));
        }
        let index = self.next_index("read float")?;
        match &*self.dictionary {
            Dictionary::Float(v) => Ok(v[index]),
            _ => Err(self.mismatch("float")),
        }
    }

    fn read_f64(&mut self) -> Result<f64> {
        if !matches!(*self.dictionary, Dictionary::Double(_)) {
            return Err(self.mismatch("double"));
        }
        let index = self.next_index("read double")?;
        match &*self.dictionary {
            Dictionary::Double(v) => Ok(v[index]),
            _ => Err(self.mismatch("double")),
        }
    }

    fn read_bytes(&mut self) -> Result<Bytes> {
        if !matches!(*self.dictionary, Dictionary::Bytes(_)) {
            return Err(self.mismatch("byte array"));
        }
        let index = self.next_index("read byte array")?;
        match &*self.dictionary {
            Dictionary::Bytes(v) => Ok(v[index].clone()),
            _ => Err(self.mismatch("byte array")),
        }
    }
}
