//! Typed value readers and writers for every supported encoding.
//!
//! A [`ValuesReader`] is bound to one page with
//! [`ValuesReader::init_from_page`] and then pulls typed values out of it; a
//! [`ValuesWriter`] accumulates typed values and turns them into an immutable
//! page payload with [`ValuesWriter::finish_page`]. The concrete codec is
//! selected from the page's [`Encoding`] by [`new_values_reader`] and
//! [`new_values_writer`].

pub mod delta;
pub mod delta_bytes;
pub mod dictionary;
pub mod plain;
pub mod rle;

use std::sync::Arc;

use bytes::Bytes;
use ordered_float::OrderedFloat;

use crate::writer::WriterProperties;
use crate::{
    ColumnDescriptor, DecodingError, Encoding, ParquetError, ParquetValue, PhysicalType, Result,
};

pub use delta::{DeltaBitPackingDecoder, DeltaBitPackingEncoder, DeltaBitPackingValuesReader,
    DeltaBitPackingValuesWriter};
pub use delta_bytes::{
    DeltaByteArrayReader, DeltaByteArrayWriter, DeltaLengthByteArrayValuesReader,
    DeltaLengthByteArrayValuesWriter,
};
pub use dictionary::{
    Dictionary, DictionaryValuesReader, DictionaryValuesWriter, FallbackValuesWriter,
};
pub use plain::{
    BooleanPlainValuesReader, BooleanPlainValuesWriter, FixedLenByteArrayPlainValuesReader,
    FixedLenByteArrayPlainValuesWriter, PlainValuesReader, PlainValuesWriter,
};
pub use rle::{RleDecoder, RleEncoder, RleValuesReader, RleValuesWriter};

fn unsupported_read(encoding: Encoding, what: &str) -> ParquetError {
    ParquetError::Unsupported(format!("{} reader cannot read {} values", encoding, what))
}

fn unsupported_write(encoding: Encoding, what: &str) -> ParquetError {
    ParquetError::Unsupported(format!("{} writer cannot write {} values", encoding, what))
}

/// Consumes `requested` values from a page's remaining count, failing when the
/// page would be read past its declared value count
pub(crate) fn take_values(
    remaining: &mut usize,
    requested: usize,
    offset: usize,
    encoding: Encoding,
    operation: &'static str,
) -> Result<()> {
    if requested > *remaining {
        return Err(DecodingError::new(
            offset,
            operation,
            format!(
                "read past the declared value count: requested {} but {} remain",
                requested, *remaining
            ),
        )
        .with_encoding(encoding)
        .into());
    }
    *remaining -= requested;
    Ok(())
}

/// Pull-based decoder over a single page.
///
/// Reads of a type the codec does not carry fail with
/// [`ParquetError::Unsupported`]. Reading or skipping past the value count
/// declared in `init_from_page` fails with a decoding error.
pub trait ValuesReader: Send {
    fn encoding(&self) -> Encoding;

    /// Bind the reader to `value_count` values starting at `offset` in
    /// `buffer`. Returns the offset immediately following this page's values
    /// so pages packed back to back can be chained.
    fn init_from_page(&mut self, value_count: usize, buffer: Bytes, offset: usize)
        -> Result<usize>;

    /// Values left to read in the current page
    fn remaining(&self) -> usize;

    /// Skip `count` values without materializing them
    fn skip_n(&mut self, count: usize) -> Result<()>;

    /// Skip one value
    fn skip(&mut self) -> Result<()> {
        self.skip_n(1)
    }

    fn read_boolean(&mut self) -> Result<bool> {
        Err(unsupported_read(self.encoding(), "boolean"))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Err(unsupported_read(self.encoding(), "int32"))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Err(unsupported_read(self.encoding(), "int64"))
    }

    fn read_f32(&mut self) -> Result<f32> {
        Err(unsupported_read(self.encoding(), "float"))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Err(unsupported_read(self.encoding(), "double"))
    }

    /// Read a variable or fixed-length byte array
    fn read_bytes(&mut self) -> Result<Bytes> {
        Err(unsupported_read(self.encoding(), "byte array"))
    }

    /// Read the next dictionary index without resolving it
    fn read_dictionary_id(&mut self) -> Result<u32> {
        Err(unsupported_read(self.encoding(), "dictionary id"))
    }

    fn read_boolean_batch(&mut self, out: &mut [bool]) -> Result<()> {
        for slot in out.iter_mut() {
            *slot = self.read_boolean()?;
        }
        Ok(())
    }

    fn read_i32_batch(&mut self, out: &mut [i32]) -> Result<()> {
        for slot in out.iter_mut() {
            *slot = self.read_i32()?;
        }
        Ok(())
    }

    fn read_i64_batch(&mut self, out: &mut [i64]) -> Result<()> {
        for slot in out.iter_mut() {
            *slot = self.read_i64()?;
        }
        Ok(())
    }

    fn read_f32_batch(&mut self, out: &mut [f32]) -> Result<()> {
        for slot in out.iter_mut() {
            *slot = self.read_f32()?;
        }
        Ok(())
    }

    fn read_f64_batch(&mut self, out: &mut [f64]) -> Result<()> {
        for slot in out.iter_mut() {
            *slot = self.read_f64()?;
        }
        Ok(())
    }

    fn read_bytes_batch(&mut self, out: &mut [Bytes]) -> Result<()> {
        for slot in out.iter_mut() {
            *slot = self.read_bytes()?;
        }
        Ok(())
    }
}

/// Push-based encoder producing one page payload at a time
pub trait ValuesWriter: Send {
    /// Encoding of the page that `finish_page` would produce now
    fn encoding(&self) -> Encoding;

    fn write_boolean(&mut self, _value: bool) -> Result<()> {
        Err(unsupported_write(self.encoding(), "boolean"))
    }

    fn write_i32(&mut self, _value: i32) -> Result<()> {
        Err(unsupported_write(self.encoding(), "int32"))
    }

    fn write_i64(&mut self, _value: i64) -> Result<()> {
        Err(unsupported_write(self.encoding(), "int64"))
    }

    fn write_f32(&mut self, _value: f32) -> Result<()> {
        Err(unsupported_write(self.encoding(), "float"))
    }

    fn write_f64(&mut self, _value: f64) -> Result<()> {
        Err(unsupported_write(self.encoding(), "double"))
    }

    fn write_bytes(&mut self, _value: &[u8]) -> Result<()> {
        Err(unsupported_write(self.encoding(), "byte array"))
    }

    /// Values written since the last `finish_page`
    fn num_buffered_values(&self) -> usize;

    /// Approximate payload size of the buffered values in bytes
    fn estimated_size(&self) -> usize;

    /// Finalize the buffered values into an immutable page payload and reset
    /// the writer for the next page
    fn finish_page(&mut self) -> Result<Bytes>;

    /// The dictionary page backing the pages written so far, if any
    fn dictionary_page(&mut self) -> Result<Option<DictionaryPageData>> {
        Ok(None)
    }
}

/// PLAIN-encoded dictionary entries ready to be framed as a dictionary page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryPageData {
    pub buffer: Bytes,
    pub num_values: usize,
}

/// Create a reader for pages of `descr` stored with `encoding`.
///
/// Dictionary encodings require the decoded dictionary of the column chunk.
pub fn new_values_reader(
    descr: &ColumnDescriptor,
    encoding: Encoding,
    dictionary: Option<Arc<Dictionary>>,
) -> Result<Box<dyn ValuesReader>> {
    let physical_type = descr.physical_type();
    encoding.check_supports(&physical_type)?;

    let reader: Box<dyn ValuesReader> = match encoding {
        Encoding::Plain => match physical_type {
            PhysicalType::Boolean => Box::new(BooleanPlainValuesReader::new()),
            PhysicalType::FixedLenByteArray(len) => {
                Box::new(FixedLenByteArrayPlainValuesReader::new(len)?)
            }
            other => Box::new(PlainValuesReader::new(other)?),
        },
        Encoding::Rle => Box::new(RleValuesReader::new(1)),
        Encoding::PlainDictionary | Encoding::RleDictionary => {
            let dictionary = dictionary.ok_or_else(|| {
                ParquetError::Configuration(format!(
                    "Column '{}' uses {} but no dictionary was supplied",
                    descr.name(),
                    encoding
                ))
            })?;
            Box::new(DictionaryValuesReader::new(dictionary, encoding))
        }
        Encoding::DeltaBinaryPacked => match physical_type {
            PhysicalType::Int32 => Box::new(DeltaBitPackingValuesReader::<i32>::new()),
            _ => Box::new(DeltaBitPackingValuesReader::<i64>::new()),
        },
        Encoding::DeltaLengthByteArray => Box::new(DeltaLengthByteArrayValuesReader::new()),
        Encoding::DeltaByteArray => Box::new(DeltaByteArrayReader::new()),
    };
    Ok(reader)
}

/// Create a writer for values of `descr` encoded with `encoding`.
///
/// Dictionary encodings are wrapped in a [`FallbackValuesWriter`] that
/// switches to PLAIN once the dictionary limits in `props` are exceeded.
pub fn new_values_writer(
    descr: &ColumnDescriptor,
    encoding: Encoding,
    props: &WriterProperties,
) -> Result<Box<dyn ValuesWriter>> {
    let physical_type = descr.physical_type();
    encoding.check_supports(&physical_type)?;

    let writer: Box<dyn ValuesWriter> = match encoding {
        Encoding::Plain => new_plain_writer(physical_type)?,
        Encoding::Rle => Box::new(RleValuesWriter::new(1)),
        Encoding::PlainDictionary | Encoding::RleDictionary => Box::new(FallbackValuesWriter::new(
            DictionaryValuesWriter::new(
                physical_type,
                encoding,
                props.max_dictionary_entries(),
                props.max_dictionary_bytes(),
            ),
            new_plain_writer(physical_type)?,
        )),
        Encoding::DeltaBinaryPacked => {
            let block_size = props.delta_block_size();
            let miniblocks = props.delta_miniblocks_per_block();
            match physical_type {
                PhysicalType::Int32 => {
                    Box::new(DeltaBitPackingValuesWriter::<i32>::new(block_size, miniblocks)?)
                }
                _ => Box::new(DeltaBitPackingValuesWriter::<i64>::new(block_size, miniblocks)?),
            }
        }
        Encoding::DeltaLengthByteArray => Box::new(DeltaLengthByteArrayValuesWriter::new()),
        Encoding::DeltaByteArray => Box::new(DeltaByteArrayWriter::new(physical_type)),
    };
    Ok(writer)
}

pub(crate) fn new_plain_writer(physical_type: PhysicalType) -> Result<Box<dyn ValuesWriter>> {
    Ok(match physical_type {
        PhysicalType::Boolean => Box::new(BooleanPlainValuesWriter::new()),
        PhysicalType::FixedLenByteArray(len) => {
            Box::new(FixedLenByteArrayPlainValuesWriter::new(len)?)
        }
        other => Box::new(PlainValuesWriter::new(other)?),
    })
}

/// Read the next value as a [`ParquetValue`] of `physical_type`
pub fn read_value(
    reader: &mut dyn ValuesReader,
    physical_type: PhysicalType,
) -> Result<ParquetValue> {
    Ok(match physical_type {
        PhysicalType::Boolean => ParquetValue::Boolean(reader.read_boolean()?),
        PhysicalType::Int32 => ParquetValue::Int32(reader.read_i32()?),
        PhysicalType::Int64 => ParquetValue::Int64(reader.read_i64()?),
        PhysicalType::Float => ParquetValue::Float32(OrderedFloat(reader.read_f32()?)),
        PhysicalType::Double => ParquetValue::Float64(OrderedFloat(reader.read_f64()?)),
        PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_) => {
            ParquetValue::Bytes(reader.read_bytes()?)
        }
    })
}

/// Write a non-null [`ParquetValue`] through the typed writer methods
pub fn write_value(writer: &mut dyn ValuesWriter, value: &ParquetValue) -> Result<()> {
    match value {
        ParquetValue::Boolean(b) => writer.write_boolean(*b),
        ParquetValue::Int32(v) => writer.write_i32(*v),
        ParquetValue::Int64(v) => writer.write_i64(*v),
        ParquetValue::Float32(v) => writer.write_f32(v.0),
        ParquetValue::Float64(v) => writer.write_f64(v.0),
        ParquetValue::Bytes(b) => writer.write_bytes(b),
        ParquetValue::Null => Err(ParquetError::invalid_argument(
            "Null values are carried by definition levels, not value pages",
        )),
    }
}
