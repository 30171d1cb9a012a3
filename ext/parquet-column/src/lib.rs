//! Column value encoding and decoding for Parquet
//!
//! `parquet-column` turns typed per-column value sequences into compact
//! binary pages and back, and evaluates filter predicates against page
//! statistics so that pages can be skipped without being decoded.
//!
//! # Key Components
//!
//! - **Values**: one reader/writer pair per encoding behind the
//!   [`values::ValuesReader`] and [`values::ValuesWriter`] traits
//!   - PLAIN, RLE/bit-packed hybrid, dictionary (with PLAIN fallback)
//!   - DELTA_BINARY_PACKED, DELTA_LENGTH_BYTE_ARRAY, DELTA_BYTE_ARRAY
//!   - Readers share the page buffer (`bytes::Bytes`) instead of copying it
//!
//! - **Pages**: [`page::ColumnChunk`] packs the pages of a column back to
//!   back; definition levels live in [`levels`]
//!
//! - **Writer / Reader**: [`writer::ColumnWriter`] assembles column chunks
//!   from [`ParquetValue`]s, [`reader::ColumnChunkReader`] iterates them with
//!   page skipping and page pruning
//!
//! - **Filter**: [`filter::FilterPredicate`] trees evaluated against rows or
//!   against [`statistics::ColumnStatistics`]
//!
//! - **Arrow / parquet-rs**: conversions in [`arrow_conversion`] and
//!   [`parquet_conversion`]
//!
//! # Example Usage
//!
//! ```
//! use parquet_column::filter::{gt, Verdict};
//! use parquet_column::{ColumnChunkReader, ColumnDescriptor, ColumnWriter, ParquetValue};
//! use parquet_column::{PhysicalType, WriterProperties};
//!
//! let descr = ColumnDescriptor::optional("score", PhysicalType::Int64)?;
//! let mut writer = ColumnWriter::new(descr, WriterProperties::default())?;
//! writer.write_all(&[ParquetValue::Int64(3), ParquetValue::Null, ParquetValue::Int64(8)])?;
//! let chunk = writer.close()?;
//!
//! let values = ColumnChunkReader::new(chunk)?
//!     .with_page_filter(gt("score", 5i64))
//!     .read_all()?;
//! assert_eq!(values.len(), 3);
//! # let _ = Verdict::Keep;
//! # Ok::<(), parquet_column::ParquetError>(())
//! ```

pub mod arrow_conversion;
pub mod bit_util;
pub mod encoding;
pub mod error;
pub mod filter;
pub mod levels;
pub mod page;
pub mod parquet_conversion;
pub mod reader;
pub mod schema;
pub mod statistics;
pub mod value;
pub mod values;
pub mod writer;

#[cfg(test)]
pub mod test_utils;

pub use encoding::Encoding;
pub use error::{DecodingError, ErrorContext, ParquetError, Result};
pub use filter::{FilterPredicate, Verdict};
pub use page::{ColumnChunk, Page, PageHeader, PageType};
pub use reader::ColumnChunkReader;
pub use schema::{ColumnDescriptor, PhysicalType, Schema, SchemaBuilder};
pub use statistics::{ColumnStatistics, StatisticsBuilder};
pub use value::ParquetValue;
pub use writer::{ColumnWriter, EncodingChoice, WriterProperties, WriterPropertiesBuilder};
