//! Column chunk writing

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::levels::LevelEncoder;
use crate::page::{ColumnChunk, Page};
use crate::statistics::StatisticsBuilder;
use crate::values::{delta, new_values_writer, write_value, ValuesWriter};
use crate::{ColumnDescriptor, Encoding, ParquetError, ParquetValue, PhysicalType, Result};

// Default configuration constants
const DEFAULT_MAX_DICTIONARY_ENTRIES: usize = 65_536;
const DEFAULT_MAX_DICTIONARY_BYTES: usize = 1024 * 1024; // 1MB
const DEFAULT_DATA_PAGE_SIZE_LIMIT: usize = 1024 * 1024; // 1MB
const DEFAULT_DATA_PAGE_ROW_LIMIT: usize = 20_000;

/// How a column writer picks its value encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingChoice {
    /// PLAIN for booleans, RLE_DICTIONARY with PLAIN fallback otherwise
    #[default]
    Auto,
    /// Always use the given encoding
    Fixed(Encoding),
}

/// Settings shared by the column writers of a row group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterProperties {
    encoding: EncodingChoice,
    max_dictionary_entries: usize,
    max_dictionary_bytes: usize,
    delta_block_size: usize,
    delta_miniblocks_per_block: usize,
    data_page_size_limit: usize,
    data_page_row_limit: usize,
}

impl Default for WriterProperties {
    fn default() -> Self {
        Self {
            encoding: EncodingChoice::Auto,
            max_dictionary_entries: DEFAULT_MAX_DICTIONARY_ENTRIES,
            max_dictionary_bytes: DEFAULT_MAX_DICTIONARY_BYTES,
            delta_block_size: delta::DEFAULT_BLOCK_SIZE,
            delta_miniblocks_per_block: delta::DEFAULT_MINIBLOCKS_PER_BLOCK,
            data_page_size_limit: DEFAULT_DATA_PAGE_SIZE_LIMIT,
            data_page_row_limit: DEFAULT_DATA_PAGE_ROW_LIMIT,
        }
    }
}

impl WriterProperties {
    pub fn builder() -> WriterPropertiesBuilder {
        WriterPropertiesBuilder::new()
    }

    pub fn encoding(&self) -> EncodingChoice {
        self.encoding
    }

    pub fn max_dictionary_entries(&self) -> usize {
        self.max_dictionary_entries
    }

    pub fn max_dictionary_bytes(&self) -> usize {
        self.max_dictionary_bytes
    }

    pub fn delta_block_size(&self) -> usize {
        self.delta_block_size
    }

    pub fn delta_miniblocks_per_block(&self) -> usize {
        self.delta_miniblocks_per_block
    }

    pub fn data_page_size_limit(&self) -> usize {
        self.data_page_size_limit
    }

    pub fn data_page_row_limit(&self) -> usize {
        self.data_page_row_limit
    }

    /// The encoding a column of `physical_type` is written with
    pub fn resolve_encoding(&self, physical_type: PhysicalType) -> Result<Encoding> {
        match self.encoding {
            EncodingChoice::Auto => Ok(match physical_type {
                PhysicalType::Boolean => Encoding::Plain,
                _ => Encoding::RleDictionary,
            }),
            EncodingChoice::Fixed(encoding) => {
                encoding.check_supports(&physical_type)?;
                Ok(encoding)
            }
        }
    }

    /// Check the settings, e.g. after loading them from a config file
    pub fn validate(&self) -> Result<()> {
        delta::validate_block_geometry(self.delta_block_size, self.delta_miniblocks_per_block)?;
        if self.data_page_size_limit == 0 {
            return Err(ParquetError::configuration(
                "data_page_size_limit must be greater than 0",
            ));
        }
        if self.data_page_row_limit == 0 {
            return Err(ParquetError::configuration(
                "data_page_row_limit must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Builder for [`WriterProperties`]
#[derive(Debug, Clone, Default)]
pub struct WriterPropertiesBuilder {
    props: WriterProperties,
}

impl WriterPropertiesBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the encoding policy
    pub fn with_encoding(mut self, encoding: EncodingChoice) -> Self {
        self.props.encoding = encoding;
        self
    }

    /// Set the number of distinct values after which dictionary encoding
    /// falls back to PLAIN
    pub fn with_max_dictionary_entries(mut self, entries: usize) -> Self {
        self.props.max_dictionary_entries = entries;
        self
    }

    /// Set the PLAIN size of the dictionary after which dictionary encoding
    /// falls back to PLAIN
    pub fn with_max_dictionary_bytes(mut self, bytes: usize) -> Self {
        self.props.max_dictionary_bytes = bytes;
        self
    }

    /// Set the block geometry of DELTA_BINARY_PACKED pages
    pub fn with_delta_block(mut self, block_size: usize, miniblocks_per_block: usize) -> Self {
        self.props.delta_block_size = block_size;
        self.props.delta_miniblocks_per_block = miniblocks_per_block;
        self
    }

    /// Set the approximate data page size that triggers a page flush
    pub fn with_data_page_size_limit(mut self, bytes: usize) -> Self {
        self.props.data_page_size_limit = bytes;
        self
    }

    /// Set the number of rows that triggers a page flush
    pub fn with_data_page_row_limit(mut self, rows: usize) -> Self {
        self.props.data_page_row_limit = rows;
        self
    }

    pub fn build(self) -> Result<WriterProperties> {
        self.props.validate()?;
        Ok(self.props)
    }
}

/// Writes the values of one column into a [`ColumnChunk`].
///
/// Nulls are passed as [`ParquetValue::Null`] and recorded in the definition
/// levels. Pages are flushed whenever the row or size limit is reached.
pub struct ColumnWriter {
    descriptor: ColumnDescriptor,
    props: WriterProperties,
    encoding: Encoding,
    values: Box<dyn ValuesWriter>,
    levels: LevelEncoder,
    page_statistics: StatisticsBuilder,
    page_rows: usize,
    page_nulls: usize,
    pages: Vec<Page>,
    rows_written: usize,
    fell_back: bool,
}

impl ColumnWriter {
    pub fn new(descriptor: ColumnDescriptor, props: WriterProperties) -> Result<Self> {
        props.validate()?;
        let encoding = props.resolve_encoding(descriptor.physical_type())?;
        let values = new_values_writer(&descriptor, encoding, &props)?;
        let levels = LevelEncoder::new(descriptor.max_def_level());
        Ok(Self {
            descriptor,
            props,
            encoding,
            values,
            levels,
            page_statistics: StatisticsBuilder::new(),
            page_rows: 0,
            page_nulls: 0,
            pages: Vec::new(),
            rows_written: 0,
            fell_back: false,
        })
    }

    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }

    /// Encoding of the page currently being written
    pub fn current_encoding(&self) -> Encoding {
        self.values.encoding()
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Data pages finished so far
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// Write one row
    pub fn write(&mut self, value: &ParquetValue) -> Result<()> {
        self.validate_value(value)?;

        if value.is_null() {
            self.levels.put(0)?;
            self.page_nulls += 1;
        } else {
            if self.descriptor.is_nullable() {
                self.levels.put(1)?;
            }
            write_value(self.values.as_mut(), value)?;
        }
        self.page_statistics.update(value);
        self.page_rows += 1;
        self.rows_written += 1;

        if !self.fell_back && self.encoding.is_dictionary() && !self.values.encoding().is_dictionary()
        {
            self.fell_back = true;
            info!(
                column = self.descriptor.name(),
                rows = self.rows_written,
                "dictionary outgrew its limits, falling back to {}",
                self.values.encoding()
            );
        }

        if self.page_rows >= self.props.data_page_row_limit
            || self.estimated_page_size() >= self.props.data_page_size_limit
        {
            self.flush_page()?;
        }
        Ok(())
    }

    /// Write every value of `values` in order
    pub fn write_all<'a, I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a ParquetValue>,
    {
        for value in values {
            self.write(value)?;
        }
        Ok(())
    }

    fn estimated_page_size(&self) -> usize {
        self.levels.estimated_size() + self.values.estimated_size()
    }

    fn validate_value(&self, value: &ParquetValue) -> Result<()> {
        let physical_type = self.descriptor.physical_type();
        match value {
            ParquetValue::Null if !self.descriptor.is_nullable() => {
                Err(ParquetError::invalid_argument(format!(
                    "Column '{}' is required but received a null value",
                    self.descriptor.name()
                )))
            }
            v if !v.matches_type(&physical_type) => Err(ParquetError::invalid_argument(format!(
                "Column '{}' of type {} cannot store a {} value",
                self.descriptor.name(),
                physical_type.type_name(),
                v.type_name()
            ))),
            ParquetValue::Bytes(b) => match physical_type {
                PhysicalType::FixedLenByteArray(len) if b.len() != len => {
                    Err(ParquetError::invalid_argument(format!(
                        "Column '{}' expects {}-byte values but received {} bytes",
                        self.descriptor.name(),
                        len,
                        b.len()
                    )))
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn flush_page(&mut self) -> Result<()> {
        if self.page_rows == 0 {
            return Ok(());
        }
        // read before finish_page resets a fallen back writer's state
        let encoding = self.values.encoding();
        let payload = self.values.finish_page()?;
        let levels = self.levels.finish();

        let mut buffer = BytesMut::with_capacity(levels.len() + payload.len());
        buffer.extend_from_slice(&levels);
        buffer.extend_from_slice(&payload);

        debug!(
            column = self.descriptor.name(),
            page = self.pages.len(),
            rows = self.page_rows,
            nulls = self.page_nulls,
            bytes = buffer.len(),
            %encoding,
            "flushed data page"
        );

        self.pages.push(Page::Data {
            buffer: buffer.freeze(),
            num_values: self.page_rows,
            num_nulls: self.page_nulls,
            encoding,
            statistics: Some(self.page_statistics.finish()),
        });
        self.page_rows = 0;
        self.page_nulls = 0;
        Ok(())
    }

    /// Flush the last page and assemble the column chunk
    pub fn close(mut self) -> Result<ColumnChunk> {
        self.flush_page()?;

        let mut pages = Vec::with_capacity(self.pages.len() + 1);
        match self.values.dictionary_page()? {
            Some(dictionary) => pages.push(Page::Dictionary {
                buffer: dictionary.buffer,
                num_values: dictionary.num_values,
                encoding: Encoding::Plain,
            }),
            // dictionary pages holding only nulls still need a dictionary to bind to
            None if self.pages.iter().any(|p| p.encoding().is_dictionary()) => {
                pages.push(Page::Dictionary {
                    buffer: bytes::Bytes::new(),
                    num_values: 0,
                    encoding: Encoding::Plain,
                })
            }
            None => {}
        }
        pages.append(&mut self.pages);

        let chunk = ColumnChunk::from_pages(self.descriptor, pages)?;
        debug!(
            column = chunk.descriptor().name(),
            rows = chunk.num_rows(),
            pages = chunk.pages().len(),
            bytes = chunk.total_byte_size(),
            "closed column chunk"
        );
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageType;

    #[test]
    fn test_properties_defaults() {
        let props = WriterProperties::default();
        assert_eq!(props.encoding(), EncodingChoice::Auto);
        assert_eq!(props.max_dictionary_entries(), 65_536);
        assert_eq!(props.max_dictionary_bytes(), 1024 * 1024);
        assert_eq!(props.delta_block_size(), 128);
        assert_eq!(props.delta_miniblocks_per_block(), 4);
        assert_eq!(props.data_page_row_limit(), 20_000);
        assert_eq!(
            props.resolve_encoding(PhysicalType::Boolean).unwrap(),
            Encoding::Plain
        );
        assert_eq!(
            props.resolve_encoding(PhysicalType::ByteArray).unwrap(),
            Encoding::RleDictionary
        );
    }

    #[test]
    fn test_builder_validation() {
        assert!(WriterProperties::builder().with_delta_block(100, 4).build().is_err());
        assert!(WriterProperties::builder().with_data_page_row_limit(0).build().is_err());
        let props = WriterProperties::builder()
            .with_encoding(EncodingChoice::Fixed(Encoding::DeltaBinaryPacked))
            .with_delta_block(256, 8)
            .build()
            .unwrap();
        assert!(props.resolve_encoding(PhysicalType::Double).is_err());
    }

    #[test]
    fn test_value_validation() {
        let descr = ColumnDescriptor::required("id", PhysicalType::Int32).unwrap();
        let mut writer = ColumnWriter::new(descr, WriterProperties::default()).unwrap();
        let err = writer.write(&ParquetValue::Null).unwrap_err();
        assert!(matches!(err, ParquetError::InvalidArgument(_)));
        let err = writer.write(&ParquetValue::Int64(1)).unwrap_err();
        assert!(err.to_string().contains("cannot store a Int64 value"));
        assert_eq!(writer.rows_written(), 0);

        let descr = ColumnDescriptor::optional("h", PhysicalType::FixedLenByteArray(2)).unwrap();
        let mut writer = ColumnWriter::new(descr, WriterProperties::default()).unwrap();
        assert!(writer.write(&ParquetValue::from("abc")).is_err());
        writer.write(&ParquetValue::from("ab")).unwrap();
    }

    #[test]
    fn test_pages_flush_at_row_limit() {
        let descr = ColumnDescriptor::optional("n", PhysicalType::Int64).unwrap();
        let props = WriterProperties::builder()
            .with_data_page_row_limit(10)
            .build()
            .unwrap();
        let mut writer = ColumnWriter::new(descr, props).unwrap();
        for i in 0..25i64 {
            let value = if i % 7 == 0 {
                ParquetValue::Null
            } else {
                ParquetValue::Int64(i)
            };
            writer.write(&value).unwrap();
        }
        assert_eq!(writer.num_pages(), 2);
        let chunk = writer.close().unwrap();

        let pages = chunk.pages();
        assert_eq!(pages[0].page_type, PageType::Dictionary);
        let rows: Vec<usize> = pages[1..].iter().map(|p| p.num_values).collect();
        assert_eq!(rows, vec![10, 10, 5]);
        assert_eq!(chunk.statistics().null_count, Some(4));
        assert_eq!(chunk.statistics().min, Some(ParquetValue::Int64(1)));
        assert_eq!(chunk.statistics().max, Some(ParquetValue::Int64(24)));
        assert_eq!(chunk.encodings(), &[Encoding::RleDictionary]);
    }

    #[test]
    fn test_all_null_dictionary_column_gets_empty_dictionary() {
        let descr = ColumnDescriptor::optional("s", PhysicalType::ByteArray).unwrap();
        let mut writer = ColumnWriter::new(descr, WriterProperties::default()).unwrap();
        writer
            .write_all(&[ParquetValue::Null, ParquetValue::Null])
            .unwrap();
        let chunk = writer.close().unwrap();
        let dictionary = chunk.dictionary_page().unwrap();
        assert_eq!(dictionary.num_values, 0);
        assert_eq!(chunk.statistics().is_all_null(), Some(true));
    }
}
