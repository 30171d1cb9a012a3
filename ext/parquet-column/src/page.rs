//! Pages and packed column chunks.
//!
//! A [`ColumnChunk`] is one contiguous buffer holding every page of a column
//! back to back, described by an ordered list of [`PageHeader`]s. When a
//! dictionary page is present it comes first.

use bytes::{Bytes, BytesMut};

use crate::statistics::ColumnStatistics;
use crate::{ColumnDescriptor, Encoding, ParquetError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    Dictionary,
    Data,
}

/// Describes one page inside a packed column chunk buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub encoding: Encoding,
    /// Rows in the page including nulls (entries for a dictionary page)
    pub num_values: usize,
    pub num_nulls: usize,
    pub byte_length: usize,
    pub statistics: Option<ColumnStatistics>,
}

impl PageHeader {
    pub fn is_dictionary(&self) -> bool {
        self.page_type == PageType::Dictionary
    }

    /// Values actually stored in the page payload
    pub fn num_non_null(&self) -> usize {
        self.num_values.saturating_sub(self.num_nulls)
    }
}

/// A finalized page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// Definition levels (nullable columns only) followed by the encoded values
    Data {
        buffer: Bytes,
        num_values: usize,
        num_nulls: usize,
        encoding: Encoding,
        statistics: Option<ColumnStatistics>,
    },
    /// PLAIN-encoded dictionary entries
    Dictionary {
        buffer: Bytes,
        num_values: usize,
        encoding: Encoding,
    },
}

impl Page {
    pub fn page_type(&self) -> PageType {
        match self {
            Page::Data { .. } => PageType::Data,
            Page::Dictionary { .. } => PageType::Dictionary,
        }
    }

    pub fn buffer(&self) -> &Bytes {
        match self {
            Page::Data { buffer, .. } | Page::Dictionary { buffer, .. } => buffer,
        }
    }

    pub fn num_values(&self) -> usize {
        match self {
            Page::Data { num_values, .. } | Page::Dictionary { num_values, .. } => *num_values,
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            Page::Data { encoding, .. } | Page::Dictionary { encoding, .. } => *encoding,
        }
    }

    pub fn header(&self) -> PageHeader {
        match self {
            Page::Data {
                buffer,
                num_values,
                num_nulls,
                encoding,
                statistics,
            } => PageHeader {
                page_type: PageType::Data,
                encoding: *encoding,
                num_values: *num_values,
                num_nulls: *num_nulls,
                byte_length: buffer.len(),
                statistics: statistics.clone(),
            },
            Page::Dictionary {
                buffer,
                num_values,
                encoding,
            } => PageHeader {
                page_type: PageType::Dictionary,
                encoding: *encoding,
                num_values: *num_values,
                num_nulls: 0,
                byte_length: buffer.len(),
                statistics: None,
            },
        }
    }
}

/// All pages of one column, packed into a single buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChunk {
    descriptor: ColumnDescriptor,
    buffer: Bytes,
    pages: Vec<PageHeader>,
    page_offsets: Vec<usize>,
    statistics: ColumnStatistics,
    encodings: Vec<Encoding>,
}

impl ColumnChunk {
    /// Pack finalized pages into one buffer
    pub fn from_pages(descriptor: ColumnDescriptor, pages: Vec<Page>) -> Result<Self> {
        let total: usize = pages.iter().map(|p| p.buffer().len()).sum();
        let mut buffer = BytesMut::with_capacity(total);
        let mut headers = Vec::with_capacity(pages.len());
        for page in &pages {
            buffer.extend_from_slice(page.buffer());
            headers.push(page.header());
        }
        Self::new(descriptor, buffer.freeze(), headers)
    }

    /// Assemble a chunk from an already packed buffer and its page headers
    pub fn new(descriptor: ColumnDescriptor, buffer: Bytes, pages: Vec<PageHeader>) -> Result<Self> {
        let mut page_offsets = Vec::with_capacity(pages.len());
        let mut offset = 0usize;
        let mut encodings: Vec<Encoding> = Vec::new();
        let mut statistics: Option<ColumnStatistics> = None;

        for (i, page) in pages.iter().enumerate() {
            if page.is_dictionary() {
                if i != 0 {
                    return Err(ParquetError::configuration(format!(
                        "Column '{}' has a dictionary page at position {}; it must come first",
                        descriptor.name(),
                        i
                    )));
                }
            } else {
                if page.num_nulls > page.num_values {
                    return Err(ParquetError::configuration(format!(
                        "Page {} of column '{}' declares {} nulls in {} rows",
                        i,
                        descriptor.name(),
                        page.num_nulls,
                        page.num_values
                    )));
                }
                if page.num_nulls > 0 && !descriptor.is_nullable() {
                    return Err(ParquetError::configuration(format!(
                        "Page {} of required column '{}' declares nulls",
                        i,
                        descriptor.name()
                    )));
                }
                if !encodings.contains(&page.encoding) {
                    encodings.push(page.encoding);
                }
                let page_stats = page.statistics.clone().unwrap_or_default();
                match statistics.as_mut() {
                    None => statistics = Some(page_stats),
                    Some(stats) => stats.merge(&page_stats),
                }
            }
            page_offsets.push(offset);
            offset += page.byte_length;
        }

        if offset != buffer.len() {
            return Err(ParquetError::configuration(format!(
                "Page headers of column '{}' cover {} bytes but the buffer holds {}",
                descriptor.name(),
                offset,
                buffer.len()
            )));
        }

        let statistics = statistics
            .unwrap_or_else(|| ColumnStatistics::new(None, None, Some(0), Some(0)));
        Ok(Self {
            descriptor,
            buffer,
            pages,
            page_offsets,
            statistics,
            encodings,
        })
    }

    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }

    /// The packed buffer holding every page
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    pub fn pages(&self) -> &[PageHeader] {
        &self.pages
    }

    /// Start of page `index` in the packed buffer
    pub fn page_offset(&self, index: usize) -> Option<usize> {
        self.page_offsets.get(index).copied()
    }

    /// Payload of page `index`, sharing the packed buffer
    pub fn page_bytes(&self, index: usize) -> Option<Bytes> {
        let start = self.page_offset(index)?;
        let len = self.pages.get(index)?.byte_length;
        Some(self.buffer.slice(start..start + len))
    }

    pub fn dictionary_page(&self) -> Option<&PageHeader> {
        self.pages.first().filter(|p| p.is_dictionary())
    }

    pub fn num_data_pages(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_dictionary()).count()
    }

    /// Statistics merged over every data page
    pub fn statistics(&self) -> &ColumnStatistics {
        &self.statistics
    }

    /// Distinct data page encodings in order of first use
    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    pub fn num_rows(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| !p.is_dictionary())
            .map(|p| p.num_values)
            .sum()
    }

    pub fn total_byte_size(&self) -> usize {
        self.buffer.len()
    }
}
