//! Column chunk reading

use std::sync::Arc;

use tracing::{debug, trace};

use crate::filter::{FilterPredicate, SingleColumnStatistics};
use crate::levels::LevelDecoder;
use crate::page::ColumnChunk;
use crate::values::{new_values_reader, read_value, Dictionary, ValuesReader};
use crate::{ErrorContext, ParquetError, ParquetValue, Result};

/// A data page bound to a values reader
struct BoundPage {
    levels: Vec<i16>,
    next_level: usize,
    values: Box<dyn ValuesReader>,
}

impl BoundPage {
    fn rows_left(&self) -> usize {
        self.levels.len() - self.next_level
    }
}

/// Iterates the rows of a [`ColumnChunk`], yielding [`ParquetValue::Null`]
/// for null rows.
///
/// Iteration stops after the first error.
pub struct ColumnChunkReader {
    chunk: ColumnChunk,
    dictionary: Option<Arc<Dictionary>>,
    page_filter: Option<FilterPredicate>,
    next_page: usize,
    current: Option<BoundPage>,
    pages_pruned: usize,
    failed: bool,
}

impl ColumnChunkReader {
    /// Create a reader, decoding the dictionary page when present
    pub fn new(chunk: ColumnChunk) -> Result<Self> {
        let mut next_page = 0;
        let dictionary = match chunk.dictionary_page() {
            Some(header) => {
                let page = chunk
                    .page_bytes(0)
                    .ok_or_else(|| ParquetError::internal("dictionary page out of bounds"))?;
                let dictionary = Dictionary::decode(page, header.num_values, chunk.descriptor())
                    .with_context(|| {
                        format!("dictionary page of column '{}'", chunk.descriptor().name())
                    })?;
                debug!(
                    column = chunk.descriptor().name(),
                    entries = dictionary.len(),
                    "decoded dictionary page"
                );
                next_page = 1;
                Some(Arc::new(dictionary))
            }
            None => None,
        };
        Ok(Self {
            chunk,
            dictionary,
            page_filter: None,
            next_page,
            current: None,
            pages_pruned: 0,
            failed: false,
        })
    }

    /// Skip data pages whose statistics rule out every row of `predicate`.
    ///
    /// Only the statistics of this column are consulted, so conditions on
    /// other columns never prune.
    pub fn with_page_filter(mut self, predicate: FilterPredicate) -> Self {
        self.page_filter = Some(predicate);
        self
    }

    pub fn chunk(&self) -> &ColumnChunk {
        &self.chunk
    }

    pub fn dictionary(&self) -> Option<&Arc<Dictionary>> {
        self.dictionary.as_ref()
    }

    /// Data pages skipped by the page filter so far
    pub fn pages_pruned(&self) -> usize {
        self.pages_pruned
    }

    /// Index of the next data page that passes the page filter
    fn next_visible_page(&mut self) -> Option<usize> {
        while self.next_page < self.chunk.pages().len() {
            let index = self.next_page;
            self.next_page += 1;
            let header = &self.chunk.pages()[index];
            if header.is_dictionary() {
                continue;
            }
            if let Some(predicate) = &self.page_filter {
                let stats = SingleColumnStatistics::new(
                    self.chunk.descriptor().name(),
                    header.statistics.as_ref(),
                );
                if predicate.evaluate_statistics(&stats).can_drop() {
                    debug!(
                        column = self.chunk.descriptor().name(),
                        page = index,
                        rows = header.num_values,
                        %predicate,
                        "pruned data page"
                    );
                    self.pages_pruned += 1;
                    continue;
                }
            }
            return Some(index);
        }
        None
    }

    fn bind_page(&self, index: usize) -> Result<BoundPage> {
        let descriptor = self.chunk.descriptor();
        let header = &self.chunk.pages()[index];
        let start = self
            .chunk
            .page_offset(index)
            .ok_or_else(|| ParquetError::internal(format!("page {} has no offset", index)))?;
        let buffer = self.chunk.buffer().clone();

        let max_level = descriptor.max_def_level();
        let (levels, values_start) =
            LevelDecoder::new(max_level).decode(&buffer, start, header.num_values)?;
        let non_null = levels.iter().filter(|&&l| l == max_level).count();
        if non_null != header.num_non_null() {
            return Err(ParquetError::decoding(
                start,
                "read page",
                format!(
                    "page declares {} nulls but its levels hold {}",
                    header.num_nulls,
                    header.num_values - non_null
                ),
            ));
        }

        let mut values = new_values_reader(descriptor, header.encoding, self.dictionary.clone())?;
        let end = values.init_from_page(non_null, buffer, values_start)?;
        let expected_end = start + header.byte_length;
        if end != expected_end {
            return Err(ParquetError::decoding(
                end,
                "read page",
                format!(
                    "page declares {} bytes but its values end after {}",
                    header.byte_length,
                    end - start
                ),
            )
            .with_encoding(header.encoding));
        }

        trace!(
            column = descriptor.name(),
            page = index,
            rows = header.num_values,
            encoding = %header.encoding,
            "bound data page"
        );
        Ok(BoundPage {
            levels,
            next_level: 0,
            values,
        })
    }

    /// Bind the next visible page; `false` once the chunk is exhausted
    fn advance_page(&mut self) -> Result<bool> {
        match self.next_visible_page() {
            Some(index) => {
                self.current = Some(self.bind_page(index)?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn read_next(&mut self) -> Result<Option<ParquetValue>> {
        let physical_type = self.chunk.descriptor().physical_type();
        let max_level = self.chunk.descriptor().max_def_level();
        loop {
            if let Some(page) = self.current.as_mut() {
                if page.next_level < page.levels.len() {
                    let level = page.levels[page.next_level];
                    page.next_level += 1;
                    if level < max_level {
                        return Ok(Some(ParquetValue::Null));
                    }
                    return read_value(page.values.as_mut(), physical_type).map(Some);
                }
                self.current = None;
            }
            if !self.advance_page()? {
                return Ok(None);
            }
        }
    }

    /// Skip up to `count` rows, returning how many were skipped.
    ///
    /// Whole pages are jumped over without being decoded. Rows of pages
    /// pruned by the page filter are passed over as in iteration and do not
    /// count toward `count`.
    pub fn skip_rows(&mut self, count: usize) -> Result<usize> {
        if self.failed {
            return Ok(0);
        }
        let result = self.skip_rows_inner(count);
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn skip_rows_inner(&mut self, count: usize) -> Result<usize> {
        let max_level = self.chunk.descriptor().max_def_level();
        let mut skipped = 0;
        while skipped < count {
            if let Some(page) = self.current.as_mut() {
                let n = page.rows_left().min(count - skipped);
                let range = page.next_level..page.next_level + n;
                let non_null = page.levels[range].iter().filter(|&&l| l == max_level).count();
                page.values.skip_n(non_null)?;
                page.next_level += n;
                skipped += n;
                if page.rows_left() == 0 {
                    self.current = None;
                }
                continue;
            }

            let Some(index) = self.next_visible_page() else {
                break;
            };
            let rows = self.chunk.pages()[index].num_values;
            if rows <= count - skipped {
                trace!(
                    column = self.chunk.descriptor().name(),
                    page = index,
                    rows,
                    "skipped data page"
                );
                skipped += rows;
            } else {
                self.current = Some(self.bind_page(index)?);
            }
        }
        Ok(skipped)
    }

    /// Read every remaining row
    pub fn read_all(self) -> Result<Vec<ParquetValue>> {
        self.collect()
    }
}

impl Iterator for ColumnChunkReader {
    type Item = Result<ParquetValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_next() {
            Ok(value) => value.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
