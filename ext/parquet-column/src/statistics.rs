//! Page and column chunk statistics

use std::cmp::Ordering;

use crate::ParquetValue;

/// Summary of the values in a page or column chunk.
///
/// `min`/`max` are `None` when unknown: never computed, all values null, or
/// a NaN was seen. `value_count` counts rows including nulls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnStatistics {
    pub min: Option<ParquetValue>,
    pub max: Option<ParquetValue>,
    pub null_count: Option<u64>,
    pub value_count: Option<u64>,
}

impl ColumnStatistics {
    pub fn new(
        min: Option<ParquetValue>,
        max: Option<ParquetValue>,
        null_count: Option<u64>,
        value_count: Option<u64>,
    ) -> Self {
        Self {
            min,
            max,
            null_count,
            value_count,
        }
    }

    /// Statistics with nothing known
    pub fn unknown() -> Self {
        Self::default()
    }

    /// `Some(true)` when every row is null, `None` when the counts are unknown
    pub fn is_all_null(&self) -> Option<bool> {
        match (self.null_count, self.value_count) {
            (Some(nulls), Some(values)) => Some(nulls == values),
            _ => None,
        }
    }

    /// `Some(true)` when at least one row is null
    pub fn has_nulls(&self) -> Option<bool> {
        self.null_count.map(|n| n > 0)
    }

    /// Both bounds are present
    pub fn has_min_max(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }

    /// Combine with the statistics of another page of the same column.
    ///
    /// Bounds stay known only if both sides know them; an all-null side
    /// contributes no bounds.
    pub fn merge(&mut self, other: &ColumnStatistics) {
        let self_empty = self.is_all_null() == Some(true);
        let other_empty = other.is_all_null() == Some(true);

        let (min, max) = if other_empty {
            (self.min.take(), self.max.take())
        } else if self_empty {
            (other.min.clone(), other.max.clone())
        } else {
            (
                combine(self.min.take(), other.min.as_ref(), Ordering::Less),
                combine(self.max.take(), other.max.as_ref(), Ordering::Greater),
            )
        };
        self.min = min;
        self.max = max;
        self.null_count = sum(self.null_count, other.null_count);
        self.value_count = sum(self.value_count, other.value_count);
    }
}

fn sum(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    Some(a? + b?)
}

fn combine(
    current: Option<ParquetValue>,
    other: Option<&ParquetValue>,
    keep_when: Ordering,
) -> Option<ParquetValue> {
    let current = current?;
    let other = other?;
    match other.compare(&current)? {
        ord if ord == keep_when => Some(other.clone()),
        _ => Some(current),
    }
}

/// Accumulates statistics while values are written
#[derive(Debug, Clone, Default)]
pub struct StatisticsBuilder {
    min: Option<ParquetValue>,
    max: Option<ParquetValue>,
    null_count: u64,
    value_count: u64,
    // a NaN or an incomparable value was seen
    poisoned: bool,
}

impl StatisticsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: &ParquetValue) {
        self.value_count += 1;
        if value.is_null() {
            self.null_count += 1;
            return;
        }
        if self.poisoned {
            return;
        }
        if value.is_nan() {
            self.poisoned = true;
            return;
        }

        match &self.min {
            None => self.min = Some(value.clone()),
            Some(min) => match value.compare(min) {
                Some(Ordering::Less) => self.min = Some(value.clone()),
                Some(_) => {}
                None => self.poisoned = true,
            },
        }
        match &self.max {
            None => self.max = Some(value.clone()),
            Some(max) => match value.compare(max) {
                Some(Ordering::Greater) => self.max = Some(value.clone()),
                Some(_) => {}
                None => self.poisoned = true,
            },
        }
    }

    pub fn value_count(&self) -> u64 {
        self.value_count
    }

    pub fn build(&self) -> ColumnStatistics {
        let (min, max) = if self.poisoned {
            (None, None)
        } else {
            (self.min.clone(), self.max.clone())
        };
        ColumnStatistics {
            min,
            max,
            null_count: Some(self.null_count),
            value_count: Some(self.value_count),
        }
    }

    /// Build the statistics and start over
    pub fn finish(&mut self) -> ColumnStatistics {
        let stats = self.build();
        *self = Self::default();
        stats
    }
}
