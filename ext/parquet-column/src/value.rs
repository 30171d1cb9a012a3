use std::cmp::Ordering;

use bytes::Bytes;
use ordered_float::OrderedFloat;

use crate::PhysicalType;

/// A single decoded column value, tagged by physical type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParquetValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    /// Variable or fixed-length byte array
    Bytes(Bytes),

    // Null value
    Null,
}

impl ParquetValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, ParquetValue::Null)
    }

    /// Get the type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            ParquetValue::Boolean(_) => "Boolean",
            ParquetValue::Int32(_) => "Int32",
            ParquetValue::Int64(_) => "Int64",
            ParquetValue::Float32(_) => "Float32",
            ParquetValue::Float64(_) => "Float64",
            ParquetValue::Bytes(_) => "Bytes",
            ParquetValue::Null => "Null",
        }
    }

    /// Check if this value can be stored in a column of `physical_type`.
    ///
    /// Null matches every type; fixed-length widths are checked by the writer.
    pub fn matches_type(&self, physical_type: &PhysicalType) -> bool {
        matches!(
            (self, physical_type),
            (ParquetValue::Null, _)
                | (ParquetValue::Boolean(_), PhysicalType::Boolean)
                | (ParquetValue::Int32(_), PhysicalType::Int32)
                | (ParquetValue::Int64(_), PhysicalType::Int64)
                | (ParquetValue::Float32(_), PhysicalType::Float)
                | (ParquetValue::Float64(_), PhysicalType::Double)
                | (ParquetValue::Bytes(_), PhysicalType::ByteArray)
                | (ParquetValue::Bytes(_), PhysicalType::FixedLenByteArray(_))
        )
    }

    /// Compare two values under the column ordering of their type.
    ///
    /// Integers compare signed, floats by IEEE partial order (NaN is
    /// unordered, `-0.0 == 0.0`), byte arrays lexicographically as unsigned
    /// bytes and `false < true`. Nulls and values of different types are
    /// unordered.
    pub fn compare(&self, other: &ParquetValue) -> Option<Ordering> {
        match (self, other) {
            (ParquetValue::Boolean(a), ParquetValue::Boolean(b)) => Some(a.cmp(b)),
            (ParquetValue::Int32(a), ParquetValue::Int32(b)) => Some(a.cmp(b)),
            (ParquetValue::Int64(a), ParquetValue::Int64(b)) => Some(a.cmp(b)),
            (ParquetValue::Float32(a), ParquetValue::Float32(b)) => a.0.partial_cmp(&b.0),
            (ParquetValue::Float64(a), ParquetValue::Float64(b)) => a.0.partial_cmp(&b.0),
            (ParquetValue::Bytes(a), ParquetValue::Bytes(b)) => Some(a.as_ref().cmp(b.as_ref())),
            _ => None,
        }
    }

    /// Check for a floating-point NaN
    pub fn is_nan(&self) -> bool {
        match self {
            ParquetValue::Float32(f) => f.0.is_nan(),
            ParquetValue::Float64(f) => f.0.is_nan(),
            _ => false,
        }
    }

    /// Size of the value once PLAIN-encoded, used for page and dictionary sizing
    pub fn plain_size(&self, physical_type: &PhysicalType) -> usize {
        match self {
            ParquetValue::Null => 0,
            ParquetValue::Boolean(_) => 1,
            ParquetValue::Int32(_) | ParquetValue::Float32(_) => 4,
            ParquetValue::Int64(_) | ParquetValue::Float64(_) => 8,
            ParquetValue::Bytes(b) => match physical_type {
                PhysicalType::FixedLenByteArray(len) => *len,
                _ => 4 + b.len(),
            },
        }
    }
}

impl From<bool> for ParquetValue {
    fn from(value: bool) -> Self {
        ParquetValue::Boolean(value)
    }
}

impl From<i32> for ParquetValue {
    fn from(value: i32) -> Self {
        ParquetValue::Int32(value)
    }
}

impl From<i64> for ParquetValue {
    fn from(value: i64) -> Self {
        ParquetValue::Int64(value)
    }
}

impl From<f32> for ParquetValue {
    fn from(value: f32) -> Self {
        ParquetValue::Float32(OrderedFloat(value))
    }
}

impl From<f64> for ParquetValue {
    fn from(value: f64) -> Self {
        ParquetValue::Float64(OrderedFloat(value))
    }
}

impl From<Bytes> for ParquetValue {
    fn from(value: Bytes) -> Self {
        ParquetValue::Bytes(value)
    }
}

impl From<&str> for ParquetValue {
    fn from(value: &str) -> Self {
        ParquetValue::Bytes(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl<T: Into<ParquetValue>> From<Option<T>> for ParquetValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParquetValue::Null, Into::into)
    }
}
