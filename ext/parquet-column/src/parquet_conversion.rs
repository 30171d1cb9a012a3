//! Conversions to and from the parquet-rs metadata types, for callers that
//! read file footers with parquet-rs and hand the column chunks to this crate

use bytes::Bytes;
use parquet::basic::{Encoding as ParquetEncoding, Type as ParquetType};
use parquet::file::statistics::Statistics;

use crate::statistics::ColumnStatistics;
use crate::{Encoding, ParquetError, ParquetValue, PhysicalType, Result};

impl From<Encoding> for ParquetEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Plain => ParquetEncoding::PLAIN,
            Encoding::PlainDictionary => ParquetEncoding::PLAIN_DICTIONARY,
            Encoding::Rle => ParquetEncoding::RLE,
            Encoding::RleDictionary => ParquetEncoding::RLE_DICTIONARY,
            Encoding::DeltaBinaryPacked => ParquetEncoding::DELTA_BINARY_PACKED,
            Encoding::DeltaLengthByteArray => ParquetEncoding::DELTA_LENGTH_BYTE_ARRAY,
            Encoding::DeltaByteArray => ParquetEncoding::DELTA_BYTE_ARRAY,
        }
    }
}

impl TryFrom<ParquetEncoding> for Encoding {
    type Error = ParquetError;

    fn try_from(encoding: ParquetEncoding) -> Result<Self> {
        Ok(match encoding {
            ParquetEncoding::PLAIN => Encoding::Plain,
            ParquetEncoding::PLAIN_DICTIONARY => Encoding::PlainDictionary,
            ParquetEncoding::RLE => Encoding::Rle,
            ParquetEncoding::RLE_DICTIONARY => Encoding::RleDictionary,
            ParquetEncoding::DELTA_BINARY_PACKED => Encoding::DeltaBinaryPacked,
            ParquetEncoding::DELTA_LENGTH_BYTE_ARRAY => Encoding::DeltaLengthByteArray,
            ParquetEncoding::DELTA_BYTE_ARRAY => Encoding::DeltaByteArray,
            other => {
                return Err(ParquetError::Configuration(format!(
                    "{} encoding is not supported",
                    other
                )))
            }
        })
    }
}

impl From<PhysicalType> for ParquetType {
    fn from(physical_type: PhysicalType) -> Self {
        match physical_type {
            PhysicalType::Boolean => ParquetType::BOOLEAN,
            PhysicalType::Int32 => ParquetType::INT32,
            PhysicalType::Int64 => ParquetType::INT64,
            PhysicalType::Float => ParquetType::FLOAT,
            PhysicalType::Double => ParquetType::DOUBLE,
            PhysicalType::ByteArray => ParquetType::BYTE_ARRAY,
            PhysicalType::FixedLenByteArray(_) => ParquetType::FIXED_LEN_BYTE_ARRAY,
        }
    }
}

impl PhysicalType {
    /// Convert a parquet-rs physical type; `type_length` is only read for
    /// FIXED_LEN_BYTE_ARRAY
    pub fn from_parquet(physical_type: ParquetType, type_length: i32) -> Result<Self> {
        Ok(match physical_type {
            ParquetType::BOOLEAN => PhysicalType::Boolean,
            ParquetType::INT32 => PhysicalType::Int32,
            ParquetType::INT64 => PhysicalType::Int64,
            ParquetType::FLOAT => PhysicalType::Float,
            ParquetType::DOUBLE => PhysicalType::Double,
            ParquetType::BYTE_ARRAY => PhysicalType::ByteArray,
            ParquetType::FIXED_LEN_BYTE_ARRAY => match usize::try_from(type_length) {
                Ok(len) if len > 0 => PhysicalType::FixedLenByteArray(len),
                _ => {
                    return Err(ParquetError::Configuration(format!(
                        "invalid fixed length {}",
                        type_length
                    )))
                }
            },
            ParquetType::INT96 => {
                return Err(ParquetError::Configuration(
                    "INT96 columns are not supported".to_string(),
                ))
            }
        })
    }
}

impl ColumnStatistics {
    /// Convert footer statistics of a page or column chunk holding
    /// `value_count` rows
    pub fn from_parquet(statistics: &Statistics, value_count: Option<u64>) -> Result<Self> {
        let (min, max) = match statistics {
            Statistics::Boolean(s) => (
                s.min_opt().map(|v| ParquetValue::Boolean(*v)),
                s.max_opt().map(|v| ParquetValue::Boolean(*v)),
            ),
            Statistics::Int32(s) => (
                s.min_opt().map(|v| ParquetValue::Int32(*v)),
                s.max_opt().map(|v| ParquetValue::Int32(*v)),
            ),
            Statistics::Int64(s) => (
                s.min_opt().map(|v| ParquetValue::Int64(*v)),
                s.max_opt().map(|v| ParquetValue::Int64(*v)),
            ),
            // parquet-rs leaves NaN out of float bounds, so a page whose
            // bounds look exact may still hold a NaN row
            Statistics::Float(_) | Statistics::Double(_) => (None, None),
            Statistics::ByteArray(s) => (
                s.min_opt().map(|v| ParquetValue::Bytes(Bytes::copy_from_slice(v.data()))),
                s.max_opt().map(|v| ParquetValue::Bytes(Bytes::copy_from_slice(v.data()))),
            ),
            Statistics::FixedLenByteArray(s) => (
                s.min_opt().map(|v| ParquetValue::Bytes(Bytes::copy_from_slice(v.data()))),
                s.max_opt().map(|v| ParquetValue::Bytes(Bytes::copy_from_slice(v.data()))),
            ),
            Statistics::Int96(_) => {
                return Err(ParquetError::Configuration(
                    "INT96 statistics are not supported".to_string(),
                ))
            }
        };

        Ok(ColumnStatistics::new(
            min,
            max,
            statistics.null_count_opt(),
            value_count,
        ))
    }
}
