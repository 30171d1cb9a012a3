//! Encoding tags

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ParquetError, PhysicalType, Result};

/// Value encodings supported by the column engine.
///
/// `PlainDictionary` and `RleDictionary` share the same data page layout;
/// the former is the tag older writers put on dictionary-encoded pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Encoding {
    Plain,
    PlainDictionary,
    Rle,
    RleDictionary,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
    DeltaByteArray,
}

impl Encoding {
    pub fn is_dictionary(&self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }

    /// Check whether values of `physical_type` can be stored with this encoding
    pub fn supports(&self, physical_type: &PhysicalType) -> bool {
        match self {
            Encoding::Plain => true,
            Encoding::Rle => matches!(physical_type, PhysicalType::Boolean),
            Encoding::PlainDictionary | Encoding::RleDictionary => {
                !matches!(physical_type, PhysicalType::Boolean)
            }
            Encoding::DeltaBinaryPacked => {
                matches!(physical_type, PhysicalType::Int32 | PhysicalType::Int64)
            }
            Encoding::DeltaLengthByteArray => matches!(physical_type, PhysicalType::ByteArray),
            Encoding::DeltaByteArray => matches!(
                physical_type,
                PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_)
            ),
        }
    }

    /// Fail with a configuration error unless `physical_type` is supported
    pub fn check_supports(&self, physical_type: &PhysicalType) -> Result<()> {
        if self.supports(physical_type) {
            Ok(())
        } else {
            Err(ParquetError::Configuration(format!(
                "{} encoding is not supported for {} columns",
                self,
                physical_type.type_name()
            )))
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Plain => "PLAIN",
            Encoding::PlainDictionary => "PLAIN_DICTIONARY",
            Encoding::Rle => "RLE",
            Encoding::RleDictionary => "RLE_DICTIONARY",
            Encoding::DeltaBinaryPacked => "DELTA_BINARY_PACKED",
            Encoding::DeltaLengthByteArray => "DELTA_LENGTH_BYTE_ARRAY",
            Encoding::DeltaByteArray => "DELTA_BYTE_ARRAY",
        };
        f.write_str(name)
    }
}
