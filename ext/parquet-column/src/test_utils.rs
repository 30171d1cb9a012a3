//! Test utilities for parquet-column

#[cfg(test)]
pub mod test {
    use crate::reader::ColumnChunkReader;
    use crate::writer::{ColumnWriter, EncodingChoice, WriterProperties};
    use crate::{ColumnChunk, ColumnDescriptor, Encoding, ParquetValue, PhysicalType};
    use crate::{Schema, SchemaBuilder};
    use bytes::Bytes;
    use ordered_float::OrderedFloat;

    /// Create a simple schema for testing
    pub fn sample_schema() -> Schema {
        SchemaBuilder::new()
            .with_column(ColumnDescriptor::required("id", PhysicalType::Int64).unwrap())
            .with_column(ColumnDescriptor::optional("name", PhysicalType::ByteArray).unwrap())
            .with_column(ColumnDescriptor::optional("age", PhysicalType::Int32).unwrap())
            .with_column(ColumnDescriptor::optional("salary", PhysicalType::Double).unwrap())
            .with_column(ColumnDescriptor::optional("active", PhysicalType::Boolean).unwrap())
            .build()
            .unwrap()
    }

    /// Every physical type with a fixed length of 4 for byte arrays
    pub fn all_physical_types() -> Vec<PhysicalType> {
        vec![
            PhysicalType::Boolean,
            PhysicalType::Int32,
            PhysicalType::Int64,
            PhysicalType::Float,
            PhysicalType::Double,
            PhysicalType::ByteArray,
            PhysicalType::FixedLenByteArray(4),
        ]
    }

    /// The `i`th sample value of `physical_type`; values repeat every 13 rows
    pub fn sample_value(physical_type: PhysicalType, i: usize) -> ParquetValue {
        let k = (i % 13) as i64;
        match physical_type {
            PhysicalType::Boolean => ParquetValue::Boolean(k % 3 == 0),
            PhysicalType::Int32 => ParquetValue::Int32((k * 1000 - 4000) as i32),
            PhysicalType::Int64 => ParquetValue::Int64(k * 1_000_000_007 - 3),
            PhysicalType::Float => ParquetValue::Float32(OrderedFloat(k as f32 * 0.5 - 2.0)),
            PhysicalType::Double => ParquetValue::Float64(OrderedFloat(k as f64 * 1.25 - 7.5)),
            PhysicalType::ByteArray => ParquetValue::Bytes(Bytes::from(format!("value-{}", k))),
            PhysicalType::FixedLenByteArray(len) => {
                ParquetValue::Bytes(Bytes::from(vec![b'a' + k as u8; len]))
            }
        }
    }

    /// `count` sample values, every fifth one null when `with_nulls` is set
    pub fn sample_values(physical_type: PhysicalType, count: usize, with_nulls: bool) -> Vec<ParquetValue> {
        (0..count)
            .map(|i| {
                if with_nulls && i % 5 == 4 {
                    ParquetValue::Null
                } else {
                    sample_value(physical_type, i)
                }
            })
            .collect()
    }

    /// Encodings usable for `physical_type`
    pub fn encodings_for(physical_type: PhysicalType) -> Vec<Encoding> {
        [
            Encoding::Plain,
            Encoding::Rle,
            Encoding::PlainDictionary,
            Encoding::RleDictionary,
            Encoding::DeltaBinaryPacked,
            Encoding::DeltaLengthByteArray,
            Encoding::DeltaByteArray,
        ]
        .into_iter()
        .filter(|e| e.supports(&physical_type))
        .collect()
    }

    /// Properties fixing the encoding and keeping pages small
    pub fn fixed_props(encoding: Encoding, page_rows: usize) -> WriterProperties {
        WriterProperties::builder()
            .with_encoding(EncodingChoice::Fixed(encoding))
            .with_data_page_row_limit(page_rows)
            .build()
            .unwrap()
    }

    pub fn write_chunk(
        descr: ColumnDescriptor,
        props: WriterProperties,
        values: &[ParquetValue],
    ) -> ColumnChunk {
        let mut writer = ColumnWriter::new(descr, props).unwrap();
        writer.write_all(values).unwrap();
        writer.close().unwrap()
    }

    pub fn read_chunk(chunk: ColumnChunk) -> Vec<ParquetValue> {
        ColumnChunkReader::new(chunk).unwrap().read_all().unwrap()
    }
}

#[cfg(test)]
mod test_utils_tests {
    use super::test::*;
    use crate::ColumnDescriptor;

    #[test]
    fn test_schema_creation() {
        let schema = sample_schema();
        assert_eq!(schema.columns().len(), 5);
        assert!(schema.has_column("salary"));
    }

    #[test]
    fn test_every_encoding_round_trips() {
        for physical_type in all_physical_types() {
            for encoding in encodings_for(physical_type) {
                let descr = ColumnDescriptor::optional("c", physical_type).unwrap();
                let values = sample_values(physical_type, 57, true);
                let chunk = write_chunk(descr, fixed_props(encoding, 16), &values);
                assert_eq!(chunk.num_data_pages(), 4);
                assert_eq!(read_chunk(chunk), values, "{:?} {}", physical_type, encoding);
            }
        }
    }
}
