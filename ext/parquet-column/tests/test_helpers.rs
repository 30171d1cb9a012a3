#![allow(dead_code)]

use bytes::Bytes;
use ordered_float::OrderedFloat;
use parquet_column::values::{
    new_values_reader, new_values_writer, read_value, write_value, Dictionary,
};
use parquet_column::*;
use std::sync::Arc;

/// A single encoded page together with what is needed to decode it
pub struct EncodedPage {
    pub buffer: Bytes,
    pub encoding: Encoding,
    pub dictionary: Option<Arc<Dictionary>>,
    pub num_values: usize,
}

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

pub fn all_encodings() -> Vec<Encoding> {
    vec![
        Encoding::Plain,
        Encoding::Rle,
        Encoding::PlainDictionary,
        Encoding::RleDictionary,
        Encoding::DeltaBinaryPacked,
        Encoding::DeltaLengthByteArray,
        Encoding::DeltaByteArray,
    ]
}

pub fn encodings_for(physical_type: PhysicalType) -> Vec<Encoding> {
    all_encodings()
        .into_iter()
        .filter(|e| e.supports(&physical_type))
        .collect()
}

/// Every (type, encoding) pair the codecs support
pub fn supported_pairs() -> Vec<(PhysicalType, Encoding)> {
    all_physical_types()
        .into_iter()
        .flat_map(|t| encodings_for(t).into_iter().map(move |e| (t, e)))
        .collect()
}

/// A value unique to `i` for every type except Boolean, which alternates
pub fn distinct_value(physical_type: PhysicalType, i: usize) -> ParquetValue {
    match physical_type {
        PhysicalType::Boolean => ParquetValue::Boolean(i % 2 == 0),
        PhysicalType::Int32 => ParquetValue::Int32((i as i32).wrapping_mul(7919) - 50_000),
        PhysicalType::Int64 => ParquetValue::Int64((i as i64) * 1_000_003 - (1 << 40)),
        PhysicalType::Float => ParquetValue::Float32(OrderedFloat(i as f32 * 0.25 - 100.0)),
        PhysicalType::Double => ParquetValue::Float64(OrderedFloat(i as f64 * 1e-3 - 3.5)),
        PhysicalType::ByteArray => ParquetValue::Bytes(Bytes::from(format!("row-{:06}", i))),
        PhysicalType::FixedLenByteArray(len) => {
            let mut bytes = vec![0u8; len];
            for (slot, b) in bytes.iter_mut().zip((i as u64).to_le_bytes()) {
                *slot = b;
            }
            ParquetValue::Bytes(Bytes::from(bytes))
        }
    }
}

pub fn distinct_values(physical_type: PhysicalType, count: usize) -> Vec<ParquetValue> {
    (0..count).map(|i| distinct_value(physical_type, i)).collect()
}

pub fn repeated_values(physical_type: PhysicalType, count: usize) -> Vec<ParquetValue> {
    vec![distinct_value(physical_type, 3); count]
}

/// Encode non-null `values` into one page with default writer properties
pub fn encode_page(
    descr: &ColumnDescriptor,
    encoding: Encoding,
    values: &[ParquetValue],
) -> Result<EncodedPage> {
    encode_page_with(descr, encoding, values, &WriterProperties::default())
}

pub fn encode_page_with(
    descr: &ColumnDescriptor,
    encoding: Encoding,
    values: &[ParquetValue],
    props: &WriterProperties,
) -> Result<EncodedPage> {
    let mut writer = new_values_writer(descr, encoding, props)?;
    for value in values {
        write_value(writer.as_mut(), value)?;
    }
    let page_encoding = writer.encoding();
    let buffer = writer.finish_page()?;
    let dictionary = match writer.dictionary_page()? {
        Some(page) => Some(Arc::new(Dictionary::decode(
            page.buffer,
            page.num_values,
            descr,
        )?)),
        None if page_encoding.is_dictionary() => {
            Some(Arc::new(Dictionary::decode(Bytes::new(), 0, descr)?))
        }
        None => None,
    };
    Ok(EncodedPage {
        buffer,
        encoding: page_encoding,
        dictionary,
        num_values: values.len(),
    })
}

/// Decode every value of `page`, checking the reader consumed the whole buffer
pub fn decode_page(descr: &ColumnDescriptor, page: &EncodedPage) -> Result<Vec<ParquetValue>> {
    let mut reader = new_values_reader(descr, page.encoding, page.dictionary.clone())?;
    let end = reader.init_from_page(page.num_values, page.buffer.clone(), 0)?;
    assert_eq!(end, page.buffer.len(), "{} left trailing bytes", page.encoding);
    (0..page.num_values)
        .map(|_| read_value(reader.as_mut(), descr.physical_type()))
        .collect()
}

/// Encode then decode `values`, asserting they come back unchanged
pub fn assert_codec_round_trip(
    physical_type: PhysicalType,
    encoding: Encoding,
    values: &[ParquetValue],
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let descr = ColumnDescriptor::required("c", physical_type)?;
    let page = encode_page(&descr, encoding, values)?;
    let decoded = decode_page(&descr, &page)?;
    assert_eq!(
        decoded.len(),
        values.len(),
        "{:?} {}: length mismatch",
        physical_type,
        encoding
    );
    assert!(
        decoded == values,
        "{:?} {}: values differ",
        physical_type,
        encoding
    );
    Ok(())
}

/// Properties fixing `encoding` with `page_rows` rows per data page
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
) -> Result<ColumnChunk> {
    let mut writer = ColumnWriter::new(descr, props)?;
    writer.write_all(values)?;
    writer.close()
}

/// Every `every`th value replaced by null
pub fn with_nulls(values: Vec<ParquetValue>, every: usize) -> Vec<ParquetValue> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| if i % every == every - 1 { ParquetValue::Null } else { v })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_pairs() {
        let pairs = supported_pairs();
        assert!(pairs.contains(&(PhysicalType::Boolean, Encoding::Rle)));
        assert!(pairs.contains(&(PhysicalType::Int64, Encoding::DeltaBinaryPacked)));
        assert!(!pairs.contains(&(PhysicalType::Double, Encoding::DeltaBinaryPacked)));
        assert!(!pairs.contains(&(PhysicalType::Int32, Encoding::DeltaByteArray)));
    }

    #[test]
    fn test_distinct_values_are_distinct() {
        for physical_type in all_physical_types() {
            if physical_type == PhysicalType::Boolean {
                continue;
            }
            let values = distinct_values(physical_type, 300);
            let unique: std::collections::HashSet<_> = values.iter().collect();
            assert_eq!(unique.len(), 300, "{:?}", physical_type);
        }
    }
}
