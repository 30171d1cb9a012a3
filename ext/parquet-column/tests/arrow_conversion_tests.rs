use arrow_array::*;
use arrow_schema::{DataType, Field};
use parquet_column::arrow_conversion::{
    arrow_to_parquet_value, descriptor_to_arrow_field, parquet_values_to_arrow_array,
    read_column_to_arrow, write_arrow_array,
};
use parquet_column::*;
use std::sync::Arc;

mod test_helpers;
use test_helpers::*;

fn write_array(descr: ColumnDescriptor, encoding: Encoding, array: &dyn Array) -> ColumnChunk {
    let mut writer = ColumnWriter::new(descr, fixed_props(encoding, 3)).unwrap();
    write_arrow_array(&mut writer, array).unwrap();
    writer.close().unwrap()
}

#[test]
fn test_int64_array_through_every_encoding() {
    let array = Int64Array::from(vec![Some(5), None, Some(-8), Some(5), None, Some(i64::MAX), Some(0)]);
    for encoding in encodings_for(PhysicalType::Int64) {
        let descr = ColumnDescriptor::optional("n", PhysicalType::Int64).unwrap();
        let chunk = write_array(descr, encoding, &array);
        assert_eq!(chunk.num_data_pages(), 3);

        let result = read_column_to_arrow(chunk).unwrap();
        let result = result.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(result, &array, "{}", encoding);
    }
}

#[test]
fn test_strings_become_binary() {
    let array = StringArray::from(vec![Some("alpha"), None, Some(""), Some("omega")]);
    let descr = ColumnDescriptor::optional("s", PhysicalType::ByteArray).unwrap();
    let chunk = write_array(descr, Encoding::DeltaByteArray, &array);

    let result = read_column_to_arrow(chunk).unwrap();
    assert_eq!(result.data_type(), &DataType::Binary);
    let result = result.as_any().downcast_ref::<BinaryArray>().unwrap();
    let values: Vec<Option<&[u8]>> = result.iter().collect();
    assert_eq!(
        values,
        vec![Some(&b"alpha"[..]), None, Some(&b""[..]), Some(&b"omega"[..])]
    );
}

#[test]
fn test_booleans_and_doubles() {
    let flags = BooleanArray::from(vec![Some(true), Some(false), None, Some(true)]);
    let descr = ColumnDescriptor::optional("b", PhysicalType::Boolean).unwrap();
    let result = read_column_to_arrow(write_array(descr, Encoding::Rle, &flags)).unwrap();
    assert_eq!(result.as_any().downcast_ref::<BooleanArray>().unwrap(), &flags);

    let doubles = Float64Array::from(vec![1.5, -0.25, f64::INFINITY]);
    let descr = ColumnDescriptor::required("d", PhysicalType::Double).unwrap();
    let result = read_column_to_arrow(write_array(descr, Encoding::PlainDictionary, &doubles)).unwrap();
    assert_eq!(result.as_any().downcast_ref::<Float64Array>().unwrap(), &doubles);
}

#[test]
fn test_fields_follow_descriptors() {
    let descr = ColumnDescriptor::required("uuid", PhysicalType::FixedLenByteArray(16)).unwrap();
    let field = descriptor_to_arrow_field(&descr).unwrap();
    assert_eq!(field.name(), "uuid");
    assert_eq!(field.data_type(), &DataType::FixedSizeBinary(16));
    assert!(!field.is_nullable());

    let descr = ColumnDescriptor::optional("f", PhysicalType::Float).unwrap();
    let field = descriptor_to_arrow_field(&descr).unwrap();
    assert_eq!(field.data_type(), &DataType::Float32);
    assert!(field.is_nullable());
}

#[test]
fn test_value_extraction() {
    let array: ArrayRef = Arc::new(Int32Array::from(vec![Some(1), None]));
    assert_eq!(arrow_to_parquet_value(array.as_ref(), 0).unwrap(), ParquetValue::Int32(1));
    assert_eq!(arrow_to_parquet_value(array.as_ref(), 1).unwrap(), ParquetValue::Null);
    assert!(matches!(
        arrow_to_parquet_value(array.as_ref(), 2),
        Err(ParquetError::InvalidArgument(_))
    ));

    let dates = Date32Array::from(vec![1]);
    assert!(matches!(
        arrow_to_parquet_value(&dates, 0),
        Err(ParquetError::Conversion(_))
    ));
}

#[test]
fn test_array_building_errors() {
    let field = Field::new("n", DataType::Int32, false);
    let err = parquet_values_to_arrow_array(vec![ParquetValue::Int32(1), ParquetValue::Null], &field)
        .unwrap_err();
    assert!(err.to_string().contains("not nullable"), "{}", err);

    let field = Field::new("n", DataType::Int32, true);
    let err = parquet_values_to_arrow_array(vec![ParquetValue::Int64(1)], &field).unwrap_err();
    assert!(matches!(err, ParquetError::Conversion(_)));
}

#[test]
fn test_writer_rejects_mismatched_arrays() {
    let descr = ColumnDescriptor::required("n", PhysicalType::Int32).unwrap();
    let mut writer = ColumnWriter::new(descr, WriterProperties::default()).unwrap();
    let array = Int64Array::from(vec![1, 2]);
    assert!(matches!(
        write_arrow_array(&mut writer, &array),
        Err(ParquetError::InvalidArgument(_))
    ));
}
