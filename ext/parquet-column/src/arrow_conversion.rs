//! Bidirectional conversion between Arrow arrays and ParquetValue
//!
//! Column chunks can be materialized into a single Arrow array and Arrow
//! arrays can be fed into a [`ColumnWriter`]. Each physical type maps to one
//! Arrow type:
//!
//! | Physical type            | Arrow type           |
//! |--------------------------|----------------------|
//! | BOOLEAN                  | `Boolean`            |
//! | INT32                    | `Int32`              |
//! | INT64                    | `Int64`              |
//! | FLOAT                    | `Float32`            |
//! | DOUBLE                   | `Float64`            |
//! | BYTE_ARRAY               | `Binary`             |
//! | FIXED_LEN_BYTE_ARRAY(n)  | `FixedSizeBinary(n)` |

use crate::page::ColumnChunk;
use crate::reader::ColumnChunkReader;
use crate::writer::ColumnWriter;
use crate::{ColumnDescriptor, ParquetError, ParquetValue, PhysicalType, Result};
use arrow_array::{builder::*, Array, ArrayRef};
use arrow_schema::{DataType, Field};
use bytes::Bytes;
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// Convert a single value from an Arrow array at the given index to a ParquetValue
pub fn arrow_to_parquet_value(array: &dyn Array, index: usize) -> Result<ParquetValue> {
    use arrow_array::*;

    if index >= array.len() {
        return Err(ParquetError::InvalidArgument(format!(
            "index {} is out of bounds for an array of length {}",
            index,
            array.len()
        )));
    }
    if array.is_null(index) {
        return Ok(ParquetValue::Null);
    }

    match array.data_type() {
        DataType::Boolean => {
            let array = downcast_array::<BooleanArray>(array)?;
            Ok(ParquetValue::Boolean(array.value(index)))
        }
        DataType::Int32 => {
            let array = downcast_array::<Int32Array>(array)?;
            Ok(ParquetValue::Int32(array.value(index)))
        }
        DataType::Int64 => {
            let array = downcast_array::<Int64Array>(array)?;
            Ok(ParquetValue::Int64(array.value(index)))
        }
        DataType::Float32 => {
            let array = downcast_array::<Float32Array>(array)?;
            Ok(ParquetValue::Float32(OrderedFloat(array.value(index))))
        }
        DataType::Float64 => {
            let array = downcast_array::<Float64Array>(array)?;
            Ok(ParquetValue::Float64(OrderedFloat(array.value(index))))
        }
        DataType::Binary => {
            let array = downcast_array::<BinaryArray>(array)?;
            Ok(ParquetValue::Bytes(Bytes::copy_from_slice(array.value(index))))
        }
        DataType::Utf8 => {
            let array = downcast_array::<StringArray>(array)?;
            Ok(ParquetValue::Bytes(Bytes::copy_from_slice(
                array.value(index).as_bytes(),
            )))
        }
        DataType::FixedSizeBinary(_) => {
            let array = downcast_array::<FixedSizeBinaryArray>(array)?;
            Ok(ParquetValue::Bytes(Bytes::copy_from_slice(array.value(index))))
        }
        dt => Err(ParquetError::Conversion(format!(
            "Unsupported data type for conversion: {:?}",
            dt
        ))),
    }
}

/// Arrow type used to materialize a column of `physical_type`
pub fn physical_type_to_arrow(physical_type: PhysicalType) -> Result<DataType> {
    Ok(match physical_type {
        PhysicalType::Boolean => DataType::Boolean,
        PhysicalType::Int32 => DataType::Int32,
        PhysicalType::Int64 => DataType::Int64,
        PhysicalType::Float => DataType::Float32,
        PhysicalType::Double => DataType::Float64,
        PhysicalType::ByteArray => DataType::Binary,
        PhysicalType::FixedLenByteArray(len) => {
            let size = i32::try_from(len).map_err(|_| {
                ParquetError::Conversion(format!(
                    "Fixed length {} does not fit an Arrow FixedSizeBinary",
                    len
                ))
            })?;
            DataType::FixedSizeBinary(size)
        }
    })
}

/// Arrow field matching a column descriptor
pub fn descriptor_to_arrow_field(descriptor: &ColumnDescriptor) -> Result<Field> {
    Ok(Field::new(
        descriptor.name(),
        physical_type_to_arrow(descriptor.physical_type())?,
        descriptor.is_nullable(),
    ))
}

/// Decode every row of a column chunk into one Arrow array
pub fn read_column_to_arrow(chunk: ColumnChunk) -> Result<ArrayRef> {
    let field = descriptor_to_arrow_field(chunk.descriptor())?;
    let values = ColumnChunkReader::new(chunk)?.read_all()?;
    parquet_values_to_arrow_array(values, &field)
}

/// Write every element of `array` into `writer`, nulls included
pub fn write_arrow_array(writer: &mut ColumnWriter, array: &dyn Array) -> Result<()> {
    for index in 0..array.len() {
        let value = arrow_to_parquet_value(array, index)?;
        writer.write(&value)?;
    }
    Ok(())
}

/// Build an Arrow array of `field`'s type from ParquetValues
pub fn parquet_values_to_arrow_array(values: Vec<ParquetValue>, field: &Field) -> Result<ArrayRef> {
    if !field.is_nullable() && values.iter().any(ParquetValue::is_null) {
        return Err(ParquetError::Conversion(format!(
            "Field '{}' is not nullable but the values contain nulls",
            field.name()
        )));
    }

    match field.data_type() {
        DataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    ParquetValue::Boolean(b) => builder.append_value(b),
                    ParquetValue::Null => builder.append_null(),
                    _ => return Err(unexpected("Boolean", &value)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Int32 => build_int32_array(values),
        DataType::Int64 => build_int64_array(values),
        DataType::Float32 => build_float32_array(values),
        DataType::Float64 => build_float64_array(values),
        DataType::Binary => build_binary_array(values),
        DataType::FixedSizeBinary(size) => build_fixed_binary_array(values, *size),
        dt => Err(ParquetError::Conversion(format!(
            "Unsupported data type for conversion: {:?}",
            dt
        ))),
    }
}

fn unexpected(expected: &str, value: &ParquetValue) -> ParquetError {
    ParquetError::Conversion(format!("Expected {}, got {:?}", expected, value.type_name()))
}

/// Helper function to downcast an array with better error messages
fn downcast_array<T: 'static>(array: &dyn Array) -> Result<&T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        ParquetError::Conversion(format!("Failed to cast to {}", std::any::type_name::<T>()))
    })
}

fn build_int32_array(values: Vec<ParquetValue>) -> Result<ArrayRef> {
    let mut builder = Int32Builder::with_capacity(values.len());
    for value in values {
        match value {
            ParquetValue::Int32(i) => builder.append_value(i),
            ParquetValue::Null => builder.append_null(),
            _ => return Err(unexpected("Int32", &value)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

/// Build Int64 array, widening Int32 values
fn build_int64_array(values: Vec<ParquetValue>) -> Result<ArrayRef> {
    let mut builder = Int64Builder::with_capacity(values.len());
    for value in values {
        match value {
            ParquetValue::Int64(i) => builder.append_value(i),
            ParquetValue::Int32(i) => builder.append_value(i as i64),
            ParquetValue::Null => builder.append_null(),
            _ => return Err(unexpected("Int64", &value)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn build_float32_array(values: Vec<ParquetValue>) -> Result<ArrayRef> {
    let mut builder = Float32Builder::with_capacity(values.len());
    for value in values {
        match value {
            ParquetValue::Float32(OrderedFloat(f)) => builder.append_value(f),
            ParquetValue::Null => builder.append_null(),
            _ => return Err(unexpected("Float32", &value)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

/// Build Float64 array, widening Float32 values
fn build_float64_array(values: Vec<ParquetValue>) -> Result<ArrayRef> {
    let mut builder = Float64Builder::with_capacity(values.len());
    for value in values {
        match value {
            ParquetValue::Float64(OrderedFloat(f)) => builder.append_value(f),
            ParquetValue::Float32(OrderedFloat(f)) => builder.append_value(f as f64),
            ParquetValue::Null => builder.append_null(),
            _ => return Err(unexpected("Float64", &value)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn build_binary_array(values: Vec<ParquetValue>) -> Result<ArrayRef> {
    let data_capacity = values
        .iter()
        .map(|v| match v {
            ParquetValue::Bytes(b) => b.len(),
            _ => 0,
        })
        .sum();
    let mut builder = BinaryBuilder::with_capacity(values.len(), data_capacity);
    for value in values {
        match value {
            ParquetValue::Bytes(b) => builder.append_value(&b),
            ParquetValue::Null => builder.append_null(),
            _ => return Err(unexpected("Bytes", &value)),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn build_fixed_binary_array(values: Vec<ParquetValue>, size: i32) -> Result<ArrayRef> {
    let mut builder = FixedSizeBinaryBuilder::with_capacity(values.len(), size);
    for value in values {
        match value {
            ParquetValue::Bytes(b) => {
                if b.len() != size as usize {
                    return Err(ParquetError::Conversion(format!(
                        "Fixed size binary expected {} bytes, got {}",
                        size,
                        b.len()
                    )));
                }
                builder.append_value(&b)?;
            }
            ParquetValue::Null => builder.append_null(),
            _ => return Err(unexpected("Bytes", &value)),
        }
    }
    Ok(Arc::new(builder.finish()))
}
