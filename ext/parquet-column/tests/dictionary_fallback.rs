use bytes::Bytes;
use parquet_column::*;

mod test_helpers;
use test_helpers::*;

fn dictionary_props(max_entries: usize, page_rows: usize) -> WriterProperties {
    WriterProperties::builder()
        .with_encoding(EncodingChoice::Fixed(Encoding::RleDictionary))
        .with_max_dictionary_entries(max_entries)
        .with_data_page_row_limit(page_rows)
        .build()
        .unwrap()
}

#[test]
fn test_page_falls_back_to_plain() {
    let descr = ColumnDescriptor::required("c", PhysicalType::Int32).unwrap();
    let props = WriterProperties::builder()
        .with_max_dictionary_entries(10)
        .build()
        .unwrap();
    let values = distinct_values(PhysicalType::Int32, 100);

    let page = encode_page_with(&descr, Encoding::PlainDictionary, &values, &props).unwrap();
    assert_eq!(page.encoding, Encoding::Plain);
    assert!(page.dictionary.is_none());
    assert_eq!(page.buffer.len(), 400);
    assert!(decode_page(&descr, &page).unwrap() == values);
}

#[test]
fn test_values_within_the_cap_stay_dictionary_encoded() {
    let descr = ColumnDescriptor::required("c", PhysicalType::ByteArray).unwrap();
    let props = WriterProperties::builder()
        .with_max_dictionary_entries(10)
        .build()
        .unwrap();
    let values: Vec<ParquetValue> = (0..200)
        .map(|i| ParquetValue::from(format!("key-{}", i % 10).as_str()))
        .collect();

    let page = encode_page_with(&descr, Encoding::RleDictionary, &values, &props).unwrap();
    assert_eq!(page.encoding, Encoding::RleDictionary);
    assert_eq!(page.dictionary.as_ref().map(|d| d.len()), Some(10));
    assert!(decode_page(&descr, &page).unwrap() == values);
}

#[test]
fn test_fallback_on_dictionary_bytes() {
    let descr = ColumnDescriptor::required("c", PhysicalType::ByteArray).unwrap();
    let props = WriterProperties::builder()
        .with_max_dictionary_bytes(64)
        .build()
        .unwrap();
    let values: Vec<ParquetValue> = (0..20)
        .map(|i| ParquetValue::Bytes(Bytes::from(vec![b'a' + i as u8; 12])))
        .collect();

    let page = encode_page_with(&descr, Encoding::RleDictionary, &values, &props).unwrap();
    assert_eq!(page.encoding, Encoding::Plain);
    assert!(decode_page(&descr, &page).unwrap() == values);
}

#[test]
fn test_fallback_mid_chunk_keeps_earlier_pages() {
    let descr = ColumnDescriptor::optional("c", PhysicalType::Int64).unwrap();
    let mut values: Vec<ParquetValue> = (0..256)
        .map(|i| ParquetValue::Int64(i % 50))
        .collect();
    values.extend((0..300).map(|i| ParquetValue::Int64(1_000 + i)));
    let values = with_nulls(values, 9);

    let chunk = write_chunk(descr, dictionary_props(100, 128), &values).unwrap();
    assert_eq!(chunk.num_data_pages(), 5);
    assert_eq!(chunk.encodings(), &[Encoding::RleDictionary, Encoding::Plain]);

    let dictionary = chunk.dictionary_page().unwrap();
    assert_eq!(dictionary.num_values, 50);

    let page_encodings: Vec<Encoding> = chunk
        .pages()
        .iter()
        .filter(|p| !p.is_dictionary())
        .map(|p| p.encoding)
        .collect();
    assert_eq!(
        page_encodings,
        vec![
            Encoding::RleDictionary,
            Encoding::RleDictionary,
            Encoding::Plain,
            Encoding::Plain,
            Encoding::Plain
        ]
    );

    let read = ColumnChunkReader::new(chunk).unwrap().read_all().unwrap();
    assert!(read == values);
}

#[test]
fn test_fallback_in_first_page_drops_dictionary() {
    let descr = ColumnDescriptor::required("c", PhysicalType::Double).unwrap();
    let values = distinct_values(PhysicalType::Double, 1_000);

    let chunk = write_chunk(descr, dictionary_props(100, 128), &values).unwrap();
    assert!(chunk.dictionary_page().is_none());
    assert_eq!(chunk.encodings(), &[Encoding::Plain]);

    let read = ColumnChunkReader::new(chunk).unwrap().read_all().unwrap();
    assert!(read == values);
}

#[test]
fn test_writer_reports_current_encoding() {
    let descr = ColumnDescriptor::required("c", PhysicalType::Int32).unwrap();
    let mut writer = ColumnWriter::new(descr, dictionary_props(4, 1_000)).unwrap();
    for i in 0..4 {
        writer.write(&ParquetValue::Int32(i)).unwrap();
    }
    assert_eq!(writer.current_encoding(), Encoding::RleDictionary);
    writer.write(&ParquetValue::Int32(4)).unwrap();
    assert_eq!(writer.current_encoding(), Encoding::Plain);
    writer.write(&ParquetValue::Int32(0)).unwrap();

    let chunk = writer.close().unwrap();
    let read = ColumnChunkReader::new(chunk).unwrap().read_all().unwrap();
    assert_eq!(read, (0..5).chain(0..1).map(ParquetValue::Int32).collect::<Vec<_>>());
}
