use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use data_pipeline::ingestion::{load, FileFormat, IngestionOptions};
use data_pipeline::output::{write_csv, write_to_path, write_xlsx};
use data_pipeline::types::{DataSet, DataType, Field, Schema, Value};
use data_pipeline::PipelineError;

fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("data-pipeline-{name}-{nanos}.{ext}"))
}

fn result_table() -> DataSet {
    let schema = Schema::new(vec![
        Field::new("Name", DataType::Utf8),
        Field::new("Score", DataType::Float64),
        Field::new("Count", DataType::Int64),
        Field::new("Passed", DataType::Bool),
        Field::new("Date", DataType::Date),
    ]);
    DataSet::new(
        schema,
        vec![
            vec![
                Value::Utf8("A".into()),
                Value::Float64(99.5),
                Value::Int64(2),
                Value::Bool(true),
                Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            ],
            vec![
                Value::Utf8("B".into()),
                Value::Null,
                Value::Int64(1),
                Value::Bool(false),
                Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            ],
        ],
    )
}

#[test]
fn xlsx_output_reads_back_with_the_same_columns_and_values() {
    let path = tmp_file("out", "xlsx");
    let ds = result_table();
    write_xlsx(&ds, &path).unwrap();

    let back = load(&path, Some(&ds.schema), &IngestionOptions::new(FileFormat::Xlsx)).unwrap();
    assert_eq!(back, ds);

    let inferred = load(&path, None, &IngestionOptions::new(FileFormat::Xlsx)).unwrap();
    assert_eq!(
        inferred.schema.field_names().collect::<Vec<_>>(),
        vec!["Name", "Score", "Count", "Passed", "Date"]
    );
    assert_eq!(inferred.schema.fields[4].data_type, DataType::Date);
    assert_eq!(inferred.row_count(), 2);

    let _ = std::fs::remove_file(path);
}

#[test]
fn xlsx_output_overwrites_existing_file() {
    let path = tmp_file("overwrite", "xlsx");
    std::fs::write(&path, b"not a workbook").unwrap();

    write_to_path(&result_table(), &path, FileFormat::Xlsx).unwrap();
    let back = load(&path, None, &IngestionOptions::new(FileFormat::Xlsx)).unwrap();
    assert_eq!(back.row_count(), 2);

    let _ = std::fs::remove_file(path);
}

#[test]
fn csv_output_reads_back() {
    let path = tmp_file("out", "csv");
    let ds = result_table();
    write_csv(&ds, &path).unwrap();

    let back = load(&path, Some(&ds.schema), &IngestionOptions::new(FileFormat::Csv)).unwrap();
    assert_eq!(back, ds);

    let _ = std::fs::remove_file(path);
}

#[test]
fn unwritable_path_is_an_io_error() {
    let dir = tmp_file("missing-dir", "d");
    let path = dir.join("nested").join("out.xlsx");

    let err = write_xlsx(&result_table(), &path).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
    assert!(!path.exists());
}
