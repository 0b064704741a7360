use chrono::NaiveDate;
use data_pipeline::ingestion::csv::{
    infer_csv_schema_from_reader, ingest_csv_from_path, ingest_csv_from_reader,
};
use data_pipeline::types::{DataType, Field, Schema, Value};

fn people_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("name", DataType::Utf8),
        Field::new("score", DataType::Float64),
        Field::new("active", DataType::Bool),
    ])
}

fn reader(input: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes())
}

#[test]
fn ingest_csv_from_path_happy_path() {
    let schema = people_schema();
    let ds = ingest_csv_from_path("tests/fixtures/people.csv", &schema).unwrap();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Ada".to_string()),
            Value::Float64(98.5),
            Value::Bool(true),
        ]
    );
}

#[test]
fn ingest_csv_allows_reordered_columns() {
    let schema = people_schema();
    let mut rdr = reader("name,id,active,score\nAda,1,true,98.5\n");

    let ds = ingest_csv_from_reader(&mut rdr, &schema).unwrap();
    assert_eq!(ds.row_count(), 1);
    assert_eq!(ds.rows[0][0], Value::Int64(1));
    assert_eq!(ds.rows[0][1], Value::Utf8("Ada".to_string()));
}

#[test]
fn ingest_csv_errors_on_missing_required_column() {
    let schema = people_schema();
    let mut rdr = reader("id,name,score\n1,Ada,98.5\n");

    let err = ingest_csv_from_reader(&mut rdr, &schema).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required column 'active'"));
}

#[test]
fn ingest_csv_errors_on_type_parse() {
    let schema = people_schema();
    let mut rdr = reader("id,name,score,active\nnot_an_int,Ada,98.5,true\n");

    let err = ingest_csv_from_reader(&mut rdr, &schema).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("failed to parse value"));
    assert!(msg.contains("row 2"));
    assert!(msg.contains("column 'id'"));
}

#[test]
fn ingest_csv_maps_blank_cells_to_null_and_parses_dates() {
    let schema = Schema::new(vec![
        Field::new("Name", DataType::Utf8),
        Field::new("Score", DataType::Int64),
        Field::new("Date", DataType::Date),
    ]);
    let mut rdr = reader("Name,Score,Date\nA,  ,2024-01-02\n , 7,2024-01-03 10:00:00\n");

    let ds = ingest_csv_from_reader(&mut rdr, &schema).unwrap();
    assert_eq!(
        ds.rows,
        vec![
            vec![
                Value::Utf8("A".into()),
                Value::Null,
                Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            ],
            vec![
                Value::Null,
                Value::Int64(7),
                Value::Date(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()),
            ],
        ]
    );
}

#[test]
fn infer_csv_schema_widens_types_and_names_blank_headers() {
    let mut rdr = reader("id,score,when,,flag,note\n1,2,2024-01-01,x,true,\n2,2.5,2024-01-02,3,false,\n");

    let schema = infer_csv_schema_from_reader(&mut rdr).unwrap();
    assert_eq!(
        schema,
        Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("score", DataType::Float64),
            Field::new("when", DataType::Date),
            Field::new("Unnamed: 3", DataType::Utf8),
            Field::new("flag", DataType::Bool),
            Field::new("note", DataType::Utf8),
        ])
    );
}

#[test]
fn infer_csv_schema_rejects_duplicate_headers() {
    let mut rdr = reader("a,a\n1,2\n");
    let err = infer_csv_schema_from_reader(&mut rdr).unwrap_err();
    assert!(err.to_string().contains("duplicate column 'a'"));
}

#[test]
fn missing_value_markers_load_as_null_and_keep_columns_numeric() {
    let input = "Name,Score,Date\nA,NA,2024-01-02\nN/A,90,null\nB,NaN,2024-01-03\nC,85.5,#N/A\n";

    let schema = infer_csv_schema_from_reader(&mut reader(input)).unwrap();
    assert_eq!(
        schema,
        Schema::new(vec![
            Field::new("Name", DataType::Utf8),
            Field::new("Score", DataType::Float64),
            Field::new("Date", DataType::Date),
        ])
    );

    let ds = ingest_csv_from_reader(&mut reader(input), &schema).unwrap();
    assert_eq!(ds.rows[0][1], Value::Null);
    assert_eq!(ds.rows[1][0], Value::Null);
    assert_eq!(ds.rows[1][1], Value::Float64(90.0));
    assert_eq!(ds.rows[1][2], Value::Null);
    assert_eq!(ds.rows[2][1], Value::Null);
    assert_eq!(ds.rows[3][1], Value::Float64(85.5));
    assert_eq!(ds.rows[3][2], Value::Null);
}
