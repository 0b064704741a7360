//! Core data model types.
//!
//! Every stage of the pipeline consumes and produces an in-memory [`DataSet`]: a [`Schema`] (a
//! list of typed [`Field`]s) plus row-major [`Value`] storage in schema field order.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer.
    #[serde(alias = "int", alias = "integer")]
    Int64,
    /// 64-bit floating point number.
    #[serde(alias = "float", alias = "number")]
    Float64,
    /// Boolean.
    #[serde(alias = "boolean")]
    Bool,
    /// UTF-8 string.
    #[serde(alias = "string", alias = "str", alias = "text")]
    Utf8,
    /// Calendar date without a time zone.
    Date,
}

impl DataType {
    /// `true` for [`DataType::Int64`] and [`DataType::Float64`].
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }

    /// Whether values of `self` and `other` can be ordered against each other.
    pub fn is_comparable_with(self, other: DataType) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int64 => "int64",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Utf8 => "utf8",
            Self::Date => "date",
        };
        f.write_str(name)
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` when the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Like [`Schema::index_of`], but fails with [`PipelineError::ColumnNotFound`].
    pub fn require(&self, name: &str) -> PipelineResult<usize> {
        self.index_of(name)
            .ok_or_else(|| PipelineError::column_not_found(name))
    }

    /// Returns a field by name, if present.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate the invariants every stage relies on: at least one field, unique names.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.fields.is_empty() {
            return Err(PipelineError::SchemaMismatch {
                message: "schema has no fields".to_string(),
            });
        }
        for (i, f) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|other| other.name == f.name) {
                return Err(PipelineError::SchemaMismatch {
                    message: format!("duplicate column '{}'", f.name),
                });
            }
        }
        Ok(())
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date.
    Date(NaiveDate),
}

impl Value {
    /// `true` for the missing-value marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The [`DataType`] of a non-null value.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Int64(_) => Some(DataType::Int64),
            Self::Float64(_) => Some(DataType::Float64),
            Self::Bool(_) => Some(DataType::Bool),
            Self::Utf8(_) => Some(DataType::Utf8),
            Self::Date(_) => Some(DataType::Date),
        }
    }

    /// Numeric view of `Int64` / `Float64` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int64(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Compare two non-null values of comparable types.
    ///
    /// Returns `None` if either side is null or the types cannot be ordered against each other.
    /// `Int64` and `Float64` compare numerically.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Int64(a), Self::Int64(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Utf8(a), Self::Utf8(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Total order over all values: numbers, then bools, dates, strings, and nulls last.
    ///
    /// NaN orders after every other number.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self
                    .compare(other)
                    .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank())),
            },
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Int64(_) | Self::Float64(_) => 0,
            Self::Bool(_) => 1,
            Self::Date(_) => 2,
            Self::Utf8(_) => 3,
            Self::Null => 4,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Utf8(v) => f.write_str(v),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// [`Value`] wrapper ordered by [`Value::total_cmp`], usable as a `BTreeMap` key.
#[derive(Debug, Clone)]
pub(crate) struct OrdValue(pub(crate) Value);

impl PartialEq for OrdValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrdValue {}

impl PartialOrd for OrdValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the values of the column at `idx`, in row order.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| row.get(idx).unwrap_or(&Value::Null))
    }

    /// Iterate the values of a column by name.
    pub fn column<'a>(
        &'a self,
        name: &str,
    ) -> PipelineResult<impl Iterator<Item = &'a Value> + use<'a>> {
        let idx = self.schema.require(name)?;
        Ok(self.column_values(idx))
    }

    /// Total number of missing cells.
    pub fn null_count(&self) -> usize {
        self.reduce_rows(0, |acc, row| acc + row.iter().filter(|v| v.is_null()).count())
    }

    /// Create a new dataset containing only rows that match `predicate`.
    ///
    /// The returned dataset preserves the original schema.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Create a new dataset by applying `mapper` to every row.
    ///
    /// Fails with [`PipelineError::SchemaMismatch`] if `mapper` returns a row whose length differs
    /// from the field count of `schema`.
    pub fn map_rows<F>(&self, schema: Schema, mut mapper: F) -> PipelineResult<Self>
    where
        F: FnMut(&[Value]) -> Vec<Value>,
    {
        let expected_len = schema.fields.len();
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let out = mapper(row.as_slice());
                if out.len() == expected_len {
                    Ok(out)
                } else {
                    Err(PipelineError::SchemaMismatch {
                        message: format!(
                            "row {idx}: mapped row length {} does not match schema length {expected_len}",
                            out.len()
                        ),
                    })
                }
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        Ok(Self { schema, rows })
    }

    /// Create a new dataset with rows taken at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Reduce (fold) all rows into an accumulator value.
    ///
    /// This is similar to `Iterator::fold`, but provides each row as `&[Value]`.
    pub fn reduce_rows<A, F>(&self, init: A, mut reducer: F) -> A
    where
        F: FnMut(A, &[Value]) -> A,
    {
        self.rows
            .iter()
            .fold(init, |acc, row| reducer(acc, row.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::*;

    #[test]
    fn schema_validate_rejects_empty_and_duplicates() {
        assert!(Schema::new(vec![]).validate().is_err());
        let dup = Schema::new(vec![
            Field::new("a", DataType::Int64),
            Field::new("a", DataType::Utf8),
        ]);
        let err = dup.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate column 'a'"));
    }

    #[test]
    fn require_reports_missing_column() {
        let schema = Schema::new(vec![Field::new("id", DataType::Int64)]);
        assert_eq!(schema.require("id").unwrap(), 0);
        assert!(matches!(
            schema.require("nope"),
            Err(PipelineError::ColumnNotFound { column }) if column == "nope"
        ));
    }

    #[test]
    fn compare_mixes_int_and_float_but_not_null() {
        assert_eq!(
            Value::Int64(2).compare(&Value::Float64(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Null.compare(&Value::Int64(1)), None);
        assert_eq!(Value::Utf8("a".into()).compare(&Value::Int64(1)), None);
    }

    #[test]
    fn total_cmp_puts_nulls_last() {
        let mut values = vec![Value::Null, Value::Int64(3), Value::Float64(1.0)];
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(
            values,
            vec![Value::Float64(1.0), Value::Int64(3), Value::Null]
        );
    }

    #[test]
    fn map_rows_rejects_rows_of_the_wrong_width() {
        let schema = Schema::new(vec![Field::new("a", DataType::Int64)]);
        let ds = DataSet::new(schema.clone(), vec![vec![Value::Int64(1)]]);

        let doubled = ds
            .map_rows(schema.clone(), |row| vec![Value::Int64(row.len() as i64 * 2)])
            .unwrap();
        assert_eq!(doubled.rows, vec![vec![Value::Int64(2)]]);

        let err = ds
            .map_rows(schema, |row| row.iter().chain(row).cloned().collect())
            .unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn null_count_counts_missing_cells() {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Int64),
            Field::new("b", DataType::Utf8),
        ]);
        let ds = DataSet::new(
            schema,
            vec![
                vec![Value::Null, Value::Utf8("x".into())],
                vec![Value::Null, Value::Null],
            ],
        );
        assert_eq!(ds.null_count(), 3);
    }
}
