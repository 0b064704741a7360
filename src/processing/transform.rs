//! Per-column value transforms.

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Value};

/// Replace every value of `column` with `f(value)`, in place.
///
/// The field type is re-derived from the produced values: if every non-null result has the same
/// type, the field takes that type (a column that produces only nulls keeps its declared type).
/// `Int64` and `Float64` results mixed in one column widen to `Float64`; any other mix fails with
/// [`PipelineError::TypeMismatch`].
pub fn transform_column<F>(mut dataset: DataSet, column: &str, mut f: F) -> PipelineResult<DataSet>
where
    F: FnMut(&Value) -> Value,
{
    let idx = dataset.schema.require(column)?;

    let mut produced: Option<DataType> = None;
    for row in &mut dataset.rows {
        let Some(cell) = row.get_mut(idx) else {
            continue;
        };
        let next = f(cell);
        if let Some(dt) = next.data_type() {
            produced = Some(match produced {
                None => dt,
                Some(prev) if prev == dt => prev,
                Some(prev) if prev.is_numeric() && dt.is_numeric() => DataType::Float64,
                Some(prev) => {
                    return Err(PipelineError::type_mismatch(
                        column,
                        format!("transform produced both {prev} and {dt} values"),
                    ));
                }
            });
        }
        *cell = next;
    }

    if let Some(dt) = produced {
        if dt == DataType::Float64 {
            for row in &mut dataset.rows {
                if let Some(cell) = row.get_mut(idx) {
                    if let Value::Int64(i) = *cell {
                        *cell = Value::Float64(i as f64);
                    }
                }
            }
        }
        dataset.schema.fields[idx].data_type = dt;
    }

    Ok(dataset)
}

/// Built-in, configuration-friendly column transforms.
///
/// Deserializes from an internally tagged object, e.g. `{"op": "scale", "factor": 1.1}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ColumnTransform {
    /// Multiply by `factor`; always yields `Float64`.
    Scale { factor: f64 },
    /// Add `amount`; always yields `Float64`.
    Offset { amount: f64 },
    /// Round to `decimals` places; always yields `Float64`.
    Round {
        #[serde(default)]
        decimals: u32,
    },
    /// Absolute value; keeps the column type. An `Int64` column holding `i64::MIN` widens to
    /// `Float64`.
    Abs,
    Uppercase,
    Lowercase,
    Trim,
}

impl ColumnTransform {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scale { .. } => "scale",
            Self::Offset { .. } => "offset",
            Self::Round { .. } => "round",
            Self::Abs => "abs",
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::Trim => "trim",
        }
    }

    /// Check that this transform accepts a column of `input` type.
    pub fn check_input(&self, column: &str, input: DataType) -> PipelineResult<()> {
        let ok = match self {
            Self::Scale { .. } | Self::Offset { .. } | Self::Round { .. } | Self::Abs => {
                input.is_numeric()
            }
            Self::Uppercase | Self::Lowercase | Self::Trim => input == DataType::Utf8,
        };
        if ok {
            Ok(())
        } else {
            Err(PipelineError::type_mismatch(
                column,
                format!("'{}' cannot be applied to a {input} column", self.name()),
            ))
        }
    }

    /// Apply to a single value. Nulls (and values of an unsupported type) pass through.
    pub fn apply(&self, value: &Value) -> Value {
        match (self, value) {
            (Self::Scale { factor }, v) if v.as_f64().is_some() => {
                Value::Float64(v.as_f64().unwrap_or_default() * factor)
            }
            (Self::Offset { amount }, v) if v.as_f64().is_some() => {
                Value::Float64(v.as_f64().unwrap_or_default() + amount)
            }
            (Self::Round { decimals }, v) if v.as_f64().is_some() => {
                let scale = 10f64.powi(*decimals as i32);
                Value::Float64((v.as_f64().unwrap_or_default() * scale).round() / scale)
            }
            (Self::Abs, Value::Int64(i)) => match i.checked_abs() {
                Some(abs) => Value::Int64(abs),
                None => Value::Float64((*i as f64).abs()),
            },
            (Self::Abs, Value::Float64(f)) => Value::Float64(f.abs()),
            (Self::Uppercase, Value::Utf8(s)) => Value::Utf8(s.to_uppercase()),
            (Self::Lowercase, Value::Utf8(s)) => Value::Utf8(s.to_lowercase()),
            (Self::Trim, Value::Utf8(s)) => Value::Utf8(s.trim().to_string()),
            (_, v) => v.clone(),
        }
    }
}

/// Apply a [`ColumnTransform`] to `column` after checking it against the column type.
pub fn apply_transform(
    dataset: DataSet,
    column: &str,
    transform: &ColumnTransform,
) -> PipelineResult<DataSet> {
    let idx = dataset.schema.require(column)?;
    let input = dataset.schema.fields[idx].data_type;
    transform.check_input(column, input)?;

    let mut out = transform_column(dataset, column, |v| transform.apply(v))?;
    // Numeric transforms settle on Float64 even when every cell was null.
    if matches!(
        transform,
        ColumnTransform::Scale { .. } | ColumnTransform::Offset { .. } | ColumnTransform::Round { .. }
    ) {
        out.schema.fields[idx].data_type = DataType::Float64;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{apply_transform, transform_column, ColumnTransform};
    use crate::error::PipelineError;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("name", DataType::Utf8),
            Field::new("score", DataType::Int64),
        ]);
        DataSet::new(
            schema,
            vec![
                vec![Value::Utf8(" ada ".into()), Value::Int64(90)],
                vec![Value::Utf8("grace".into()), Value::Null],
                vec![Value::Null, Value::Int64(-10)],
            ],
        )
    }

    #[test]
    fn closure_transform_rederives_field_type() {
        let out = transform_column(sample_dataset(), "score", |v| match v {
            Value::Int64(i) => Value::Float64(*i as f64 / 2.0),
            other => other.clone(),
        })
        .unwrap();

        assert_eq!(out.schema.fields[1].data_type, DataType::Float64);
        assert_eq!(out.rows[0][1], Value::Float64(45.0));
        assert_eq!(out.rows[1][1], Value::Null);
        assert_eq!(out.schema.len(), 2);
    }

    #[test]
    fn closure_transform_rejects_mixed_output_types() {
        let err = transform_column(sample_dataset(), "score", |v| match v {
            Value::Int64(90) => Value::Utf8("high".into()),
            other => other.clone(),
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::TypeMismatch { column, .. } if column == "score"));
    }

    #[test]
    fn missing_column_is_reported() {
        let err = transform_column(sample_dataset(), "nope", |v| v.clone()).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound { column } if column == "nope"));
    }

    #[test]
    fn scale_keeps_nulls_and_yields_floats() {
        let out = apply_transform(
            sample_dataset(),
            "score",
            &ColumnTransform::Scale { factor: 1.5 },
        )
        .unwrap();
        assert_eq!(out.schema.fields[1].data_type, DataType::Float64);
        assert_eq!(out.rows[0][1], Value::Float64(135.0));
        assert_eq!(out.rows[1][1], Value::Null);
        assert_eq!(out.rows[2][1], Value::Float64(-15.0));
    }

    #[test]
    fn abs_preserves_int_type() {
        let out = apply_transform(sample_dataset(), "score", &ColumnTransform::Abs).unwrap();
        assert_eq!(out.schema.fields[1].data_type, DataType::Int64);
        assert_eq!(out.rows[2][1], Value::Int64(10));
    }

    #[test]
    fn abs_widens_instead_of_wrapping_at_int_min() {
        let schema = Schema::new(vec![Field::new("n", DataType::Int64)]);
        let ds = DataSet::new(
            schema,
            vec![vec![Value::Int64(i64::MIN)], vec![Value::Int64(-3)]],
        );
        let out = apply_transform(ds, "n", &ColumnTransform::Abs).unwrap();
        assert_eq!(out.schema.fields[0].data_type, DataType::Float64);
        assert_eq!(out.rows[0][0], Value::Float64(9_223_372_036_854_775_808.0));
        assert_eq!(out.rows[1][0], Value::Float64(3.0));
    }

    #[test]
    fn text_transforms_and_type_checks() {
        let out = apply_transform(sample_dataset(), "name", &ColumnTransform::Trim).unwrap();
        let out = apply_transform(out, "name", &ColumnTransform::Uppercase).unwrap();
        assert_eq!(out.rows[0][0], Value::Utf8("ADA".into()));
        assert_eq!(out.rows[2][0], Value::Null);

        let err = apply_transform(sample_dataset(), "name", &ColumnTransform::Abs).unwrap_err();
        assert!(matches!(err, PipelineError::TypeMismatch { .. }));
    }

    #[test]
    fn deserializes_from_tagged_json() {
        let t: ColumnTransform =
            serde_json::from_str(r#"{"op": "scale", "factor": 1.1}"#).unwrap();
        assert_eq!(t, ColumnTransform::Scale { factor: 1.1 });
        let t: ColumnTransform = serde_json::from_str(r#"{"op": "round"}"#).unwrap();
        assert_eq!(t, ColumnTransform::Round { decimals: 0 });
    }
}
