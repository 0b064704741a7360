//! Group-by aggregation.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::PipelineResult;
use crate::types::{DataSet, Field, OrdValue, Schema, Value};

use super::reduce::{reduce_values, ReduceOp};

/// Ordered mapping from column name to the reduction applied to it.
///
/// Deserializes from a JSON object (`{"Score": "mean", "Id": "count"}`), keeping key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationSpec {
    entries: Vec<(String, ReduceOp)>,
}

impl AggregationSpec {
    /// Empty specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `column` reduced by `op`.
    pub fn with(mut self, column: impl Into<String>, op: ReduceOp) -> Self {
        self.entries.push((column.into(), op));
        self
    }

    /// Iterate `(column, op)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ReduceOp)> {
        self.entries.iter().map(|(c, op)| (c.as_str(), *op))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, ReduceOp)> for AggregationSpec {
    fn from_iter<T: IntoIterator<Item = (S, ReduceOp)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(c, op)| (c.into(), op)).collect(),
        }
    }
}

impl<'de> Deserialize<'de> for AggregationSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = AggregationSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to reduction name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((column, op)) = map.next_entry::<String, ReduceOp>()? {
                    entries.push((column, op));
                }
                Ok(AggregationSpec { entries })
            }
        }

        deserializer.deserialize_map(SpecVisitor)
    }
}

/// Group rows by `group_by` and reduce each spec column per group.
///
/// - One output row per distinct non-missing key, in ascending key order. Rows with a missing key
///   are dropped.
/// - Output columns: `group_by`, then the spec columns in spec order. A spec entry for the
///   group-by column itself is named `<column>_<op>` (e.g. `Name_count`).
/// - Fails with [`crate::PipelineError::ColumnNotFound`] for an absent group-by or spec column and
///   [`crate::PipelineError::TypeMismatch`] for numeric reductions over non-numeric columns, before
///   any grouping happens.
pub fn aggregate(
    dataset: &DataSet,
    group_by: &str,
    spec: &AggregationSpec,
) -> PipelineResult<DataSet> {
    let key_idx = dataset.schema.require(group_by)?;

    let mut fields = vec![dataset.schema.fields[key_idx].clone()];
    let mut plan = Vec::with_capacity(spec.len());
    for (column, op) in spec.iter() {
        let idx = dataset.schema.require(column)?;
        let input = dataset.schema.fields[idx].data_type;
        let output_type = op.output_type(column, input)?;
        if idx == key_idx {
            fields.push(Field::new(format!("{column}_{op}"), output_type));
        } else {
            fields.push(Field::new(column, output_type));
        }
        plan.push((idx, input, op));
    }
    let schema = Schema::new(fields);
    schema.validate()?;

    let mut groups: BTreeMap<OrdValue, Vec<usize>> = BTreeMap::new();
    for (pos, key) in dataset.column_values(key_idx).enumerate() {
        if !key.is_null() {
            groups.entry(OrdValue(key.clone())).or_default().push(pos);
        }
    }

    let rows = groups
        .into_iter()
        .map(|(key, positions)| {
            let mut row = Vec::with_capacity(plan.len() + 1);
            row.push(key.0);
            for &(idx, input, op) in &plan {
                let values = positions
                    .iter()
                    .map(|&p| dataset.rows[p].get(idx).unwrap_or(&Value::Null));
                row.push(reduce_values(values, &dataset.schema.fields[idx].name, input, op)?);
            }
            Ok(row)
        })
        .collect::<PipelineResult<Vec<_>>>()?;

    Ok(DataSet::new(schema, rows))
}

#[cfg(test)]
mod tests {
    use super::{aggregate, AggregationSpec};
    use crate::error::PipelineError;
    use crate::processing::reduce::ReduceOp;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn scores() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("Name", DataType::Utf8),
            Field::new("Score", DataType::Int64),
        ]);
        DataSet::new(
            schema,
            vec![
                vec![Value::Utf8("B".into()), Value::Int64(5)],
                vec![Value::Utf8("A".into()), Value::Int64(10)],
                vec![Value::Null, Value::Int64(99)],
                vec![Value::Utf8("A".into()), Value::Int64(20)],
                vec![Value::Utf8("B".into()), Value::Null],
            ],
        )
    }

    #[test]
    fn one_row_per_distinct_key_in_key_order() {
        let spec = AggregationSpec::new().with("Score", ReduceOp::Mean);
        let out = aggregate(&scores(), "Name", &spec).unwrap();

        assert_eq!(
            out.schema.field_names().collect::<Vec<_>>(),
            vec!["Name", "Score"]
        );
        assert_eq!(out.schema.fields[1].data_type, DataType::Float64);
        assert_eq!(
            out.rows,
            vec![
                vec![Value::Utf8("A".into()), Value::Float64(15.0)],
                vec![Value::Utf8("B".into()), Value::Float64(5.0)],
            ]
        );
    }

    #[test]
    fn count_and_size_differ_on_missing_values() {
        let spec: AggregationSpec = [("Score", ReduceOp::Size)].into_iter().collect();
        let out = aggregate(&scores(), "Name", &spec).unwrap();
        assert_eq!(out.rows[1][1], Value::Int64(2));

        let spec = AggregationSpec::new().with("Score", ReduceOp::Count);
        let out = aggregate(&scores(), "Name", &spec).unwrap();
        assert_eq!(out.rows[1][1], Value::Int64(1));
    }

    #[test]
    fn reducing_the_group_by_column_gets_a_suffixed_name() {
        let spec = AggregationSpec::new()
            .with("Name", ReduceOp::Count)
            .with("Score", ReduceOp::Sum);
        let out = aggregate(&scores(), "Name", &spec).unwrap();

        assert_eq!(
            out.schema.field_names().collect::<Vec<_>>(),
            vec!["Name", "Name_count", "Score"]
        );
        assert_eq!(
            out.rows[0],
            vec![Value::Utf8("A".into()), Value::Int64(2), Value::Int64(30)]
        );
    }

    #[test]
    fn rejects_missing_columns_and_bad_types_up_front() {
        let spec = AggregationSpec::new().with("Nope", ReduceOp::Sum);
        assert!(matches!(
            aggregate(&scores(), "Name", &spec),
            Err(PipelineError::ColumnNotFound { column }) if column == "Nope"
        ));
        assert!(matches!(
            aggregate(&scores(), "Missing", &AggregationSpec::new()),
            Err(PipelineError::ColumnNotFound { .. })
        ));

        let spec = AggregationSpec::new().with("Name", ReduceOp::Mean);
        assert!(matches!(
            aggregate(&scores(), "Score", &spec),
            Err(PipelineError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn spec_deserializes_in_declaration_order() {
        let spec: AggregationSpec =
            serde_json::from_str(r#"{"Score": "max", "Id": "count", "Amount": "avg"}"#).unwrap();
        assert_eq!(
            spec.iter().collect::<Vec<_>>(),
            vec![
                ("Score", ReduceOp::Max),
                ("Id", ReduceOp::Count),
                ("Amount", ReduceOp::Mean),
            ]
        );

        let err = serde_json::from_str::<AggregationSpec>(r#"{"Score": "mode"}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported aggregation"));
    }
}
