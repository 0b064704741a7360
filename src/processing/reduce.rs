//! Reduction operations for [`crate::types::DataSet`] columns.
//!
//! Reductions ignore missing values. If a column (or group) has no non-null values, every
//! reduction except `Count`/`Size` returns [`Value::Null`].

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Value};

/// Built-in reduction operations over a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ReduceOp {
    /// Count non-null values.
    Count,
    /// Count all rows (including nulls).
    Size,
    /// Sum numeric values.
    Sum,
    /// Arithmetic mean of numeric values.
    Mean,
    /// Median of numeric values (average of the two middle values for even counts).
    Median,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Sample standard deviation of numeric values (`n - 1` denominator).
    Std,
    /// First non-null value.
    First,
    /// Last non-null value.
    Last,
}

impl ReduceOp {
    /// The name accepted by [`ReduceOp::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Size => "size",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Std => "std",
            Self::First => "first",
            Self::Last => "last",
        }
    }

    /// The type produced by reducing a column of `input` type.
    ///
    /// Fails with [`PipelineError::TypeMismatch`] for numeric-only reductions over non-numeric
    /// columns.
    pub fn output_type(self, column: &str, input: DataType) -> PipelineResult<DataType> {
        match self {
            Self::Count | Self::Size => Ok(DataType::Int64),
            Self::Min | Self::Max | Self::First | Self::Last => Ok(input),
            Self::Sum | Self::Mean | Self::Median | Self::Std if !input.is_numeric() => {
                Err(PipelineError::type_mismatch(
                    column,
                    format!("'{}' requires a numeric column, found {input}", self.name()),
                ))
            }
            Self::Sum => Ok(input),
            Self::Mean | Self::Median | Self::Std => Ok(DataType::Float64),
        }
    }
}

impl FromStr for ReduceOp {
    type Err = PipelineError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name.trim().to_ascii_lowercase().as_str() {
            "count" => Self::Count,
            "size" => Self::Size,
            "sum" => Self::Sum,
            "mean" | "avg" | "average" => Self::Mean,
            "median" => Self::Median,
            "min" => Self::Min,
            "max" => Self::Max,
            "std" => Self::Std,
            "first" => Self::First,
            "last" => Self::Last,
            _ => {
                return Err(PipelineError::UnsupportedAggregation {
                    name: name.to_string(),
                });
            }
        })
    }
}

impl TryFrom<String> for ReduceOp {
    type Error = PipelineError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reduce a whole column using a built-in [`ReduceOp`].
///
/// - Fails with [`PipelineError::ColumnNotFound`] if `column` does not exist in the schema.
/// - Fails with [`PipelineError::TypeMismatch`] for numeric reductions over non-numeric columns.
pub fn reduce(dataset: &DataSet, column: &str, op: ReduceOp) -> PipelineResult<Value> {
    let idx = dataset.schema.require(column)?;
    let data_type = dataset.schema.fields[idx].data_type;
    op.output_type(column, data_type)?;
    reduce_values(dataset.column_values(idx), column, data_type, op)
}

/// Reduce an arbitrary sequence of values that share `data_type`.
///
/// Callers check [`ReduceOp::output_type`] first; numeric reductions skip non-numeric values.
/// An `Int64` sum that overflows fails with [`PipelineError::TypeMismatch`] on `column`.
pub(crate) fn reduce_values<'a, I>(
    values: I,
    column: &str,
    data_type: DataType,
    op: ReduceOp,
) -> PipelineResult<Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let values: Vec<&Value> = values.into_iter().collect();
    let total = values.len();
    let mut non_null = values.into_iter().filter(|v| !v.is_null());

    Ok(match op {
        ReduceOp::Size => Value::Int64(total as i64),
        ReduceOp::Count => Value::Int64(non_null.count() as i64),
        ReduceOp::First => non_null.next().cloned().unwrap_or(Value::Null),
        ReduceOp::Last => non_null.last().cloned().unwrap_or(Value::Null),
        ReduceOp::Min => non_null
            .min_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
        ReduceOp::Max => non_null
            .max_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
        ReduceOp::Sum => match data_type {
            DataType::Int64 => {
                let mut acc: Option<i64> = None;
                for v in non_null {
                    if let Value::Int64(v) = v {
                        let next = match acc {
                            None => *v,
                            Some(a) => a.checked_add(*v).ok_or_else(|| {
                                PipelineError::type_mismatch(column, "int64 sum overflows")
                            })?,
                        };
                        acc = Some(next);
                    }
                }
                acc.map(Value::Int64).unwrap_or(Value::Null)
            }
            _ => {
                let nums: Vec<f64> = non_null.filter_map(Value::as_f64).collect();
                if nums.is_empty() {
                    Value::Null
                } else {
                    Value::Float64(nums.iter().sum())
                }
            }
        },
        ReduceOp::Mean => {
            let nums: Vec<f64> = non_null.filter_map(Value::as_f64).collect();
            mean(&nums).map(Value::Float64).unwrap_or(Value::Null)
        }
        ReduceOp::Median => {
            let mut nums: Vec<f64> = non_null.filter_map(Value::as_f64).collect();
            median(&mut nums).map(Value::Float64).unwrap_or(Value::Null)
        }
        ReduceOp::Std => {
            let nums: Vec<f64> = non_null.filter_map(Value::as_f64).collect();
            sample_std(&nums).map(Value::Float64).unwrap_or(Value::Null)
        }
    })
}

fn mean(nums: &[f64]) -> Option<f64> {
    if nums.is_empty() {
        None
    } else {
        Some(nums.iter().sum::<f64>() / nums.len() as f64)
    }
}

fn median(nums: &mut [f64]) -> Option<f64> {
    if nums.is_empty() {
        return None;
    }
    nums.sort_by(|a, b| a.total_cmp(b));
    let mid = nums.len() / 2;
    if nums.len() % 2 == 0 {
        Some((nums[mid - 1] + nums[mid]) / 2.0)
    } else {
        Some(nums[mid])
    }
}

fn sample_std(nums: &[f64]) -> Option<f64> {
    if nums.len() < 2 {
        return None;
    }
    let m = mean(nums)?;
    let var = nums.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (nums.len() - 1) as f64;
    Some(var.sqrt())
}
