//! Joining two datasets on a shared key column.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Field, OrdValue, Schema, Value};

/// Which rows survive a [`merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl FromStr for JoinKind {
    type Err = PipelineError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(Self::Inner),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "outer" | "full" => Ok(Self::Outer),
            _ => Err(PipelineError::UnsupportedJoinKind {
                tag: tag.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for JoinKind {
    type Error = PipelineError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Outer => "outer",
        })
    }
}

const LEFT_SUFFIX: &str = "_x";
const RIGHT_SUFFIX: &str = "_y";

/// Join `left` and `right` on the column `on`.
///
/// Output columns are every left column in order, then every right column except the key.
/// Non-key names present on both sides get `_x` (left) and `_y` (right) suffixes.
///
/// Row order:
/// - `inner` / `left`: left row order, each left row followed by its right matches in right order.
/// - `right`: right row order, with left matches in left order.
/// - `outer`: ascending key order, rows with a missing key last.
///
/// Missing keys never match. Fails with [`PipelineError::ColumnNotFound`] if `on` is absent from
/// either side, and [`PipelineError::TypeMismatch`] if the key types cannot be compared.
pub fn merge(left: &DataSet, right: &DataSet, on: &str, how: JoinKind) -> PipelineResult<DataSet> {
    let left_key = left.schema.require(on)?;
    let right_key = right.schema.require(on)?;

    let left_type = left.schema.fields[left_key].data_type;
    let right_type = right.schema.fields[right_key].data_type;
    if !left_type.is_comparable_with(right_type) {
        return Err(PipelineError::type_mismatch(
            on,
            format!("cannot join a {left_type} key with a {right_type} key"),
        ));
    }
    let key_type = if left_type == right_type {
        left_type
    } else {
        DataType::Float64
    };

    let schema = merged_schema(&left.schema, &right.schema, left_key, right_key, key_type);
    schema.validate()?;

    let joiner = Joiner {
        left,
        right,
        left_key,
        right_key,
        key_type,
    };

    let rows = match how {
        JoinKind::Inner | JoinKind::Left => {
            let index = key_index(right, right_key);
            let mut rows = Vec::new();
            for (i, row) in left.rows.iter().enumerate() {
                match lookup(&index, key_of(row, left_key)) {
                    Some(matches) => rows.extend(matches.iter().map(|&j| joiner.row(Some(i), Some(j)))),
                    None if how == JoinKind::Left => rows.push(joiner.row(Some(i), None)),
                    None => {}
                }
            }
            rows
        }
        JoinKind::Right => {
            let index = key_index(left, left_key);
            let mut rows = Vec::new();
            for (j, row) in right.rows.iter().enumerate() {
                match lookup(&index, key_of(row, right_key)) {
                    Some(matches) => rows.extend(matches.iter().map(|&i| joiner.row(Some(i), Some(j)))),
                    None => rows.push(joiner.row(None, Some(j))),
                }
            }
            rows
        }
        JoinKind::Outer => {
            let index = key_index(right, right_key);
            let mut matched_right = vec![false; right.row_count()];
            let mut rows = Vec::new();
            for (i, row) in left.rows.iter().enumerate() {
                match lookup(&index, key_of(row, left_key)) {
                    Some(matches) => {
                        for &j in matches {
                            matched_right[j] = true;
                            rows.push(joiner.row(Some(i), Some(j)));
                        }
                    }
                    None => rows.push(joiner.row(Some(i), None)),
                }
            }
            for (j, matched) in matched_right.into_iter().enumerate() {
                if !matched {
                    rows.push(joiner.row(None, Some(j)));
                }
            }
            // Stable, so equal keys keep left-then-right order.
            rows.sort_by(|a: &Vec<Value>, b: &Vec<Value>| {
                let (a, b) = (key_of(a, left_key), key_of(b, left_key));
                match (a.is_null(), b.is_null()) {
                    (true, true) => std::cmp::Ordering::Equal,
                    (true, false) => std::cmp::Ordering::Greater,
                    (false, true) => std::cmp::Ordering::Less,
                    (false, false) => a.total_cmp(b),
                }
            });
            rows
        }
    };

    Ok(DataSet::new(schema, rows))
}

fn merged_schema(
    left: &Schema,
    right: &Schema,
    left_key: usize,
    right_key: usize,
    key_type: DataType,
) -> Schema {
    let shared = |name: &str, other: &Schema, other_key: usize| {
        other
            .fields
            .iter()
            .enumerate()
            .any(|(i, f)| i != other_key && f.name == name)
    };

    let mut fields = Vec::with_capacity(left.len() + right.len() - 1);
    for (i, f) in left.fields.iter().enumerate() {
        if i == left_key {
            fields.push(Field::new(f.name.clone(), key_type));
        } else if shared(&f.name, right, right_key) {
            fields.push(Field::new(format!("{}{LEFT_SUFFIX}", f.name), f.data_type));
        } else {
            fields.push(f.clone());
        }
    }
    for (j, f) in right.fields.iter().enumerate() {
        if j == right_key {
            continue;
        }
        if shared(&f.name, left, left_key) {
            fields.push(Field::new(format!("{}{RIGHT_SUFFIX}", f.name), f.data_type));
        } else {
            fields.push(f.clone());
        }
    }
    Schema::new(fields)
}

fn key_of(row: &[Value], idx: usize) -> &Value {
    row.get(idx).unwrap_or(&Value::Null)
}

fn key_index(dataset: &DataSet, key: usize) -> BTreeMap<OrdValue, Vec<usize>> {
    let mut index: BTreeMap<OrdValue, Vec<usize>> = BTreeMap::new();
    for (pos, v) in dataset.column_values(key).enumerate() {
        if !v.is_null() {
            index.entry(OrdValue(v.clone())).or_default().push(pos);
        }
    }
    index
}

fn lookup<'a>(index: &'a BTreeMap<OrdValue, Vec<usize>>, key: &Value) -> Option<&'a [usize]> {
    if key.is_null() {
        return None;
    }
    index.get(&OrdValue(key.clone())).map(Vec::as_slice)
}

struct Joiner<'a> {
    left: &'a DataSet,
    right: &'a DataSet,
    left_key: usize,
    right_key: usize,
    key_type: DataType,
}

impl Joiner<'_> {
    /// Build one output row; absent sides contribute nulls (the key comes from whichever side exists).
    fn row(&self, left: Option<usize>, right: Option<usize>) -> Vec<Value> {
        let left_row = left.map(|i| self.left.rows[i].as_slice());
        let right_row = right.map(|j| self.right.rows[j].as_slice());

        let key = left_row
            .map(|r| key_of(r, self.left_key))
            .or_else(|| right_row.map(|r| key_of(r, self.right_key)))
            .cloned()
            .unwrap_or(Value::Null);
        let key = match (self.key_type, key) {
            (DataType::Float64, Value::Int64(i)) => Value::Float64(i as f64),
            (_, key) => key,
        };

        let mut out = Vec::with_capacity(self.left.schema.len() + self.right.schema.len() - 1);
        for i in 0..self.left.schema.len() {
            if i == self.left_key {
                out.push(key.clone());
            } else {
                out.push(left_row.map(|r| key_of(r, i).clone()).unwrap_or(Value::Null));
            }
        }
        for j in 0..self.right.schema.len() {
            if j != self.right_key {
                out.push(right_row.map(|r| key_of(r, j).clone()).unwrap_or(Value::Null));
            }
        }
        out
    }
}
