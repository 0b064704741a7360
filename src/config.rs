//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is read from JSON with `serde_json`. Every section is optional; missing
//! sections take the values of the reference run, which is also what [`PipelineConfig::default`]
//! returns:
//!
//! ```json
//! {
//!   "input": { "path": "data/input_data.xlsx", "format": "xlsx" },
//!   "sort": { "column": "Date", "ascending": true },
//!   "filter": "Score > 80",
//!   "fill": "mean",
//!   "transform": { "column": "Score", "op": "scale", "factor": 1.1 },
//!   "aggregate": { "group_by": "Name", "spec": { "Score": "mean" } },
//!   "output": { "path": "data/processed_data.xlsx", "format": "xlsx" },
//!   "plot": { "x": "Name", "y": "Score", "path": "data/plot.png", "show": true },
//!   "alert_at_or_above": "critical"
//! }
//! ```
//!
//! Optional stages are disabled with an explicit `null`. Tags (formats, strategies, reductions,
//! join kinds) go through the same `FromStr` impls as the library API.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::PipelineResult;
use crate::ingestion::{FileFormat, IngestionRequest};
use crate::observability::Severity;
use crate::plot::PlotOptions;
use crate::processing::{AggregationSpec, ColumnTransform, FillStrategy, JoinKind, ReduceOp};

/// Full description of one pipeline run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub input: IngestionRequest,
    pub sort: Option<SortConfig>,
    pub filter: Option<String>,
    pub fill: Option<FillStrategy>,
    pub transform: Option<TransformConfig>,
    pub aggregate: Option<AggregateConfig>,
    pub merge: Option<MergeConfig>,
    pub output: OutputConfig,
    pub plot: Option<PlotOptions>,
    /// Failures at or above this severity are also reported as alerts.
    pub alert_at_or_above: Severity,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: IngestionRequest::new("data/input_data.xlsx", FileFormat::Xlsx),
            sort: Some(SortConfig {
                column: "Date".to_string(),
                ascending: true,
            }),
            filter: Some("Score > 80".to_string()),
            fill: Some(FillStrategy::Mean),
            transform: Some(TransformConfig {
                column: "Score".to_string(),
                transform: ColumnTransform::Scale { factor: 1.1 },
            }),
            aggregate: Some(AggregateConfig {
                group_by: "Name".to_string(),
                spec: AggregationSpec::new().with("Score", ReduceOp::Mean),
            }),
            merge: None,
            output: OutputConfig::default(),
            plot: Some(PlotOptions::default()),
            alert_at_or_above: Severity::Critical,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortConfig {
    pub column: String,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

fn default_ascending() -> bool {
    true
}

/// `{"column": "Score", "op": "scale", "factor": 1.1}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransformConfig {
    pub column: String,
    #[serde(flatten)]
    pub transform: ColumnTransform,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggregateConfig {
    pub group_by: String,
    pub spec: AggregationSpec,
}

/// The right-hand table of a merge and how to join it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MergeConfig {
    pub input: IngestionRequest,
    pub on: String,
    #[serde(default)]
    pub how: JoinKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: FileFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/processed_data.xlsx"),
            format: FileFormat::Xlsx,
        }
    }
}
