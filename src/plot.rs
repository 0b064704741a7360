//! Line chart rendering with `plotters`.
//!
//! [`plot`] draws `y` over `x` as a blue line with circle markers onto a 1000×600 PNG, titled
//! `"<y> over <x>"`, with a grid and axis descriptions. The y column must be numeric. The x column
//! picks the axis kind:
//!
//! - `Int64` / `Float64`: numeric axis
//! - `Date`: time axis labelled `YYYY-MM-DD`
//! - `Utf8` / `Bool`: categorical axis, categories in order of first appearance
//!
//! Rows with a missing (or non-finite) x or y value are skipped.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;
use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Value};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;
const MARKER_RADIUS: i32 = 4;

/// Where and what to plot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    /// Column on the horizontal axis.
    pub x: String,
    /// Numeric column on the vertical axis.
    pub y: String,
    /// PNG output path.
    pub path: PathBuf,
    /// Open the image in a viewer after writing it.
    pub show: bool,
    /// Viewer command, run as `<viewer> <path>`. When `None` the platform opener is used:
    /// `open -W` on macOS and `start /WAIT` on Windows wait for the viewer to close, `xdg-open`
    /// on other systems returns as soon as it has handed the file off. Set a viewer that blocks
    /// (e.g. `feh`, `eog`) to wait there too.
    pub viewer: Option<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            x: "Name".to_string(),
            y: "Score".to_string(),
            path: PathBuf::from("data/plot.png"),
            show: true,
            viewer: None,
        }
    }
}

impl PlotOptions {
    /// Plot `y` over `x` into `path` without opening a viewer.
    pub fn new(x: impl Into<String>, y: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            path: path.into(),
            show: false,
            viewer: None,
        }
    }
}

/// How x positions map back to tick labels.
#[derive(Debug, Clone, PartialEq)]
pub enum XAxis {
    Numeric,
    /// Positions are days since 0001-01-01.
    Date,
    /// Positions are indices into the category list.
    Categorical(Vec<String>),
}

/// Points ready for drawing, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub x_axis: XAxis,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    /// Tick label for an x position.
    pub fn format_x(&self, x: f64) -> String {
        match &self.x_axis {
            XAxis::Numeric => format_number(x),
            XAxis::Date => NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            XAxis::Categorical(labels) => {
                let idx = x.round();
                if (x - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            }
        }
    }

    fn x_range(&self) -> std::ops::Range<f64> {
        match &self.x_axis {
            XAxis::Categorical(labels) => -0.5..(labels.len().max(1) as f64 - 0.5),
            _ => padded_range(self.points.iter().map(|p| p.0)),
        }
    }

    fn y_range(&self) -> std::ops::Range<f64> {
        padded_range(self.points.iter().map(|p| p.1))
    }
}

/// Extract the `(x, y)` points of a plot from `dataset`.
///
/// Fails with [`PipelineError::ColumnNotFound`] if either column is absent and
/// [`PipelineError::TypeMismatch`] if `y` is not numeric.
pub fn prepare_series(dataset: &DataSet, x: &str, y: &str) -> PipelineResult<Series> {
    let x_idx = dataset.schema.require(x)?;
    let y_idx = dataset.schema.require(y)?;

    let y_type = dataset.schema.fields[y_idx].data_type;
    if !y_type.is_numeric() {
        return Err(PipelineError::type_mismatch(
            y,
            format!("plot values must be numeric, found {y_type}"),
        ));
    }

    let x_axis = match dataset.schema.fields[x_idx].data_type {
        DataType::Int64 | DataType::Float64 => XAxis::Numeric,
        DataType::Date => XAxis::Date,
        DataType::Utf8 | DataType::Bool => XAxis::Categorical(Vec::new()),
    };
    let mut series = Series {
        x_axis,
        points: Vec::new(),
    };

    for row in &dataset.rows {
        let yv = match row.get(y_idx).and_then(Value::as_f64) {
            Some(v) if v.is_finite() => v,
            _ => continue,
        };
        let xv = match (&mut series.x_axis, row.get(x_idx).unwrap_or(&Value::Null)) {
            (_, Value::Null) => continue,
            (XAxis::Numeric, v) => match v.as_f64() {
                Some(n) if n.is_finite() => n,
                _ => continue,
            },
            (XAxis::Date, Value::Date(d)) => d.num_days_from_ce() as f64,
            (XAxis::Date, _) => continue,
            (XAxis::Categorical(labels), v) => {
                let label = v.to_string();
                match labels.iter().position(|l| *l == label) {
                    Some(pos) => pos as f64,
                    None => {
                        labels.push(label);
                        (labels.len() - 1) as f64
                    }
                }
            }
        };
        series.points.push((xv, yv));
    }

    Ok(series)
}

/// Render the chart described by `options` to `options.path`.
///
/// Does not open a viewer; see [`display`].
pub fn plot(dataset: &DataSet, options: &PlotOptions) -> PipelineResult<Series> {
    let series = prepare_series(dataset, &options.x, &options.y)?;
    render(&series, &options.x, &options.y, &options.path)?;
    Ok(series)
}

fn render(series: &Series, x: &str, y: &str, path: &Path) -> PipelineResult<()> {
    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{y} over {x}"), ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(series.x_range(), series.y_range())
        .map_err(plot_error)?;

    let format_x = |v: &f64| series.format_x(*v);
    let mut mesh = chart.configure_mesh();
    mesh.x_desc(x).y_desc(y).x_label_formatter(&format_x);
    if let XAxis::Categorical(labels) = &series.x_axis {
        mesh.x_labels(labels.len().max(1));
    }
    mesh.draw().map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(series.points.iter().copied(), &BLUE))
        .map_err(plot_error)?;
    chart
        .draw_series(
            series
                .points
                .iter()
                .map(|&p| Circle::new(p, MARKER_RADIUS, BLUE.filled())),
        )
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Open `path` in `viewer` (or the platform opener) and wait for the command to exit.
///
/// Whether that also waits for the window to close depends on the command; see
/// [`PlotOptions::viewer`].
pub fn display(path: &Path, viewer: Option<&str>) -> PipelineResult<()> {
    let mut cmd = match viewer {
        Some(viewer) => {
            let mut cmd = Command::new(viewer);
            cmd.arg(path);
            cmd
        }
        None => platform_opener(path),
    };

    let status = cmd.status()?;
    if status.success() {
        Ok(())
    } else {
        Err(PipelineError::Plot {
            message: format!("viewer exited with {status}"),
        })
    }
}

#[cfg(target_os = "macos")]
fn platform_opener(path: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg("-W").arg(path);
    cmd
}

#[cfg(target_os = "windows")]
fn platform_opener(path: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", "/WAIT", ""]).arg(path);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_opener(path: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path);
    cmd
}

fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if min == max {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        let s = format!("{v:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn plot_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Plot {
        message: e.to_string(),
    }
}
