//! The end-to-end run: load → sort → filter → fill → transform → aggregate → merge → write → plot.
//!
//! A [`Pipeline`] owns its [`PipelineConfig`] and threads one [`DataSet`] through the configured
//! stages. The first failing stage aborts the run.
//!
//! When an observer is attached, every stage reports:
//!
//! - `on_stage_start` before it runs
//! - `on_success` with row counts and elapsed time
//! - `on_failure` with a computed severity
//! - `on_alert` on failure when the severity is >= `alert_at_or_above`
//!
//! Failing to open the plot viewer is reported through `on_warning` and does not fail the run.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::observability::{severity_for_error, PipelineObserver, Stage, StageContext, StageStats};
use crate::output::write_to_path;
use crate::plot;
use crate::processing::{
    aggregate, apply_transform, fill_missing_values, filter_expr, merge, sort, SortOrder,
};
use crate::types::DataSet;

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Rows read by the loader.
    pub input_rows: usize,
    /// Rows in the written table.
    pub output_rows: usize,
    pub output_path: PathBuf,
    /// `None` when plotting is disabled.
    pub plot_path: Option<PathBuf>,
    /// The final table, as written.
    pub result: DataSet,
}

/// Runs a [`PipelineConfig`].
///
/// ```no_run
/// use std::sync::Arc;
///
/// use data_pipeline::config::PipelineConfig;
/// use data_pipeline::observability::StdErrObserver;
/// use data_pipeline::pipeline::Pipeline;
///
/// # fn main() -> Result<(), data_pipeline::PipelineError> {
/// let report = Pipeline::new(PipelineConfig::default())
///     .with_observer(Arc::new(StdErrObserver))
///     .run()?;
/// println!("wrote {} rows to {}", report.output_rows, report.output_path.display());
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Attach an observer for stage events.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the input, process it, write the result and render the plot.
    pub fn run(&self) -> PipelineResult<PipelineReport> {
        let input = &self.config.input;
        let loaded = self.stage(
            StageContext::new(
                Stage::Load,
                format!("path={} format={}", input.path.display(), input.options.format),
            ),
            0,
            || input.run(),
        )?;
        let input_rows = loaded.row_count();

        let result = self.process(loaded)?;
        let rows = result.row_count();

        let output = &self.config.output;
        self.stage(
            StageContext::new(
                Stage::Write,
                format!("path={} format={}", output.path.display(), output.format),
            ),
            rows,
            || write_to_path(&result, &output.path, output.format).map(|()| rows),
        )?;

        let plot_path = match &self.config.plot {
            Some(options) => {
                let ctx = StageContext::new(
                    Stage::Plot,
                    format!("x={} y={} path={}", options.x, options.y, options.path.display()),
                );
                self.stage(ctx.clone(), rows, || {
                    plot::plot(&result, options).map(|series| series.points.len())
                })?;
                if options.show {
                    if let Err(e) = plot::display(&options.path, options.viewer.as_deref()) {
                        self.warn(&ctx, &format!("could not display plot: {e}"));
                    }
                }
                Some(options.path.clone())
            }
            None => None,
        };

        Ok(PipelineReport {
            input_rows,
            output_rows: rows,
            output_path: output.path.clone(),
            plot_path,
            result,
        })
    }

    /// Apply the configured transform stages to `dataset`, in order.
    pub fn process(&self, dataset: DataSet) -> PipelineResult<DataSet> {
        let cfg = &self.config;
        let mut ds = dataset;

        if let Some(s) = &cfg.sort {
            let ctx = StageContext::new(
                Stage::Sort,
                format!("column={} ascending={}", s.column, s.ascending),
            );
            ds = self.stage(ctx, ds.row_count(), || {
                sort(&ds, &s.column, SortOrder::from_ascending(s.ascending))
            })?;
        }

        if let Some(expression) = &cfg.filter {
            let ctx = StageContext::new(Stage::Filter, format!("expr={expression:?}"));
            ds = self.stage(ctx, ds.row_count(), || filter_expr(&ds, expression))?;
        }

        if let Some(strategy) = cfg.fill {
            let ctx = StageContext::new(Stage::FillMissing, format!("strategy={strategy}"));
            ds = self.stage(ctx, ds.row_count(), || fill_missing_values(&ds, strategy))?;
        }

        if let Some(t) = &cfg.transform {
            let ctx = StageContext::new(
                Stage::Transform,
                format!("column={} op={}", t.column, t.transform.name()),
            );
            let rows_in = ds.row_count();
            ds = self.stage(ctx, rows_in, move || apply_transform(ds, &t.column, &t.transform))?;
        }

        if let Some(a) = &cfg.aggregate {
            let ops: Vec<String> = a.spec.iter().map(|(c, op)| format!("{c}:{op}")).collect();
            let ctx = StageContext::new(
                Stage::Aggregate,
                format!("group_by={} spec={}", a.group_by, ops.join(",")),
            );
            ds = self.stage(ctx, ds.row_count(), || aggregate(&ds, &a.group_by, &a.spec))?;
        }

        if let Some(m) = &cfg.merge {
            let ctx = StageContext::new(
                Stage::Merge,
                format!("right={} on={} how={}", m.input.path.display(), m.on, m.how),
            );
            ds = self.stage(ctx, ds.row_count(), || {
                let right = m.input.run()?;
                merge(&ds, &right, &m.on, m.how)
            })?;
        }

        Ok(ds)
    }

    fn stage<T, F>(&self, ctx: StageContext, rows_in: usize, f: F) -> PipelineResult<T>
    where
        T: RowCount,
        F: FnOnce() -> PipelineResult<T>,
    {
        if let Some(obs) = self.observer.as_ref() {
            obs.on_stage_start(&ctx);
        }

        let started = Instant::now();
        let result = f();

        if let Some(obs) = self.observer.as_ref() {
            match &result {
                Ok(out) => obs.on_success(
                    &ctx,
                    StageStats {
                        rows_in,
                        rows_out: out.row_count(),
                        elapsed: started.elapsed(),
                    },
                ),
                Err(e) => {
                    let sev = severity_for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.config.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result
    }

    fn warn(&self, ctx: &StageContext, message: &str) {
        if let Some(obs) = self.observer.as_ref() {
            obs.on_warning(ctx, message);
        }
    }
}

/// Rows produced by a stage, for [`StageStats::rows_out`].
trait RowCount {
    fn row_count(&self) -> usize;
}

impl RowCount for DataSet {
    fn row_count(&self) -> usize {
        DataSet::row_count(self)
    }
}

/// Stages without a table output (write, plot) report a count directly.
impl RowCount for usize {
    fn row_count(&self) -> usize {
        *self
    }
}
