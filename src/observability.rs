//! Observer hooks for pipeline stages.
//!
//! The pipeline reports every stage start, success, failure and non-fatal warning to an optional
//! [`PipelineObserver`]. Failures are classified by [`Severity`]; failures at or above the
//! configured threshold are additionally forwarded to [`PipelineObserver::on_alert`].

use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::error::PipelineError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Sort,
    Filter,
    FillMissing,
    Transform,
    Aggregate,
    Merge,
    Write,
    Plot,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Sort => "sort",
            Self::Filter => "filter",
            Self::FillMissing => "fill_missing",
            Self::Transform => "transform",
            Self::Aggregate => "aggregate",
            Self::Merge => "merge",
            Self::Write => "write",
            Self::Plot => "plot",
        };
        f.write_str(name)
    }
}

/// Context about one stage invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    /// Which stage is running.
    pub stage: Stage,
    /// Human-readable parameters (path, column, expression, ...).
    pub detail: String,
}

impl StageContext {
    pub fn new(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            detail: detail.into(),
        }
    }
}

/// Stats reported when a stage succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    /// Rows entering the stage (0 for the loader).
    pub rows_in: usize,
    /// Rows leaving the stage.
    pub rows_out: usize,
    /// Wall-clock time spent in the stage.
    pub elapsed: Duration,
}

/// Observer interface for pipeline outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait PipelineObserver: Send + Sync {
    /// Called before a stage runs.
    fn on_stage_start(&self, _ctx: &StageContext) {}

    /// Called when a stage succeeds.
    fn on_success(&self, _ctx: &StageContext, _stats: StageStats) {}

    /// Called when a stage fails.
    fn on_failure(&self, _ctx: &StageContext, _severity: Severity, _error: &PipelineError) {}

    /// Called when a stage failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called for non-fatal problems (e.g. the plot viewer could not be launched).
    fn on_warning(&self, _ctx: &StageContext, _message: &str) {}
}

/// Classify an error for alerting: infrastructure (I/O) failures are critical.
pub fn severity_for_error(e: &PipelineError) -> Severity {
    match e {
        PipelineError::Io(_) => Severity::Critical,
        PipelineError::Csv(err) => match err.kind() {
            csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        // Best-effort: workbook errors often wrap IO, but not always in a structured way.
        PipelineError::Excel(_) | PipelineError::Xlsx(_) if error_chain_contains_io(e) => {
            Severity::Critical
        }
        _ => Severity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_stage_start(&self, ctx: &StageContext) {
        for o in &self.observers {
            o.on_stage_start(ctx);
        }
    }

    fn on_success(&self, ctx: &StageContext, stats: StageStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_warning(&self, ctx: &StageContext, message: &str) {
        for o in &self.observers {
            o.on_warning(ctx, message);
        }
    }
}

/// Logs pipeline events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl PipelineObserver for StdErrObserver {
    fn on_success(&self, ctx: &StageContext, stats: StageStats) {
        eprintln!(
            "[pipeline][ok] stage={} {} rows_in={} rows_out={} elapsed_ms={}",
            ctx.stage,
            ctx.detail,
            stats.rows_in,
            stats.rows_out,
            stats.elapsed.as_millis()
        );
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        eprintln!(
            "[pipeline][{:?}] stage={} {} err={}",
            severity, ctx.stage, ctx.detail, error
        );
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        eprintln!(
            "[ALERT][pipeline][{:?}] stage={} {} err={}",
            severity, ctx.stage, ctx.detail, error
        );
    }

    fn on_warning(&self, ctx: &StageContext, message: &str) {
        eprintln!("[pipeline][warn] stage={} {}", ctx.stage, message);
    }
}

/// Appends pipeline events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_success(&self, ctx: &StageContext, stats: StageStats) {
        self.append_line(&format!(
            "{} ok stage={} {} rows_in={} rows_out={}",
            unix_ts(),
            ctx.stage,
            ctx.detail,
            stats.rows_in,
            stats.rows_out
        ));
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        self.append_line(&format!(
            "{} fail severity={:?} stage={} {} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.detail,
            error
        ));
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} stage={} {} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.detail,
            error
        ));
    }

    fn on_warning(&self, ctx: &StageContext, message: &str) {
        self.append_line(&format!(
            "{} warn stage={} {}",
            unix_ts(),
            ctx.stage,
            message
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
