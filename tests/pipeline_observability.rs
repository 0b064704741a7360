use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use data_pipeline::config::PipelineConfig;
use data_pipeline::ingestion::{FileFormat, IngestionRequest};
use data_pipeline::observability::{
    CompositeObserver, FileObserver, PipelineObserver, Severity, Stage, StageContext, StageStats,
};
use data_pipeline::pipeline::Pipeline;
use data_pipeline::PipelineError;

#[derive(Default)]
struct RecordingObserver {
    started: Mutex<Vec<Stage>>,
    succeeded: Mutex<Vec<(Stage, usize, usize)>>,
    failures: Mutex<Vec<(Stage, Severity)>>,
    alerts: Mutex<Vec<(Stage, Severity)>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_stage_start(&self, ctx: &StageContext) {
        self.started.lock().unwrap().push(ctx.stage);
    }

    fn on_success(&self, ctx: &StageContext, stats: StageStats) {
        self.succeeded
            .lock()
            .unwrap()
            .push((ctx.stage, stats.rows_in, stats.rows_out));
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, _error: &PipelineError) {
        self.failures.lock().unwrap().push((ctx.stage, severity));
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, _error: &PipelineError) {
        self.alerts.lock().unwrap().push((ctx.stage, severity));
    }
}

fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("data-pipeline-obs-{name}-{nanos}.{ext}"))
}

fn config(input: &str, output: &PathBuf) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.input = IngestionRequest::new(input, FileFormat::Csv);
    config.output.path = output.clone();
    config.plot = None;
    config
}

#[test]
fn successful_run_reports_every_stage_in_order() {
    let output = tmp_file("ok", "xlsx");
    let obs = Arc::new(RecordingObserver::default());

    Pipeline::new(config("tests/fixtures/scores.csv", &output))
        .with_observer(obs.clone())
        .run()
        .unwrap();

    let started = obs.started.lock().unwrap().clone();
    assert_eq!(
        started,
        vec![
            Stage::Load,
            Stage::Sort,
            Stage::Filter,
            Stage::FillMissing,
            Stage::Transform,
            Stage::Aggregate,
            Stage::Write,
        ]
    );

    let succeeded = obs.succeeded.lock().unwrap().clone();
    assert_eq!(succeeded[0], (Stage::Load, 0, 2));
    assert_eq!(succeeded[2], (Stage::Filter, 2, 1));
    assert_eq!(succeeded[6], (Stage::Write, 1, 1));
    assert!(obs.failures.lock().unwrap().is_empty());

    let _ = std::fs::remove_file(output);
}

#[test]
fn missing_input_is_critical_and_alerts() {
    let output = tmp_file("missing", "xlsx");
    let obs = Arc::new(RecordingObserver::default());

    let err = Pipeline::new(config("tests/fixtures/does_not_exist.csv", &output))
        .with_observer(obs.clone())
        .run()
        .unwrap_err();
    assert!(matches!(err, PipelineError::Csv(_) | PipelineError::Io(_)));

    assert_eq!(
        obs.failures.lock().unwrap().clone(),
        vec![(Stage::Load, Severity::Critical)]
    );
    assert_eq!(
        obs.alerts.lock().unwrap().clone(),
        vec![(Stage::Load, Severity::Critical)]
    );
    assert!(obs.succeeded.lock().unwrap().is_empty());
}

#[test]
fn non_critical_failure_alerts_only_at_a_lower_threshold() {
    let output = tmp_file("bad-filter", "xlsx");

    let obs = Arc::new(RecordingObserver::default());
    let mut cfg = config("tests/fixtures/scores.csv", &output);
    cfg.filter = Some("Score >".to_string());
    let _ = Pipeline::new(cfg.clone())
        .with_observer(obs.clone())
        .run()
        .unwrap_err();
    assert_eq!(
        obs.failures.lock().unwrap().clone(),
        vec![(Stage::Filter, Severity::Error)]
    );
    assert!(obs.alerts.lock().unwrap().is_empty());

    let obs = Arc::new(RecordingObserver::default());
    cfg.alert_at_or_above = Severity::Error;
    let _ = Pipeline::new(cfg).with_observer(obs.clone()).run().unwrap_err();
    assert_eq!(
        obs.alerts.lock().unwrap().clone(),
        vec![(Stage::Filter, Severity::Error)]
    );
}

#[test]
fn composite_fans_out_and_file_observer_appends_lines() {
    let output = tmp_file("composite", "xlsx");
    let log = tmp_file("events", "log");
    let recorder = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn PipelineObserver>> =
        vec![recorder.clone(), Arc::new(FileObserver::new(&log))];
    let composite = CompositeObserver::new(observers);

    Pipeline::new(config("tests/fixtures/scores.csv", &output))
        .with_observer(Arc::new(composite))
        .run()
        .unwrap();

    assert_eq!(recorder.succeeded.lock().unwrap().len(), 7);
    let text = std::fs::read_to_string(&log).unwrap();
    assert_eq!(text.lines().count(), 7);
    assert!(text.contains("ok stage=load"));
    assert!(text.contains("ok stage=aggregate group_by=Name spec=Score:mean"));

    let _ = std::fs::remove_file(output);
    let _ = std::fs::remove_file(log);
}
