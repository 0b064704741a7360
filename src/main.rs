use std::process::ExitCode;
use std::sync::Arc;

use data_pipeline::config::PipelineConfig;
use data_pipeline::observability::StdErrObserver;
use data_pipeline::pipeline::Pipeline;
use data_pipeline::PipelineResult;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> PipelineResult<()> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };

    let report = Pipeline::new(config)
        .with_observer(Arc::new(StdErrObserver))
        .run()?;

    match &report.plot_path {
        Some(plot) => println!(
            "Data processing complete. Results saved to '{}' and plot saved to '{}'.",
            report.output_path.display(),
            plot.display()
        ),
        None => println!(
            "Data processing complete. Results saved to '{}'.",
            report.output_path.display()
        ),
    }
    Ok(())
}
