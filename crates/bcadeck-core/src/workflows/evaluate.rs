use super::progress::{Progress, ProgressReporter};
use crate::backends::registry::{backend_for, parse_any_path};
use crate::core::config::options::SimulationCode;
use crate::core::result::model::SimulationResult;
use crate::error::ReportError;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// The outcome of parsing one report of a batch.
#[derive(Debug)]
pub struct Evaluated {
    pub path: PathBuf,
    pub outcome: Result<SimulationResult, ReportError>,
}

/// Parses the report at `path`, detecting the code when `code` is `None`.
pub fn evaluate(path: &Path, code: Option<SimulationCode>) -> Result<SimulationResult, ReportError> {
    match code {
        Some(code) => backend_for(code).read_from_path(path),
        None => parse_any_path(path),
    }
}

/// Parses every report in `paths` on the rayon pool.
///
/// Results keep the order of `paths`. A failing report does not stop the batch;
/// its error is returned in its slot.
#[instrument(skip_all, name = "evaluate_workflow", fields(reports = paths.len()))]
pub fn run(paths: &[PathBuf], code: Option<SimulationCode>, reporter: &ProgressReporter) -> Vec<Evaluated> {
    reporter.report(Progress::BatchStart {
        total: paths.len() as u64,
    });

    let evaluated: Vec<Evaluated> = paths
        .par_iter()
        .map(|path| {
            let outcome = evaluate(path, code);
            match &outcome {
                Ok(result) if !result.is_complete() => warn!(
                    path = %path.display(),
                    issues = result.issues().len(),
                    "Report parsed partially"
                ),
                Ok(_) => debug!(path = %path.display(), "Report parsed"),
                Err(e) => warn!(path = %path.display(), error = %e, "Report failed"),
            }
            reporter.report(Progress::ItemFinished {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                ok: outcome.is_ok(),
            });
            Evaluated {
                path: path.clone(),
                outcome,
            }
        })
        .collect();

    let failed = evaluated.iter().filter(|e| e.outcome.is_err()).count();
    info!(parsed = evaluated.len() - failed, failed, "Batch finished");
    reporter.report(Progress::BatchFinish);
    evaluated
}
