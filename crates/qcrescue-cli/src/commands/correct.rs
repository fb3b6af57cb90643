use super::{Handler, prepare};
use crate::cli::CorrectArgs;
use crate::config::runner_path_for;
use crate::error::{CliError, Result};
use qcrescue::core::io::results::JsonResultsParser;
use qcrescue::engine::runner::{CommandRegistry, JobRunner};
use qcrescue::engine::snapshot::HandlerSnapshot;
use qcrescue::workflows::handler::{CorrectionReport, QChemErrorHandler};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn run(args: CorrectArgs) -> Result<()> {
    let Some(report) = correct_job(&args)? else {
        println!("No errors found in the last run; nothing to correct.");
        return Ok(());
    };

    let json = serde_json::to_string_pretty(&report).map_err(|e| CliError::Other(e.into()))?;
    println!("{}", json);
    if report.is_exhausted() {
        warn!("Every available fix for this error has been tried.");
        println!("No further correction is available for this job.");
    }
    Ok(())
}

/// Runs one correction cycle. Returns `None` when the last run had no error.
fn correct_job(args: &CorrectArgs) -> Result<Option<CorrectionReport>> {
    let (mut handler, runner_path) = match &args.from_snapshot {
        Some(path) => restore(args, path)?,
        None => {
            let (app, mut handler) = prepare(&args.job)?;
            if !handler.check()? {
                return Ok(None);
            }
            (handler, app.runner_path)
        }
    };

    let report = handler.correct()?;
    if !report.is_exhausted() {
        info!("Saving runner state to {:?}", &runner_path);
        handler.runner().save(&runner_path)?;
        info!(
            mode = %handler.runner().current_command(),
            "Next launch: {}",
            handler.runner().command_line()
        );
    }

    if let Some(path) = &args.snapshot {
        info!("Writing handler snapshot to {:?}", path);
        handler.snapshot().save(path)?;
    }
    Ok(Some(report))
}

fn restore(args: &CorrectArgs, path: &Path) -> Result<(Handler, PathBuf)> {
    info!("Restoring handler from snapshot {:?}", path);
    let snapshot = HandlerSnapshot::load(path)?;
    let runner_path = runner_path_for(&args.job, &snapshot.config);
    let runner = CommandRegistry::load(&runner_path)?;
    let handler = QChemErrorHandler::from_snapshot(snapshot, JsonResultsParser, runner)?;
    Ok((handler, runner_path))
}
