use super::{Handler, resolve_config};
use crate::cli::{CheckArgs, JobArgs};
use crate::error::Result;
use qcrescue::core::io::results::JsonResultsParser;
use qcrescue::engine::detect::Diagnosis;
use qcrescue::engine::runner::CommandRegistry;
use tracing::info;

pub fn run(args: CheckArgs) -> Result<()> {
    match inspect(&args.job)? {
        None => println!("No errors found in the last run."),
        Some(diagnosis) => {
            let labels: Vec<&str> = diagnosis.errors.iter().map(|e| e.label()).collect();
            println!(
                "Step {} failed with: {}",
                diagnosis.error_step_id + 1,
                labels.join(", ")
            );
        }
    }
    Ok(())
}

fn inspect(job: &JobArgs) -> Result<Option<Diagnosis>> {
    let app = resolve_config(job)?;
    info!("Checking run results in {:?}", &app.handler.directory);
    // Detection does not touch the runner.
    let mut handler = Handler::new(app.handler, JsonResultsParser, CommandRegistry::default());
    if !handler.check()? {
        return Ok(None);
    }
    Ok(handler.diagnosis().cloned())
}
