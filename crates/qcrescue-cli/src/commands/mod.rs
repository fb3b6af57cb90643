pub mod check;
pub mod correct;

use crate::cli::JobArgs;
use crate::cluster;
use crate::config::{AppConfig, PartialHandlerConfig};
use crate::error::Result;
use qcrescue::core::io::results::JsonResultsParser;
use qcrescue::engine::runner::CommandRegistry;
use qcrescue::workflows::handler::QChemErrorHandler;
use tracing::info;

pub type Handler = QChemErrorHandler<JsonResultsParser, CommandRegistry>;

/// Merges file, arguments and environment.
fn resolve_config(job: &JobArgs) -> Result<AppConfig> {
    let partial = PartialHandlerConfig::load(job.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    partial.merge_with_cli(job, cluster::detect_from_env())
}

/// Builds a handler around the runner state kept next to the job.
fn prepare(job: &JobArgs) -> Result<(AppConfig, Handler)> {
    let app = resolve_config(job)?;
    info!("Loading runner state from {:?}", &app.runner_path);
    let runner = CommandRegistry::load(&app.runner_path)?;
    let handler = QChemErrorHandler::new(app.handler.clone(), JsonResultsParser, runner);
    Ok((app, handler))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::Path;

    pub const HELIUM_SP: &str = "\
$molecule
0 1
 He 0.0 0.0 0.0
$end

$rem
   jobtype = sp
   method = b3lyp
   basis = 6-31g*
$end
";

    pub const RUNNER: &str = "\
[commands]
default = \"qchem -np 4\"
half-cpus = \"qchem -np 2\"
";

    pub fn write_job(dir: &Path, results_json: &str) {
        fs::write(dir.join("mol.qcinp"), HELIUM_SP).unwrap();
        fs::write(dir.join("mol.qcout.json"), results_json).unwrap();
        fs::write(dir.join("runner.toml"), RUNNER).unwrap();
    }
}
