use crate::cli::JobArgs;
use crate::error::{CliError, Result};
use qcrescue::engine::config::{ClusterProfile, HandlerConfig, HandlerConfigBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_RUNNER_FILE: &str = "runner.toml";

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialFilesConfig {
    directory: Option<PathBuf>,
    input: Option<String>,
    output: Option<String>,
    runner: Option<PathBuf>,
    #[serde(rename = "extra-backup")]
    extra_backup: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialThresholdsConfig {
    #[serde(rename = "rca-gdm-thresh")]
    rca_gdm_thresh: Option<f64>,
    #[serde(rename = "scf-max-cycles")]
    scf_max_cycles: Option<usize>,
    #[serde(rename = "geom-max-cycles")]
    geom_max_cycles: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialClusterConfig {
    name: Option<String>,
    #[serde(rename = "assumed-cpus")]
    assumed_cpus: Option<usize>,
    #[serde(rename = "empty-input-backoff-secs")]
    empty_input_backoff_secs: Option<u64>,
}

/// Settings read from the optional `--config` TOML file.
///
/// ```toml
/// [files]
/// directory = "/scratch/job-42"
/// input = "mol.qcinp"
/// extra-backup = ["mol.qcout"]
///
/// [thresholds]
/// rca-gdm-thresh = 1e-3
///
/// [cluster]
/// assumed-cpus = 16
/// ```
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialHandlerConfig {
    files: Option<PartialFilesConfig>,
    thresholds: Option<PartialThresholdsConfig>,
    cluster: Option<PartialClusterConfig>,
}

/// Everything a command needs once the file, the arguments and the environment are merged.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub handler: HandlerConfig,
    pub runner_path: PathBuf,
}

impl PartialHandlerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Command-line values win over the file, the file wins over the detected cluster and the
    /// built-in defaults.
    pub fn merge_with_cli(mut self, args: &JobArgs, detected: ClusterProfile) -> Result<AppConfig> {
        let files = self.files.take().unwrap_or_default();
        let thresholds = self.thresholds.take().unwrap_or_default();
        let cluster = Self::merge_cluster(self.cluster.take(), args.cluster_cpus, detected);

        let directory = args
            .directory
            .clone()
            .or(files.directory)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut extra_backup = files.extra_backup.unwrap_or_default();
        for file in &args.extra_backup {
            if !extra_backup.contains(file) {
                extra_backup.push(file.clone());
            }
        }

        let mut builder = HandlerConfigBuilder::new()
            .directory(&directory)
            .extra_backup_files(extra_backup)
            .cluster(cluster);
        if let Some(input) = args.input.as_ref().or(files.input.as_ref()) {
            builder = builder.input_file(input);
        }
        if let Some(output) = args.output.as_ref().or(files.output.as_ref()) {
            builder = builder.output_file(output);
        }
        if let Some(thresh) = args.rca_gdm_thresh.or(thresholds.rca_gdm_thresh) {
            builder = builder.rca_gdm_thresh(thresh);
        }
        if let Some(cycles) = args.scf_max_cycles.or(thresholds.scf_max_cycles) {
            builder = builder.scf_max_cycles(cycles);
        }
        if let Some(cycles) = args.geom_max_cycles.or(thresholds.geom_max_cycles) {
            builder = builder.geom_max_cycles(cycles);
        }

        let runner_path = args
            .runner
            .clone()
            .or(files.runner)
            .unwrap_or_else(|| directory.join(DEFAULT_RUNNER_FILE));

        Ok(AppConfig {
            handler: builder.build()?,
            runner_path,
        })
    }

    fn merge_cluster(
        file: Option<PartialClusterConfig>,
        cli_cpus: Option<usize>,
        detected: ClusterProfile,
    ) -> ClusterProfile {
        let file = file.unwrap_or_default();
        ClusterProfile {
            name: file.name.unwrap_or(detected.name),
            assumed_cpus: cli_cpus
                .or(file.assumed_cpus)
                .unwrap_or(detected.assumed_cpus),
            empty_input_backoff_secs: file
                .empty_input_backoff_secs
                .or(detected.empty_input_backoff_secs),
        }
    }
}

/// Runner state file used when replaying a snapshot.
pub fn runner_path_for(args: &JobArgs, handler: &HandlerConfig) -> PathBuf {
    args.runner
        .clone()
        .unwrap_or_else(|| handler.directory.join(DEFAULT_RUNNER_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use qcrescue::engine::config::ConfigError;
    use std::fs;
    use tempfile::tempdir;

    fn job_args(extra: &[&str]) -> JobArgs {
        let mut argv = vec!["qcrescue", "correct"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Correct(args) => args.job,
            Commands::Check(args) => args.job,
        }
    }

    fn hopper() -> ClusterProfile {
        ClusterProfile::new("hopper", 24, Some(1800))
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let app = PartialHandlerConfig::default()
            .merge_with_cli(&job_args(&[]), ClusterProfile::generic())
            .unwrap();
        assert_eq!(app.handler.directory, PathBuf::from("."));
        assert_eq!(app.handler.input_file, "mol.qcinp");
        assert_eq!(app.handler.output_file, "mol.qcout.json");
        assert_eq!(app.handler.scf_max_cycles, 200);
        assert_eq!(app.handler.cluster, ClusterProfile::generic());
        assert_eq!(app.runner_path, PathBuf::from("./runner.toml"));
    }

    #[test]
    fn file_values_are_loaded_and_merged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qcrescue.toml");
        fs::write(
            &path,
            r#"
            [files]
            directory = "/scratch/job-42"
            input = "opt.qcinp"
            extra-backup = ["mol.qcout"]

            [thresholds]
            rca-gdm-thresh = 1e-4
            geom-max-cycles = 500

            [cluster]
            assumed-cpus = 16
            "#,
        )
        .unwrap();

        let app = PartialHandlerConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&job_args(&[]), hopper())
            .unwrap();
        assert_eq!(app.handler.directory, PathBuf::from("/scratch/job-42"));
        assert_eq!(app.handler.input_file, "opt.qcinp");
        assert_eq!(app.handler.extra_backup_files, vec!["mol.qcout"]);
        assert_eq!(app.handler.rca_gdm_thresh, 1e-4);
        assert_eq!(app.handler.geom_max_cycles, 500);
        assert_eq!(app.handler.scf_max_cycles, 200);
        assert_eq!(app.handler.cluster, ClusterProfile::new("hopper", 16, Some(1800)));
        assert_eq!(
            app.runner_path,
            PathBuf::from("/scratch/job-42/runner.toml")
        );
    }

    #[test]
    fn cli_arguments_override_file_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qcrescue.toml");
        fs::write(
            &path,
            r#"
            [files]
            directory = "/scratch/a"
            extra-backup = ["mol.qcout"]

            [cluster]
            assumed-cpus = 16
            "#,
        )
        .unwrap();

        let args = job_args(&[
            "-d",
            "/scratch/b",
            "--cluster-cpus",
            "8",
            "--backup",
            "mol.qcout",
            "--backup",
            "job.log",
            "--runner",
            "/etc/qcrescue/runner.toml",
        ]);
        let app = PartialHandlerConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, ClusterProfile::generic())
            .unwrap();
        assert_eq!(app.handler.directory, PathBuf::from("/scratch/b"));
        assert_eq!(app.handler.cluster.assumed_cpus, 8);
        assert_eq!(app.handler.extra_backup_files, vec!["mol.qcout", "job.log"]);
        assert_eq!(app.runner_path, PathBuf::from("/etc/qcrescue/runner.toml"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[thresholds]\nscf-cycles = 10\n").unwrap();
        let err = PartialHandlerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        let err = PartialHandlerConfig::default()
            .merge_with_cli(&job_args(&["--cluster-cpus", "0"]), ClusterProfile::generic())
            .unwrap_err();
        assert!(matches!(
            err,
            CliError::Config(ConfigError::InvalidValue {
                name: "assumed_cpus",
                ..
            })
        ));
    }

    #[test]
    fn snapshot_runner_defaults_to_job_directory() {
        let handler = HandlerConfigBuilder::new().directory("/jobs/3").build().unwrap();
        assert_eq!(
            runner_path_for(&job_args(&[]), &handler),
            PathBuf::from("/jobs/3/runner.toml")
        );
    }
}
