use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_INPUT_FILE: &str = "mol.qcinp";
pub const DEFAULT_OUTPUT_FILE: &str = "mol.qcout.json";
pub const DEFAULT_RCA_GDM_THRESH: f64 = 1.0e-3;
pub const DEFAULT_SCF_MAX_CYCLES: usize = 200;
pub const DEFAULT_GEOM_MAX_CYCLES: usize = 200;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// What the engine needs to know about the machine the job runs on.
///
/// Detected once by the caller and injected; the engine never reads the environment itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub name: String,
    /// CPU count assumed when sizing CPSCF segments.
    pub assumed_cpus: usize,
    /// Pause before giving up on a run that produced no input text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_input_backoff_secs: Option<u64>,
}

impl ClusterProfile {
    pub fn new(name: &str, assumed_cpus: usize, empty_input_backoff_secs: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            assumed_cpus,
            empty_input_backoff_secs,
        }
    }

    pub fn generic() -> Self {
        Self::new("generic", 1, None)
    }

    pub fn empty_input_backoff(&self) -> Option<Duration> {
        self.empty_input_backoff_secs.map(Duration::from_secs)
    }
}

impl Default for ClusterProfile {
    fn default() -> Self {
        Self::generic()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Job directory holding the deck, the results and the backups.
    pub directory: PathBuf,
    pub input_file: String,
    pub output_file: String,
    /// Files archived in addition to the input and output.
    #[serde(default)]
    pub extra_backup_files: Vec<String>,
    /// Last SCF energy change at or above which the RCA-first ordering is chosen.
    pub rca_gdm_thresh: f64,
    pub scf_max_cycles: usize,
    pub geom_max_cycles: usize,
    #[serde(default)]
    pub cluster: ClusterProfile,
}

impl HandlerConfig {
    pub fn input_path(&self) -> PathBuf {
        self.directory.join(&self.input_file)
    }

    pub fn output_path(&self) -> PathBuf {
        self.directory.join(&self.output_file)
    }

    /// Every file a backup should try to archive, in archive order.
    pub fn backup_files(&self) -> Vec<String> {
        let mut files = vec![self.input_file.clone(), self.output_file.clone()];
        files.extend(self.extra_backup_files.iter().cloned());
        files
    }
}

#[derive(Default)]
pub struct HandlerConfigBuilder {
    directory: Option<PathBuf>,
    input_file: Option<String>,
    output_file: Option<String>,
    extra_backup_files: Vec<String>,
    rca_gdm_thresh: Option<f64>,
    scf_max_cycles: Option<usize>,
    geom_max_cycles: Option<usize>,
    cluster: Option<ClusterProfile>,
}

impl HandlerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.directory = Some(directory.as_ref().to_path_buf());
        self
    }
    pub fn input_file(mut self, name: &str) -> Self {
        self.input_file = Some(name.to_string());
        self
    }
    pub fn output_file(mut self, name: &str) -> Self {
        self.output_file = Some(name.to_string());
        self
    }
    pub fn extra_backup_files(mut self, files: Vec<String>) -> Self {
        self.extra_backup_files = files;
        self
    }
    pub fn rca_gdm_thresh(mut self, thresh: f64) -> Self {
        self.rca_gdm_thresh = Some(thresh);
        self
    }
    pub fn scf_max_cycles(mut self, cycles: usize) -> Self {
        self.scf_max_cycles = Some(cycles);
        self
    }
    pub fn geom_max_cycles(mut self, cycles: usize) -> Self {
        self.geom_max_cycles = Some(cycles);
        self
    }
    pub fn cluster(mut self, cluster: ClusterProfile) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn build(self) -> Result<HandlerConfig, ConfigError> {
        let rca_gdm_thresh = self.rca_gdm_thresh.unwrap_or(DEFAULT_RCA_GDM_THRESH);
        if !rca_gdm_thresh.is_finite() || rca_gdm_thresh <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "rca_gdm_thresh",
                reason: format!("must be a positive number, got {}", rca_gdm_thresh),
            });
        }
        let cluster = self.cluster.unwrap_or_default();
        if cluster.assumed_cpus == 0 {
            return Err(ConfigError::InvalidValue {
                name: "assumed_cpus",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(HandlerConfig {
            directory: self
                .directory
                .ok_or(ConfigError::MissingParameter("directory"))?,
            input_file: self
                .input_file
                .unwrap_or_else(|| DEFAULT_INPUT_FILE.to_string()),
            output_file: self
                .output_file
                .unwrap_or_else(|| DEFAULT_OUTPUT_FILE.to_string()),
            extra_backup_files: self.extra_backup_files,
            rca_gdm_thresh,
            scf_max_cycles: self.scf_max_cycles.unwrap_or(DEFAULT_SCF_MAX_CYCLES),
            geom_max_cycles: self.geom_max_cycles.unwrap_or(DEFAULT_GEOM_MAX_CYCLES),
            cluster,
        })
    }
}
