use super::error_kind::ErrorKind;
use super::molecule::Molecule;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The Q-Chem job type of a step (the `jobtype` directive).
///
/// Job types the engine reasons about get their own variant; everything else is kept by name so
/// nothing is lost when results are round-tripped through a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    Opt,
    Ts,
    Aimd,
    Freq,
    #[default]
    Sp,
    Force,
    Other(String),
}

impl JobType {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "opt" => JobType::Opt,
            "ts" => JobType::Ts,
            "aimd" => JobType::Aimd,
            "freq" => JobType::Freq,
            "sp" => JobType::Sp,
            "force" => JobType::Force,
            other => JobType::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            JobType::Opt => "opt",
            JobType::Ts => "ts",
            JobType::Aimd => "aimd",
            JobType::Freq => "freq",
            JobType::Sp => "sp",
            JobType::Force => "force",
            JobType::Other(name) => name,
        }
    }

    /// Job types that walk a trajectory of geometries and can be resumed from its last frame.
    pub fn is_trajectory(&self) -> bool {
        matches!(self, JobType::Opt | JobType::Ts | JobType::Aimd)
    }
}

impl From<String> for JobType {
    fn from(name: String) -> Self {
        JobType::from_name(&name)
    }
}

impl From<JobType> for String {
    fn from(job_type: JobType) -> Self {
        job_type.name().to_string()
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One SCF iteration: `(iteration number, energy change)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScfIteration(pub usize, pub f64);

impl ScfIteration {
    pub fn iteration(&self) -> usize {
        self.0
    }

    pub fn delta_energy(&self) -> f64 {
        self.1
    }
}

/// Parsed outcome of one executed step of a run, as produced by the output parser.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepResult {
    pub has_error: bool,
    #[serde(default)]
    pub errors: Vec<ErrorKind>,
    #[serde(default)]
    pub jobtype: JobType,
    /// Geometry snapshots in the order they were produced.
    #[serde(default)]
    pub molecules: Vec<Molecule>,
    /// One SCF trace per geometry cycle.
    #[serde(default)]
    pub scf_iteration_energies: Vec<Vec<ScfIteration>>,
}

impl StepResult {
    pub fn last_molecule(&self) -> Option<&Molecule> {
        self.molecules.last()
    }

    pub fn last_scf_trace(&self) -> Option<&[ScfIteration]> {
        self.scf_iteration_energies.last().map(Vec::as_slice)
    }
}
