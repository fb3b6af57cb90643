use crate::core::models::deck::InputDeck;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const DEFAULT_COMMAND: &str = "qchem";

/// How the external program is launched.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    #[default]
    Default,
    /// Half the MPI ranks, each with twice the memory.
    HalfCpus,
    /// One process, threads sharing memory.
    Openmp,
}

impl CommandMode {
    pub fn name(&self) -> &'static str {
        match self {
            CommandMode::Default => "default",
            CommandMode::HalfCpus => "half_cpus",
            CommandMode::Openmp => "openmp",
        }
    }
}

impl fmt::Display for CommandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The execution side of a job, as far as error correction is concerned.
///
/// Implementations own the launch command and the memory policy. Mode changes take the deck so
/// memory directives can follow the new mode.
pub trait JobRunner {
    fn current_command(&self) -> CommandMode;

    fn command_available(&self, mode: CommandMode) -> bool;

    fn select_command(&mut self, mode: CommandMode, deck: &mut InputDeck);

    fn is_openmp_compatible(&self, deck: &InputDeck) -> bool;

    fn large_static_mem(&self) -> bool;

    fn set_large_static_mem(&mut self, enabled: bool);

    /// Rewrites the memory directives of every step for the current settings.
    fn update_memory(&self, deck: &mut InputDeck);
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid runner state in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize runner state: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CommandLines {
    pub default: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_cpus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openmp: Option<String>,
}

impl Default for CommandLines {
    fn default() -> Self {
        Self {
            default: DEFAULT_COMMAND.to_string(),
            half_cpus: None,
            openmp: None,
        }
    }
}

/// Memory sizes in megabytes for a single-rank launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MemorySettings {
    pub total_mb: u64,
    pub static_mb: u64,
    pub large_static_mb: u64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            total_mb: 15000,
            static_mb: 1000,
            large_static_mb: 3000,
        }
    }
}

fn default_openmp_incompatible() -> Vec<String> {
    vec!["freq".to_string()]
}

/// A [`JobRunner`] backed by a small TOML state file kept next to the job.
///
/// ```toml
/// current = "default"
/// large-static-mem = false
/// openmp-incompatible = ["freq"]
///
/// [commands]
/// default = "qchem -np 24"
/// half-cpus = "qchem -np 12"
/// openmp = "qchem -nt 24"
///
/// [memory]
/// total-mb = 15000
/// static-mb = 1000
/// large-static-mb = 3000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CommandRegistry {
    #[serde(default)]
    pub current: CommandMode,
    #[serde(default)]
    pub large_static_mem: bool,
    #[serde(default = "default_openmp_incompatible")]
    pub openmp_incompatible: Vec<String>,
    pub commands: CommandLines,
    #[serde(default)]
    pub memory: MemorySettings,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(CommandLines::default())
    }
}

impl CommandRegistry {
    pub fn new(commands: CommandLines) -> Self {
        Self {
            current: CommandMode::Default,
            large_static_mem: false,
            openmp_incompatible: default_openmp_incompatible(),
            commands,
            memory: MemorySettings::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let content = fs::read_to_string(path).map_err(|source| RunnerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| RunnerError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), RunnerError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| RunnerError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// The launch command line for the current mode.
    pub fn command_line(&self) -> &str {
        match self.current {
            CommandMode::Default => &self.commands.default,
            CommandMode::HalfCpus => self
                .commands
                .half_cpus
                .as_deref()
                .unwrap_or(&self.commands.default),
            CommandMode::Openmp => self
                .commands
                .openmp
                .as_deref()
                .unwrap_or(&self.commands.default),
        }
    }

    fn memory_directives(&self) -> (u64, u64) {
        let total = match self.current {
            CommandMode::HalfCpus => self.memory.total_mb * 2,
            CommandMode::Default | CommandMode::Openmp => self.memory.total_mb,
        };
        let static_mb = if self.large_static_mem {
            self.memory.large_static_mb
        } else {
            self.memory.static_mb
        };
        (total, static_mb)
    }
}

impl JobRunner for CommandRegistry {
    fn current_command(&self) -> CommandMode {
        self.current
    }

    fn command_available(&self, mode: CommandMode) -> bool {
        match mode {
            CommandMode::Default => true,
            CommandMode::HalfCpus => self.commands.half_cpus.is_some(),
            CommandMode::Openmp => self.commands.openmp.is_some(),
        }
    }

    fn select_command(&mut self, mode: CommandMode, deck: &mut InputDeck) {
        debug!(from = %self.current, to = %mode, "Switching launch command");
        self.current = mode;
        self.update_memory(deck);
    }

    fn is_openmp_compatible(&self, deck: &InputDeck) -> bool {
        deck.jobs.iter().all(|job| {
            let job_type = job.job_type();
            !self
                .openmp_incompatible
                .iter()
                .any(|name| name.eq_ignore_ascii_case(job_type.name()))
        })
    }

    fn large_static_mem(&self) -> bool {
        self.large_static_mem
    }

    fn set_large_static_mem(&mut self, enabled: bool) {
        self.large_static_mem = enabled;
    }

    fn update_memory(&self, deck: &mut InputDeck) {
        let (total, static_mb) = self.memory_directives();
        for job in &mut deck.jobs {
            job.rem.set("mem_total", total);
            job.rem.set("mem_static", static_mb);
        }
    }
}
