use thiserror::Error;

use super::backup::BackupError;
use super::config::ConfigError;
use super::runner::RunnerError;
use super::snapshot::SnapshotError;
use crate::core::io::qcinp::DeckError;
use crate::core::io::results::OutputParseError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input deck error for '{path}': {source}")]
    Deck {
        path: String,
        #[source]
        source: DeckError,
    },

    #[error("Output parsing failed: {source}")]
    Output {
        #[from]
        source: OutputParseError,
    },

    #[error("Job runner error: {source}")]
    Runner {
        #[from]
        source: RunnerError,
    },

    #[error("Backup failed: {source}")]
    Backup {
        #[from]
        source: BackupError,
    },

    #[error("Snapshot error: {source}")]
    Snapshot {
        #[from]
        source: SnapshotError,
    },

    #[error("No diagnosis available: run check() and find an error before correct()")]
    NotChecked,

    #[error("Failing step {step} has no matching job in the input deck ({jobs} job(s))")]
    StepMismatch { step: usize, jobs: usize },

    #[error("Unclassified error '{0}' cannot be corrected")]
    UnclassifiedError(String),

    #[error("Required directive '{0}' is missing from the failing job")]
    MissingDirective(&'static str),
}
