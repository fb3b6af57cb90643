use super::config::HandlerConfig;
use crate::core::models::deck::{InputDeck, JobStep};
use crate::core::models::error_kind::ErrorKind;
use crate::core::models::results::StepResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Inconsistent snapshot: {0}")]
    Inconsistent(String),
}

/// Complete handler state between `check()` and `correct()`, serializable as JSON.
///
/// The deck is stored in its structured form, so strategy records are kept as fields rather than
/// as comment text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerSnapshot {
    pub format_version: u32,
    pub config: HandlerConfig,
    pub outdata: Vec<StepResult>,
    pub deck: Option<InputDeck>,
    pub error_step_id: Option<usize>,
    pub errors: Option<BTreeSet<ErrorKind>>,
    pub fix_step: Option<JobStep>,
}

impl HandlerSnapshot {
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let file = File::create(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let file = File::open(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot: Self = serde_json::from_reader(BufReader::new(file))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Rejects snapshots this version cannot interpret.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        if self.error_step_id.is_some() != self.errors.is_some() {
            return Err(SnapshotError::Inconsistent(
                "error_step_id and errors must be present together".to_string(),
            ));
        }
        if let Some(step) = self.error_step_id {
            let jobs = self.deck.as_ref().map_or(0, |deck| deck.jobs.len());
            if step >= jobs {
                return Err(SnapshotError::Inconsistent(format!(
                    "error_step_id {} is outside the deck ({} job(s))",
                    step, jobs
                )));
            }
        }
        Ok(())
    }
}
