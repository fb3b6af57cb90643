use crate::core::models::results::StepResult;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputParseError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid results in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Turns the output of a finished run into one [`StepResult`] per executed step.
pub trait OutputParser {
    fn parse(&self, output_file: &Path) -> Result<Vec<StepResult>, OutputParseError>;
}

/// Reads results already extracted by an upstream parser and stored as a JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResultsParser;

impl OutputParser for JsonResultsParser {
    fn parse(&self, output_file: &Path) -> Result<Vec<StepResult>, OutputParseError> {
        let path = output_file.display().to_string();
        let file = File::open(output_file).map_err(|source| OutputParseError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| OutputParseError::Json { path, source })
    }
}
