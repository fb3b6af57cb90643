use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BackupError + '_ {
    move |source| BackupError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Archives the artifacts of a failed run as `error.<n>.tar.gz` before anything is mutated.
#[derive(Debug, Clone)]
pub struct BackupManager {
    directory: PathBuf,
    files: Vec<String>,
}

impl BackupManager {
    pub fn new(directory: impl AsRef<Path>, files: Vec<String>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            files,
        }
    }

    /// One past the highest existing backup number, starting at 1.
    pub fn next_index(&self) -> Result<usize, BackupError> {
        let entries = fs::read_dir(&self.directory).map_err(io_error(&self.directory))?;
        let mut highest = 0;
        for entry in entries {
            let entry = entry.map_err(io_error(&self.directory))?;
            if let Some(n) = entry.file_name().to_str().and_then(parse_backup_index) {
                highest = highest.max(n);
            }
        }
        Ok(highest + 1)
    }

    /// Writes the next archive and returns its path. Listed files that do not exist are skipped.
    pub fn backup(&self) -> Result<PathBuf, BackupError> {
        let index = self.next_index()?;
        let archive_path = self.directory.join(format!("error.{}.tar.gz", index));
        info!("Backing up run to {}.", archive_path.display());

        let file = File::create(&archive_path).map_err(io_error(&archive_path))?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for name in &self.files {
            let source = self.directory.join(name);
            if !source.is_file() {
                debug!(file = %name, "Skipping missing backup file");
                continue;
            }
            builder
                .append_path_with_name(&source, name)
                .map_err(io_error(&source))?;
        }

        let encoder = builder.into_inner().map_err(io_error(&archive_path))?;
        encoder.finish().map_err(io_error(&archive_path))?;
        Ok(archive_path)
    }
}

fn parse_backup_index(name: &str) -> Option<usize> {
    name.strip_prefix("error.")?
        .strip_suffix(".tar.gz")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use tempfile::tempdir;

    fn archived_names(path: &Path) -> Vec<String> {
        let file = File::open(path).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect()
    }

    #[test]
    fn first_backup_is_numbered_one() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("mol.qcinp"), "$molecule\nread\n$end\n").unwrap();
        let manager = BackupManager::new(dir.path(), vec!["mol.qcinp".into()]);

        let path = manager.backup().unwrap();
        assert_eq!(path, dir.path().join("error.1.tar.gz"));
        assert_eq!(archived_names(&path), vec!["mol.qcinp"]);
    }

    #[test]
    fn numbering_continues_after_highest_existing_backup() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("error.1.tar.gz"), b"").unwrap();
        fs::write(dir.path().join("error.3.tar.gz"), b"").unwrap();
        fs::write(dir.path().join("error.x.tar.gz"), b"").unwrap();
        let manager = BackupManager::new(dir.path(), vec![]);

        assert_eq!(manager.next_index().unwrap(), 4);
        let path = manager.backup().unwrap();
        assert_eq!(path.file_name().unwrap(), "error.4.tar.gz");
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("mol.qcinp"), "x").unwrap();
        fs::write(dir.path().join("mol.qclog"), "y").unwrap();
        let manager = BackupManager::new(
            dir.path(),
            vec![
                "mol.qcinp".into(),
                "mol.qcout.json".into(),
                "mol.qclog".into(),
            ],
        );

        let path = manager.backup().unwrap();
        assert_eq!(archived_names(&path), vec!["mol.qcinp", "mol.qclog"]);
    }

    #[test]
    fn parses_only_well_formed_names() {
        assert_eq!(parse_backup_index("error.12.tar.gz"), Some(12));
        assert_eq!(parse_backup_index("error..tar.gz"), None);
        assert_eq!(parse_backup_index("error.2.tar"), None);
        assert_eq!(parse_backup_index("mol.qcinp"), None);
    }
}
