use crate::core::io::qcinp::QcInputFile;
use crate::core::io::results::OutputParser;
use crate::core::io::traits::DeckFile;
use crate::core::models::deck::{InputDeck, JobStep};
use crate::core::models::error_kind::ErrorKind;
use crate::core::models::results::StepResult;
use crate::engine::backup::BackupManager;
use crate::engine::config::HandlerConfig;
use crate::engine::detect::{Diagnosis, detect};
use crate::engine::error::EngineError;
use crate::engine::fixes::{FixContext, dispatch};
use crate::engine::priority::governing_error;
use crate::engine::runner::JobRunner;
use crate::engine::snapshot::{HandlerSnapshot, SNAPSHOT_FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Outcome of one `correct()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionReport {
    /// Every error of the failing step, sorted by label.
    pub errors: Vec<ErrorKind>,
    /// Applied actions in order, or `None` when nothing further can be tried.
    pub actions: Option<Vec<String>>,
}

impl CorrectionReport {
    pub fn is_exhausted(&self) -> bool {
        self.actions.is_none()
    }
}

/// Error handler for Q-Chem runs, driven by an external supervisor between resubmissions.
///
/// `check()` must find an error before `correct()` can run; each `correct()` archives the run,
/// mutates at most one job of the deck, and writes the deck back only when a fix was applied.
pub struct QChemErrorHandler<P: OutputParser, R: JobRunner> {
    config: HandlerConfig,
    parser: P,
    runner: R,
    outdata: Vec<StepResult>,
    deck: Option<InputDeck>,
    diagnosis: Option<Diagnosis>,
}

impl<P: OutputParser, R: JobRunner> QChemErrorHandler<P, R> {
    pub fn new(config: HandlerConfig, parser: P, runner: R) -> Self {
        Self {
            config,
            parser,
            runner,
            outdata: Vec::new(),
            deck: None,
            diagnosis: None,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn deck(&self) -> Option<&InputDeck> {
        self.deck.as_ref()
    }

    pub fn diagnosis(&self) -> Option<&Diagnosis> {
        self.diagnosis.as_ref()
    }

    /// The deck job the current diagnosis points at.
    pub fn fix_step(&self) -> Option<&JobStep> {
        let diagnosis = self.diagnosis.as_ref()?;
        self.deck.as_ref()?.jobs.get(diagnosis.error_step_id)
    }

    /// Loads the results and the deck and records the first failing step.
    ///
    /// Returns `true` when an error was found. Any previous diagnosis is discarded first, so
    /// calling this twice on the same files gives the same answer.
    #[instrument(skip_all, name = "check")]
    pub fn check(&mut self) -> Result<bool, EngineError> {
        self.diagnosis = None;
        self.outdata = self.parser.parse(&self.config.output_path())?;
        let deck = self.load_deck()?;

        let Some(diagnosis) = detect(&self.outdata) else {
            info!(steps = self.outdata.len(), "No errors found in run output.");
            self.deck = Some(deck);
            return Ok(false);
        };
        if diagnosis.error_step_id >= deck.jobs.len() {
            return Err(EngineError::StepMismatch {
                step: diagnosis.error_step_id,
                jobs: deck.jobs.len(),
            });
        }

        info!(
            step = diagnosis.error_step_id,
            errors = ?diagnosis.errors.iter().map(ErrorKind::label).collect::<Vec<_>>(),
            "Detected failing step."
        );
        self.deck = Some(deck);
        self.diagnosis = Some(diagnosis);
        Ok(true)
    }

    /// Archives the run, applies the fix for the governing error, and writes the deck back.
    #[instrument(skip_all, name = "correct")]
    pub fn correct(&mut self) -> Result<CorrectionReport, EngineError> {
        let diagnosis = self.diagnosis.clone().ok_or(EngineError::NotChecked)?;
        let mut working = self.deck.clone().ok_or(EngineError::NotChecked)?;

        BackupManager::new(&self.config.directory, self.config.backup_files()).backup()?;

        let errors: Vec<ErrorKind> = diagnosis.errors.iter().cloned().collect();
        let Some(governing) = governing_error(&diagnosis.errors).cloned() else {
            warn!("Failing step reported no error labels; nothing to correct.");
            return Ok(CorrectionReport {
                errors,
                actions: None,
            });
        };
        info!(error = %governing, "Selected governing error.");

        let action = {
            let mut ctx = FixContext::new(
                &self.config,
                &self.outdata,
                &diagnosis,
                &mut working,
                &mut self.runner,
            )?;
            dispatch(&mut ctx, &governing)?
        };

        let Some(action) = action else {
            info!(error = %governing, "No further fix available.");
            return Ok(CorrectionReport {
                errors,
                actions: None,
            });
        };

        let input_path = self.config.input_path();
        QcInputFile::write_to_path(&working, &input_path).map_err(|source| EngineError::Deck {
            path: input_path.display().to_string(),
            source,
        })?;
        info!(action = %action, "Applied correction and rewrote {}.", input_path.display());
        self.deck = Some(working);

        Ok(CorrectionReport {
            errors,
            actions: Some(vec![action]),
        })
    }

    pub fn snapshot(&self) -> HandlerSnapshot {
        HandlerSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            config: self.config.clone(),
            outdata: self.outdata.clone(),
            deck: self.deck.clone(),
            error_step_id: self.diagnosis.as_ref().map(|d| d.error_step_id),
            errors: self.diagnosis.as_ref().map(|d| d.errors.clone()),
            fix_step: self.fix_step().cloned(),
        }
    }

    /// Rebuilds a handler exactly as it was when the snapshot was taken, without re-reading files.
    pub fn from_snapshot(snapshot: HandlerSnapshot, parser: P, runner: R) -> Result<Self, EngineError> {
        snapshot.validate()?;
        let diagnosis = match (snapshot.error_step_id, snapshot.errors) {
            (Some(error_step_id), Some(errors)) => Some(Diagnosis {
                error_step_id,
                errors,
            }),
            _ => None,
        };
        Ok(Self {
            config: snapshot.config,
            parser,
            runner,
            outdata: snapshot.outdata,
            deck: snapshot.deck,
            diagnosis,
        })
    }

    fn load_deck(&self) -> Result<InputDeck, EngineError> {
        let input_path = self.config.input_path();
        QcInputFile::read_from_path(&input_path).map_err(|source| EngineError::Deck {
            path: input_path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::results::JsonResultsParser;
    use crate::core::models::molecule::{Molecule, Site};
    use crate::core::models::results::{JobType, ScfIteration};
    use crate::core::models::strategy::ScfMethod;
    use crate::engine::config::HandlerConfigBuilder;
    use crate::engine::runner::{CommandLines, CommandMode, CommandRegistry};
    use nalgebra::Point3;
    use std::fs;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    const HELIUM_SP: &str = "\
$comment
helium single point
$end

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

    fn registry(openmp: bool) -> CommandRegistry {
        CommandRegistry::new(CommandLines {
            default: "qchem -np 4".into(),
            half_cpus: Some("qchem -np 2".into()),
            openmp: openmp.then(|| "qchem -nt 4".to_string()),
        })
    }

    fn scf_failure(errors: &[ErrorKind], last_delta: f64) -> StepResult {
        StepResult {
            has_error: true,
            errors: errors.to_vec(),
            jobtype: JobType::Sp,
            molecules: vec![Molecule::new(
                0,
                1,
                vec![Site::new("He", Point3::origin())],
            )],
            scf_iteration_energies: vec![
                (1..=50)
                    .map(|i| ScfIteration(i, if i == 50 { last_delta } else { -0.5 }))
                    .collect(),
            ],
        }
    }

    fn job_dir(deck: &str, results: &[StepResult]) -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("mol.qcinp"), deck).unwrap();
        write_results(dir.path(), results);
        dir
    }

    fn write_results(dir: &Path, results: &[StepResult]) {
        fs::write(
            dir.join("mol.qcout.json"),
            serde_json::to_string(results).unwrap(),
        )
        .unwrap();
    }

    fn handler(dir: &Path, openmp: bool) -> QChemErrorHandler<JsonResultsParser, CommandRegistry> {
        let config = HandlerConfigBuilder::new().directory(dir).build().unwrap();
        QChemErrorHandler::new(config, JsonResultsParser, registry(openmp))
    }

    #[test]
    fn clean_run_reports_no_error_and_refuses_correction() {
        let dir = job_dir(HELIUM_SP, &[StepResult::default()]);
        let mut handler = handler(dir.path(), false);
        assert!(!handler.check().unwrap());
        assert!(handler.diagnosis().is_none());
        assert!(matches!(
            handler.correct().unwrap_err(),
            EngineError::NotChecked
        ));
    }

    #[test]
    fn single_point_scf_failure_starts_rca_first_strategy() {
        let dir = job_dir(
            HELIUM_SP,
            &[scf_failure(&[ErrorKind::BadScfConvergence], 1e-2)],
        );
        let mut handler = handler(dir.path(), false);
        assert!(handler.check().unwrap());

        let report = handler.correct().unwrap();
        assert_eq!(report.errors, vec![ErrorKind::BadScfConvergence]);
        assert_eq!(report.actions, Some(vec!["increase_iter".to_string()]));

        let written = fs::read_to_string(dir.path().join("mol.qcinp")).unwrap();
        assert!(written.contains("helium single point\n<SCF Fix Strategy>"));
        let deck = QcInputFile::read_from_path(dir.path().join("mol.qcinp")).unwrap();
        let step = &deck.jobs[0];
        assert_eq!(step.rem.get("scf_algorithm"), Some("diis"));
        assert_eq!(step.rem.get("scf_guess"), Some("sad"));
        assert_eq!(step.comment.text, "helium single point");
        let strategy = step.comment.scf_strategy.as_ref().unwrap();
        assert_eq!(strategy.current_method_id, 0);
        assert_eq!(strategy.methods[1], ScfMethod::RcaDiis);
        assert!(dir.path().join("error.1.tar.gz").is_file());
    }

    #[test]
    fn strategy_resumes_across_handler_instances() {
        let dir = job_dir(
            HELIUM_SP,
            &[scf_failure(&[ErrorKind::BadScfConvergence], 1e-2)],
        );
        let mut first = handler(dir.path(), false);
        first.check().unwrap();
        first.correct().unwrap();

        let mut second = handler(dir.path(), false);
        assert!(second.check().unwrap());
        let report = second.correct().unwrap();
        assert_eq!(report.actions, Some(vec!["rca_diis".to_string()]));

        let deck = QcInputFile::read_from_path(dir.path().join("mol.qcinp")).unwrap();
        let strategy = deck.jobs[0].comment.scf_strategy.as_ref().unwrap();
        assert_eq!(strategy.current_method_id, 1);
        assert_eq!(deck.jobs[0].rem.get("scf_algorithm"), Some("rca_diis"));
        assert!(dir.path().join("error.2.tar.gz").is_file());
    }

    #[test]
    fn exhausted_fix_leaves_deck_file_untouched() {
        let dir = job_dir(
            HELIUM_SP,
            &[StepResult {
                has_error: true,
                errors: vec![ErrorKind::MissingMolecularCharge],
                ..Default::default()
            }],
        );
        let mut handler = handler(dir.path(), false);
        handler.check().unwrap();
        let report = handler.correct().unwrap();

        assert!(report.is_exhausted());
        assert_eq!(
            fs::read_to_string(dir.path().join("mol.qcinp")).unwrap(),
            HELIUM_SP
        );
        assert!(dir.path().join("error.1.tar.gz").is_file());
    }

    #[test]
    fn highest_priority_error_is_fixed_first() {
        let dir = job_dir(
            HELIUM_SP,
            &[scf_failure(
                &[
                    ErrorKind::ExitCode134,
                    ErrorKind::BadScfConvergence,
                    ErrorKind::Killed,
                ],
                1e-2,
            )],
        );
        let mut handler = handler(dir.path(), false);
        handler.check().unwrap();
        let report = handler.correct().unwrap();

        assert_eq!(
            report.errors,
            vec![
                ErrorKind::BadScfConvergence,
                ErrorKind::ExitCode134,
                ErrorKind::Killed
            ]
        );
        assert_eq!(report.actions, Some(vec!["half_cpus".to_string()]));
        assert_eq!(handler.runner().current_command(), CommandMode::HalfCpus);
        let deck = QcInputFile::read_from_path(dir.path().join("mol.qcinp")).unwrap();
        assert_eq!(deck.jobs[0].rem.get_int("mem_total"), Some(30000));
    }

    #[test]
    fn openmp_escalation_is_not_undone() {
        let dir = job_dir(
            HELIUM_SP,
            &[StepResult {
                has_error: true,
                errors: vec![ErrorKind::Killed],
                ..Default::default()
            }],
        );
        let mut handler = handler(dir.path(), true);
        handler.check().unwrap();
        assert_eq!(
            handler.correct().unwrap().actions,
            Some(vec!["Use OpenMP".to_string()])
        );

        handler.check().unwrap();
        assert!(handler.correct().unwrap().is_exhausted());
        assert_eq!(handler.runner().current_command(), CommandMode::Openmp);
    }

    #[test]
    fn failing_step_without_deck_job_is_rejected() {
        let dir = job_dir(
            HELIUM_SP,
            &[
                StepResult::default(),
                StepResult {
                    has_error: true,
                    errors: vec![ErrorKind::NanValues],
                    ..Default::default()
                },
            ],
        );
        let mut handler = handler(dir.path(), false);
        assert!(matches!(
            handler.check().unwrap_err(),
            EngineError::StepMismatch { step: 1, jobs: 1 }
        ));
    }

    #[test]
    fn unclassified_error_is_fatal() {
        let dir = job_dir(
            HELIUM_SP,
            &[StepResult {
                has_error: true,
                errors: vec![ErrorKind::from_label("Basis set not found")],
                ..Default::default()
            }],
        );
        let mut handler = handler(dir.path(), false);
        handler.check().unwrap();
        assert!(matches!(
            handler.correct().unwrap_err(),
            EngineError::UnclassifiedError(_)
        ));
    }

    #[test]
    fn snapshot_replay_matches_direct_correction() {
        let results = [scf_failure(&[ErrorKind::BadScfConvergence], 1e-5)];
        let dir = job_dir(HELIUM_SP, &results);
        let mut original = handler(dir.path(), false);
        original.check().unwrap();

        let path = dir.path().join("snapshot.json");
        original.snapshot().save(&path).unwrap();
        let loaded = HandlerSnapshot::load(&path).unwrap();
        assert_eq!(loaded.error_step_id, Some(0));
        assert_eq!(loaded.fix_step.as_ref(), original.fix_step());

        // Replay must not depend on the results file.
        fs::remove_file(dir.path().join("mol.qcout.json")).unwrap();
        let mut replayed =
            QChemErrorHandler::from_snapshot(loaded, JsonResultsParser, registry(false)).unwrap();
        assert_eq!(replayed.diagnosis(), original.diagnosis());
        assert_eq!(replayed.deck(), original.deck());

        let report = replayed.correct().unwrap();
        assert_eq!(report.actions, Some(vec!["increase_iter".to_string()]));
        let deck = QcInputFile::read_from_path(dir.path().join("mol.qcinp")).unwrap();
        let strategy = deck.jobs[0].comment.scf_strategy.as_ref().unwrap();
        assert_eq!(strategy.methods[1], ScfMethod::DiisGdm);
    }

    #[test]
    fn snapshot_preserves_strategy_tags() {
        let dir = job_dir(
            HELIUM_SP,
            &[scf_failure(&[ErrorKind::BadScfConvergence], 1e-2)],
        );
        let mut handler = handler(dir.path(), false);
        handler.check().unwrap();
        handler.correct().unwrap();
        handler.check().unwrap();

        let json = serde_json::to_string(&handler.snapshot()).unwrap();
        let restored: HandlerSnapshot = serde_json::from_str(&json).unwrap();
        let step = restored.fix_step.unwrap();
        assert_eq!(step.comment.scf_strategy.unwrap().current_method_id, 0);
        assert_eq!(restored.errors.unwrap().len(), 1);
    }
}
