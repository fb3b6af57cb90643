//! Per-error fix functions and the dispatcher that selects one.
//!
//! Every fix receives a [`FixContext`] over a working copy of the deck and returns
//! `Ok(Some(action))` when it changed something, `Ok(None)` when it has nothing left to try, or an
//! error when the inputs cannot be interpreted. The caller commits the working copy only for
//! `Ok(Some(_))`.

mod geom;
mod resources;
mod scf;
mod simple;

use super::config::HandlerConfig;
use super::detect::Diagnosis;
use super::error::EngineError;
use super::runner::JobRunner;
use crate::core::models::deck::{InputDeck, JobStep, MoleculeSection};
use crate::core::models::error_kind::ErrorKind;
use crate::core::models::results::{JobType, StepResult};
use tracing::debug;

pub(crate) type FixResult = Result<Option<String>, EngineError>;

pub(crate) struct FixContext<'a, R: JobRunner> {
    pub config: &'a HandlerConfig,
    /// Parsed results of the failing step.
    pub step: &'a StepResult,
    pub diagnosis: &'a Diagnosis,
    pub deck: &'a mut InputDeck,
    pub runner: &'a mut R,
}

impl<'a, R: JobRunner> FixContext<'a, R> {
    pub fn new(
        config: &'a HandlerConfig,
        outdata: &'a [StepResult],
        diagnosis: &'a Diagnosis,
        deck: &'a mut InputDeck,
        runner: &'a mut R,
    ) -> Result<Self, EngineError> {
        let id = diagnosis.error_step_id;
        let step = outdata.get(id).ok_or(EngineError::StepMismatch {
            step: id,
            jobs: outdata.len(),
        })?;
        if id >= deck.jobs.len() {
            return Err(EngineError::StepMismatch {
                step: id,
                jobs: deck.jobs.len(),
            });
        }
        Ok(Self {
            config,
            step,
            diagnosis,
            deck,
            runner,
        })
    }

    fn step_id(&self) -> usize {
        self.diagnosis.error_step_id
    }

    fn has(&self, kind: &ErrorKind) -> bool {
        self.diagnosis.has(kind)
    }

    fn fix_step(&self) -> &JobStep {
        &self.deck.jobs[self.step_id()]
    }

    fn fix_step_mut(&mut self) -> &mut JobStep {
        let id = self.step_id();
        &mut self.deck.jobs[id]
    }

    /// Sets the SCF guess, except that a first step already reading its guess keeps doing so.
    fn set_scf_initial_guess(&mut self, guess: &str) {
        let first_step = self.step_id() == 0;
        let step = self.fix_step_mut();
        if first_step && step.rem.get("scf_guess") == Some("read") {
            return;
        }
        step.set_scf_initial_guess(guess);
    }

    /// Rolls every explicit geometry up to and including the failing step to the last snapshot.
    fn set_last_input_geom(&mut self) {
        let step = self.step;
        let Some(last) = step.last_molecule() else {
            return;
        };
        let id = self.step_id();
        for job in self.deck.jobs.iter_mut().take(id + 1) {
            if let MoleculeSection::Explicit(mol) = &mut job.molecule {
                *mol = last.clone();
            }
        }
    }

    /// Restarts the failing trajectory from its last geometry with plain DIIS.
    fn reset(&mut self) -> Result<(), EngineError> {
        let scf_max_cycles = self.config.scf_max_cycles;
        self.fix_step_mut()
            .set_scf_algorithm_and_iterations("diis", scf_max_cycles);
        let guess = if self.step_id() > 0 { "read" } else { "sad" };
        self.set_scf_initial_guess(guess);
        self.set_last_input_geom();

        if self.step.jobtype == JobType::Aimd {
            let elapsed = self.step.molecules.len() as i64 - 1;
            let step = self.fix_step_mut();
            let aimd_steps = step
                .rem
                .get_int("aimd_steps")
                .ok_or(EngineError::MissingDirective("aimd_steps"))?;
            step.rem.set("aimd_steps", aimd_steps - elapsed + 1);
        }
        Ok(())
    }

    /// Fallback for runs that stopped too early to judge convergence.
    fn fix_immature_termination(&mut self) -> FixResult {
        if self.has(&ErrorKind::ExitCode134) {
            resources::fix_error_code_134(self)
        } else {
            debug!("Run terminated too early and without exit code 134; nothing to fix");
            Ok(None)
        }
    }
}

/// Runs the fix function for `governing` against the context's working deck.
pub(crate) fn dispatch<R: JobRunner>(ctx: &mut FixContext<'_, R>, governing: &ErrorKind) -> FixResult {
    match governing {
        ErrorKind::PcmSolventDeprecated => Ok(simple::fix_pcm_solvent(ctx)),
        ErrorKind::AutozError => Ok(simple::fix_autoz(ctx)),
        ErrorKind::NoInputText => Ok(simple::fix_no_input_text(ctx)),
        ErrorKind::Killed => Ok(resources::fix_killed(ctx)),
        ErrorKind::InsufficientStaticMemory => Ok(resources::fix_insufficient_static_memory(ctx)),
        ErrorKind::NotEnoughTotalMemory => Ok(resources::fix_not_enough_total_memory(ctx)),
        ErrorKind::NanValues => Ok(simple::fix_nan_values(ctx)),
        ErrorKind::BadScfConvergence => scf::fix_scf(ctx),
        ErrorKind::GeometryOptimizationFailed => geom::fix_geom_opt(ctx),
        ErrorKind::FreqJobTooSmall => Ok(simple::fix_freq_job_too_small(ctx)),
        ErrorKind::ExitCode134 => resources::fix_error_code_134(ctx),
        ErrorKind::MissingMolecularCharge
        | ErrorKind::MissingSpinMultiplicity
        | ErrorKind::NegativeEigen
        | ErrorKind::LambdaDeterminationFailed
        | ErrorKind::UnknownError => Ok(None),
        ErrorKind::Unclassified(label) => Err(EngineError::UnclassifiedError(label.clone())),
    }
}
