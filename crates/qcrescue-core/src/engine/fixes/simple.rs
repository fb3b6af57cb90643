use super::FixContext;
use crate::core::models::molecule::Molecule;
use crate::engine::runner::JobRunner;
use tracing::{debug, warn};

pub(super) fn fix_autoz<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> Option<String> {
    let step = ctx.fix_step_mut();
    if step.rem.contains("sym_ignore") {
        return None;
    }
    step.disable_symmetry();
    Some("disable symmetry".to_string())
}

pub(super) fn fix_no_input_text<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> Option<String> {
    if let Some(action) = fix_autoz(ctx) {
        return Some(action);
    }
    if let Some(backoff) = ctx.config.cluster.empty_input_backoff() {
        warn!(
            cluster = %ctx.config.cluster.name,
            seconds = backoff.as_secs(),
            "Run produced no input text with symmetry already disabled; backing off"
        );
        std::thread::sleep(backoff);
    }
    None
}

pub(super) fn fix_nan_values<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> Option<String> {
    let step = ctx.fix_step_mut();
    if step.rem.contains("xc_grid") {
        return None;
    }
    step.set_dft_grid(128, 302);
    Some("use tighter grid".to_string())
}

pub(super) fn fix_freq_job_too_small<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> Option<String> {
    let natoms = ctx
        .fix_step()
        .molecule
        .as_molecule()
        .map(Molecule::len)
        .or_else(|| ctx.deck.first_atom_count());
    let Some(natoms) = natoms else {
        debug!("No explicit geometry to size CPSCF segments from");
        return None;
    };

    let step = ctx.fix_step_mut();
    if step.rem.get_int("cpscf_nseg") == Some(natoms as i64) {
        return None;
    }
    step.rem.set("cpscf_nseg", natoms);
    Some(format!("use {} segment in CPSCF", natoms))
}

pub(super) fn fix_pcm_solvent<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> Option<String> {
    let step = ctx.fix_step_mut();
    let body = step.sections.remove("pcm_solvent")?;
    step.sections.insert("solvent".to_string(), body);
    Some("use keyword solvent instead".to_string())
}
