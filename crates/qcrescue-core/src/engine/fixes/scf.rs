use super::{FixContext, FixResult};
use crate::core::models::error_kind::ErrorKind;
use crate::core::models::molecule::Molecule;
use crate::core::models::results::ScfIteration;
use crate::core::models::strategy::{FixStrategy, ScfMethod};
use crate::engine::runner::JobRunner;
use tracing::{debug, info};

/// Traces this short mean the SCF was cut off rather than failing to converge.
const MIN_MATURE_SCF_ITERATIONS: usize = 10;

const FON_NORB_FRACTION: f64 = 0.618;

pub(super) fn fix_scf<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> FixResult {
    if ctx.has(&ErrorKind::NegativeEigen) {
        if let Some(action) = tighten_integral_threshold(ctx) {
            return Ok(Some(action));
        }
    }

    let step = ctx.step;
    let trace = match step.last_scf_trace() {
        Some(trace) if trace.len() > MIN_MATURE_SCF_ITERATIONS => trace,
        _ => return ctx.fix_immature_termination(),
    };

    if step.jobtype.is_trajectory() && step.molecules.len() >= 2 {
        info!(
            jobtype = %step.jobtype,
            snapshots = step.molecules.len(),
            "Restarting SCF from the last geometry"
        );
        ctx.reset()?;
        ctx.fix_step_mut().comment.scf_strategy = None;
        return Ok(Some("reset".to_string()));
    }

    let strategy = match ctx.fix_step().comment.scf_strategy.clone() {
        Some(mut strategy) => {
            strategy.advance();
            strategy
        }
        None => {
            let last_delta = trace.last().map_or(0.0, ScfIteration::delta_energy);
            FixStrategy::for_scf(last_delta, ctx.config.rca_gdm_thresh)
        }
    };

    let Some(method) = strategy.current() else {
        debug!(
            tried = strategy.methods.len(),
            "Every SCF fix method has been tried"
        );
        return Ok(None);
    };

    apply_method(ctx, method);
    info!(method = %method, index = strategy.current_method_id, "Applying SCF fix method");
    ctx.fix_step_mut().comment.scf_strategy = Some(strategy);
    Ok(Some(method.name().to_string()))
}

fn tighten_integral_threshold<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> Option<String> {
    let step = ctx.fix_step_mut();
    if !step.rem.contains("thresh") {
        step.set_integral_threshold(12);
        return Some("use tight integral threshold".to_string());
    }
    if step.rem.get_int("thresh").is_some_and(|thresh| thresh < 14) {
        step.set_integral_threshold(14);
        return Some("use even tighter integral threshold".to_string());
    }
    None
}

fn apply_method<R: JobRunner>(ctx: &mut FixContext<'_, R>, method: ScfMethod) {
    let (algorithm, guess) = method.settings();
    let scf_max_cycles = ctx.config.scf_max_cycles;
    ctx.fix_step_mut()
        .set_scf_algorithm_and_iterations(algorithm, scf_max_cycles);
    ctx.set_scf_initial_guess(guess);

    if method == ScfMethod::Fon {
        let natoms = ctx
            .step
            .last_molecule()
            .or_else(|| ctx.fix_step().molecule.as_molecule())
            .map_or(0, Molecule::len);
        let step = ctx.fix_step_mut();
        step.rem.set("occupations", 2);
        step.rem
            .set("fon_norb", (natoms as f64 * FON_NORB_FRACTION) as usize);
        step.rem.set("fon_t_start", 300);
        step.rem.set("fon_t_end", 300);
        step.rem.set("fon_e_thresh", 6);
        step.set_integral_threshold(14);
        step.set_scf_convergence_threshold(7);
    }
}
