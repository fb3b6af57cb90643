use super::{FixContext, FixResult};
use crate::core::models::results::JobType;
use crate::engine::runner::{CommandMode, JobRunner};
use tracing::{debug, info};

fn openmp_usable<R: JobRunner>(ctx: &FixContext<'_, R>) -> bool {
    ctx.runner.is_openmp_compatible(ctx.deck) && ctx.runner.command_available(CommandMode::Openmp)
}

/// Moves the launch command one rung up: to `openmp` when usable, otherwise to `half_cpus`.
///
/// `openmp` is the top rung and is never left once selected.
fn escalate_command<R: JobRunner>(ctx: &mut FixContext<'_, R>, openmp_action: &str) -> Option<String> {
    let current = ctx.runner.current_command();
    if current == CommandMode::Openmp {
        return None;
    }
    let target = if openmp_usable(ctx) {
        CommandMode::Openmp
    } else {
        CommandMode::HalfCpus
    };
    if current == target {
        return None;
    }

    info!(from = %current, to = %target, "Escalating launch command");
    ctx.runner.select_command(target, ctx.deck);
    Some(match target {
        CommandMode::Openmp => openmp_action.to_string(),
        _ => target.name().to_string(),
    })
}

/// Splits CPSCF into more segments, halving the CPU count once the full-CPU tier is used up.
fn segment_cpscf<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> Option<String> {
    let ncpu = ctx.config.cluster.assumed_cpus.max(1);
    let half = (ncpu / 2).max(1);
    let Some(natoms) = ctx.deck.first_atom_count() else {
        debug!("No explicit geometry to size CPSCF segments from");
        return None;
    };
    let full = ncpu * (natoms / ncpu);
    let halved = half * (natoms / half);

    let current = ctx.fix_step().rem.get("cpscf_nseg").map(str::to_string);
    match current {
        None => {
            ctx.fix_step_mut().rem.set("cpscf_nseg", full);
            Some(format!("Use {} CPSCF segments", full))
        }
        Some(value) if value.parse::<usize>().is_ok_and(|n| n < halved) => {
            ctx.runner.select_command(CommandMode::HalfCpus, ctx.deck);
            ctx.fix_step_mut().rem.set("cpscf_nseg", halved);
            Some(format!("Use half CPUs and {} CPSCF segments", halved))
        }
        Some(_) => None,
    }
}

fn is_freq_step<R: JobRunner>(ctx: &FixContext<'_, R>) -> bool {
    ctx.fix_step().job_type() == JobType::Freq
}

pub(super) fn fix_killed<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> Option<String> {
    escalate_command(ctx, "Use OpenMP")
}

pub(super) fn fix_insufficient_static_memory<R: JobRunner>(
    ctx: &mut FixContext<'_, R>,
) -> Option<String> {
    if let Some(action) = escalate_command(ctx, "Use OpenMP") {
        return Some(action);
    }
    if ctx.runner.large_static_mem() {
        return None;
    }
    ctx.runner.set_large_static_mem(true);
    ctx.runner.update_memory(ctx.deck);
    Some("Increase Static Memory".to_string())
}

pub(super) fn fix_not_enough_total_memory<R: JobRunner>(
    ctx: &mut FixContext<'_, R>,
) -> Option<String> {
    if is_freq_step(ctx) {
        segment_cpscf(ctx)
    } else {
        escalate_command(ctx, "Use OpenMP")
    }
}

pub(super) fn fix_error_code_134<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> FixResult {
    if !ctx.fix_step().rem.contains("thresh") {
        ctx.fix_step_mut().set_integral_threshold(12);
        return Ok(Some("use tight integral threshold".to_string()));
    }
    if let Some(action) = escalate_command(ctx, "openmp") {
        return Ok(Some(action));
    }
    if is_freq_step(ctx) {
        return Ok(segment_cpscf(ctx));
    }
    Ok(None)
}
