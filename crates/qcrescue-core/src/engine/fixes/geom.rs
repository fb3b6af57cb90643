use super::{FixContext, FixResult};
use crate::core::models::deck::GeomCoords;
use crate::core::models::error_kind::ErrorKind;
use crate::core::models::strategy::{FixStrategy, GeomMethod};
use crate::engine::runner::JobRunner;
use tracing::{debug, info};

/// Fewer snapshots than this mean the optimization was cut off rather than stuck.
const MIN_MATURE_SNAPSHOTS: usize = 11;

const GDIIS_SUBSPACE_SIZE: u32 = 5;

pub(super) fn fix_geom_opt<R: JobRunner>(ctx: &mut FixContext<'_, R>) -> FixResult {
    let step = ctx.step;

    if ctx.has(&ErrorKind::LambdaDeterminationFailed) && step.molecules.len() >= 2 {
        info!(
            snapshots = step.molecules.len(),
            "Restarting optimization after lambda determination failure"
        );
        ctx.reset()?;
        ctx.fix_step_mut().comment.geom_strategy = None;
        return Ok(Some("reset".to_string()));
    }

    if step.molecules.len() < MIN_MATURE_SNAPSHOTS {
        return ctx.fix_immature_termination();
    }

    let strategy = match ctx.fix_step().comment.geom_strategy.clone() {
        Some(mut strategy) => {
            strategy.advance();
            strategy
        }
        None => FixStrategy::for_geometry(),
    };

    let Some(method) = strategy.current() else {
        debug!("Every geometry fix method has been tried");
        return Ok(None);
    };

    let geom_max_cycles = ctx.config.geom_max_cycles;
    let fix_step = ctx.fix_step_mut();
    match method {
        GeomMethod::IncreaseIter => {
            fix_step.set_geom_max_iterations(geom_max_cycles);
        }
        GeomMethod::Gdiis => {
            fix_step.set_geom_opt_use_gdiis(GDIIS_SUBSPACE_SIZE);
            fix_step.set_geom_max_iterations(geom_max_cycles);
        }
        GeomMethod::CartCoords => {
            fix_step.set_geom_opt_coords_type(GeomCoords::Cartesian);
            fix_step.set_geom_max_iterations(geom_max_cycles);
            fix_step.set_geom_opt_use_gdiis(0);
        }
    }
    ctx.set_last_input_geom();

    info!(method = %method, index = strategy.current_method_id, "Applying geometry fix method");
    ctx.fix_step_mut().comment.geom_strategy = Some(strategy);
    Ok(Some(method.name().to_string()))
}
