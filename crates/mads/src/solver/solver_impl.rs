use crate::MADS_LOG;
use crate::errors::Result;
use crate::search::Evaluator;
use crate::solver::poll::{AcceptingEvaluator, poll};
use crate::solver::{MadsSolver, MadsState, PollState, ValidMadsConfig};
use crate::transform::CoordinateTransform;
use crate::types::{StopReason, Success, TraceEntry};

use argmin::core::State;
use env_logger::{Builder, Env};
use log::{debug, info};
use ndarray::Array1;
use rand_xoshiro::Xoshiro256Plus;

impl MadsSolver {
    /// Constructor of the MADS solver for the given validated configuration.
    ///
    /// Installs a stdout logger filtered by the `MADS_LOG` environment
    /// variable unless a logger is already set.
    pub fn new(config: ValidMadsConfig) -> Self {
        let default_filter = if config.verbose > 0 { "info" } else { "warn" };
        let env = Env::new().filter_or(MADS_LOG, default_filter);
        let mut builder = Builder::from_env(env);
        let builder = builder.target(env_logger::Target::Stdout);
        builder.try_init().ok();
        let transform = CoordinateTransform::new(config.bounds.clone());
        MadsSolver {
            config,
            transform,
            started: None,
        }
    }

    /// Solver configuration
    pub fn config(&self) -> &ValidMadsConfig {
        &self.config
    }

    /// Map between user bounds and the canonical domain
    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// One search then poll step around `incumbent`.
    ///
    /// Search evaluations go through the acceptance rule of the run. The
    /// poll is skipped when the search improved the incumbent, otherwise it
    /// starts from the incumbent left by the search.
    pub(crate) fn iterate(
        &self,
        evaluator: &mut dyn Evaluator,
        engine: &mut PollState,
        incumbent: &Array1<f64>,
        value: f64,
        rng: &mut Xoshiro256Plus,
    ) -> Result<(Array1<f64>, f64, Success)> {
        let mesh_size = engine.mesh.size();
        let (x, y, success) = {
            let mut judged =
                AcceptingEvaluator::new(&mut *evaluator, &mut engine.acceptance, mesh_size);
            self.config
                .search
                .search(&mut judged, incumbent, value, mesh_size, rng)?
        };
        if success == Success::Improved {
            debug!("{} improved incumbent: f={y}", self.config.search.name());
            return Ok((x, y, success));
        }
        poll(evaluator, engine, &x, y, rng)
    }

    /// Update the stagnation counter and the trace with the iteration outcome.
    pub(crate) fn record_iteration(
        &self,
        state: &mut MadsState,
        incumbent: &Array1<f64>,
        x: &Array1<f64>,
        y: f64,
        success: Success,
    ) {
        let previous = self.transform.from_canonical(incumbent);
        let current = self.transform.from_canonical(x);
        let df = (state.cost - y).abs();
        let dx = (&current - &previous).mapv(|v| v * v).sum().sqrt();
        state
            .stagnation
            .update(success, df, dx, self.config.ftol, self.config.xtol);
        state.last_success = Some(success);
        if let Some(trace) = state.trace.as_mut() {
            trace.push(TraceEntry {
                x: current,
                y,
                iter: state.iter + 1,
            });
        }
    }

    /// Progress report according to the verbosity level
    pub(crate) fn report(&self, state: &MadsState) {
        let iter = state.get_iter() + 1;
        let due = match self.config.verbose {
            0 => false,
            1 => iter % self.config.log_interval == 0,
            _ => true,
        };
        let msg = format!(
            "Iter {iter}: f={} mesh_size={:e} level={} evals={} outcome={:?}",
            state.get_cost(),
            state.mesh_size().unwrap_or(f64::NAN),
            state.mesh_level().unwrap_or(0),
            state.n_evals,
            state.last_success,
        );
        if due {
            info!("{msg}");
        } else {
            debug!("{msg}");
        }
    }

    /// Stopping predicates, checked in order: mesh size floor, target value,
    /// evaluation budget, wall time budget, stagnation.
    ///
    /// argmin calls them before every iteration, so an exhausted evaluation
    /// budget also prevents the next iteration from starting.
    pub(crate) fn stop_reason(&self, state: &MadsState) -> Option<StopReason> {
        let mesh_size = state.mesh_size()?;
        if mesh_size < self.config.min_mesh_size {
            return Some(StopReason::MinMeshSize);
        }
        if let Some(target) = self.config.target
            && state.get_cost() < target
        {
            return Some(StopReason::FTargetReached);
        }
        if state.n_evals >= self.config.max_evals {
            return Some(StopReason::MaxEvaluations);
        }
        if let (Some(max_time), Some(started)) = (self.config.max_time, self.started)
            && started.elapsed() >= max_time
        {
            return Some(StopReason::MaxTime);
        }
        state.stagnation.stop_reason()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::MadsConfig;
    use crate::transform::Bounds;
    use ndarray::array;

    fn solver(config: MadsConfig) -> MadsSolver {
        let config = config
            .bounds(Bounds::broadcast(-1., 1., 2).unwrap())
            .check()
            .unwrap();
        MadsSolver::new(config)
    }

    fn running_state(cost: f64) -> MadsState {
        MadsState::new()
            .param(array![0., 0.])
            .cost(cost)
            .n_evals(10)
            .poll(PollState {
                mesh: crate::mesh::MeshKind::default().build(),
                generator: crate::directions::DirectionKind::Lt.build(2),
                acceptance: crate::acceptance::Acceptance::Plain,
            })
    }

    #[test]
    fn test_stop_reason_order() {
        let state = running_state(0.5);
        assert_eq!(solver(MadsConfig::default()).stop_reason(&state), None);
        assert_eq!(
            solver(MadsConfig::default().min_mesh_size(2.).target(1.).max_evals(10))
                .stop_reason(&state),
            Some(StopReason::MinMeshSize)
        );
        assert_eq!(
            solver(MadsConfig::default().target(1.).max_evals(10)).stop_reason(&state),
            Some(StopReason::FTargetReached)
        );
        assert_eq!(
            solver(MadsConfig::default().target(0.5).max_evals(10)).stop_reason(&state),
            Some(StopReason::MaxEvaluations)
        );
    }

    #[test]
    fn test_stop_reason_stagnation() {
        let solver = solver(MadsConfig::default().ftol(1e-3));
        let mut state = running_state(0.5);
        for k in 0..5 {
            assert_eq!(solver.stop_reason(&state), None, "iteration {k}");
            solver.record_iteration(
                &mut state,
                &array![0., 0.],
                &array![0., 0.],
                0.5,
                Success::Failed,
            );
        }
        assert_eq!(solver.stop_reason(&state), Some(StopReason::FTolReached));
    }

    #[test]
    fn test_record_iteration_trace() {
        let solver = solver(MadsConfig::default().store_trace(true));
        let mut state = running_state(0.5);
        state.trace = Some(vec![]);
        solver.record_iteration(
            &mut state,
            &array![0., 0.],
            &array![0.5, -0.5],
            0.25,
            Success::Improved,
        );
        let trace = state.trace.unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].x, array![0.5, -0.5]);
        assert_eq!(trace[0].iter, 1);
        assert_eq!(state.last_success, Some(Success::Improved));
    }
}
