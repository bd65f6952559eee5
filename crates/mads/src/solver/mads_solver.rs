use crate::errors::MadsError;
use crate::solver::poll::ProblemEvaluator;
use crate::solver::{MadsState, PollState, ValidMadsConfig};
use crate::transform::CoordinateTransform;
use crate::types::{DomainConstraints, TraceEntry};

use argmin::argmin_error_closure;
use argmin::core::{CostFunction, KV, Problem, Solver, State, TerminationStatus};
use log::info;
use ndarray::Array1;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use web_time::Instant;

/// Mesh Adaptive Direct Search solver.
///
/// The solver works in the canonical domain `[-1, 1]^N` while the problem is
/// expressed in user coordinates: the coordinate transform is applied at
/// every objective or constraint call.
#[derive(Clone, Debug)]
pub struct MadsSolver {
    pub(crate) config: ValidMadsConfig,
    pub(crate) transform: CoordinateTransform,
    pub(crate) started: Option<Instant>,
}

impl<O> Solver<O, MadsState> for MadsSolver
where
    O: CostFunction<Param = Array1<f64>, Output = f64> + DomainConstraints,
{
    const NAME: &'static str = "MADS";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: MadsState,
    ) -> std::result::Result<(MadsState, Option<KV>), argmin::core::Error> {
        self.started = Some(Instant::now());
        let rng = if let Some(seed) = self.config.seed {
            Xoshiro256Plus::seed_from_u64(seed)
        } else {
            Xoshiro256Plus::from_entropy()
        };

        let x0 = self.config.bounds.clamp(&self.config.x0);
        let pb = problem
            .problem
            .as_ref()
            .ok_or_else(argmin_error_closure!(PotentialBug, "MadsSolver: No problem!"))?;
        if let Some(index) = pb.first_violated(&x0) {
            return Err(MadsError::InfeasibleStartError(index).into());
        }

        let y0 = problem.cost(&x0)?;
        let xc = self.transform.to_canonical(&x0);

        let dim = x0.len();
        let mesh = self.config.mesh.build();
        let generator = self.config.method.directions().build(dim);
        let mut acceptance = self.config.method.acceptance(dim);
        let value = acceptance.init(&xc, y0, mesh.size())?;
        info!(
            "MADS start: method={:?} mesh={} directions={} acceptance={} x0={} f(x0)={}",
            self.config.method,
            mesh.name(),
            generator.name(),
            acceptance.name(),
            x0,
            y0
        );

        let mut state = state
            .param(xc)
            .cost(value)
            .n_evals(1)
            .rng(rng)
            .poll(PollState {
                mesh,
                generator,
                acceptance,
            })
            // argmin's `cost <= target` test never holds, targets are checked in `terminate`
            .target_cost(f64::NAN)
            .max_iters(self.config.max_iters);
        if self.config.store_trace {
            state.trace = Some(vec![TraceEntry {
                x: x0,
                y: value,
                iter: 0,
            }]);
        }
        Ok((state, None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        mut state: MadsState,
    ) -> std::result::Result<(MadsState, Option<KV>), argmin::core::Error> {
        let mut rng = state
            .take_rng()
            .ok_or_else(argmin_error_closure!(PotentialBug, "MadsSolver: No rng!"))?;
        let mut engine = state
            .take_poll()
            .ok_or_else(argmin_error_closure!(PotentialBug, "MadsSolver: No poll state!"))?;
        let incumbent = state
            .get_param()
            .cloned()
            .ok_or_else(argmin_error_closure!(PotentialBug, "MadsSolver: No incumbent!"))?;

        let mut evaluator = ProblemEvaluator::new(problem, &self.transform);
        let (x, y, success) =
            self.iterate(&mut evaluator, &mut engine, &incumbent, state.cost, &mut rng)?;
        let n_evals = state.n_evals + evaluator.n_evals();

        engine.mesh.update(success, &mut rng);
        self.record_iteration(&mut state, &incumbent, &x, y, success);

        let state = state
            .param(x)
            .cost(y)
            .n_evals(n_evals)
            .poll(engine)
            .rng(rng);
        self.report(&state);
        Ok((state, None))
    }

    fn terminate(&mut self, state: &MadsState) -> TerminationStatus {
        match self.stop_reason(state) {
            Some(reason) => {
                info!(
                    "MADS stop: {reason} after {} iterations and {} evaluations",
                    state.get_iter(),
                    state.n_evals
                );
                TerminationStatus::Terminated(reason.to_termination())
            }
            None => TerminationStatus::NotTerminated,
        }
    }
}
