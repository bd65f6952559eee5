//! Poll stage and objective access from the canonical domain.
use crate::acceptance::Acceptance;
use crate::errors::Result;
use crate::search::Evaluator;
use crate::solver::PollState;
use crate::transform::CoordinateTransform;
use crate::types::{DomainConstraints, Success};

use argmin::core::{CostFunction, Problem};
use log::debug;
use ndarray::Array1;
use rand_xoshiro::Xoshiro256Plus;

/// Evaluates a user space problem at canonical points, counting evaluations
pub(crate) struct ProblemEvaluator<'a, O> {
    problem: &'a mut Problem<O>,
    transform: &'a CoordinateTransform,
    n_evals: u64,
}

impl<'a, O> ProblemEvaluator<'a, O> {
    pub(crate) fn new(problem: &'a mut Problem<O>, transform: &'a CoordinateTransform) -> Self {
        ProblemEvaluator {
            problem,
            transform,
            n_evals: 0,
        }
    }

    /// Number of evaluations done through this evaluator
    pub(crate) fn n_evals(&self) -> u64 {
        self.n_evals
    }
}

impl<O> Evaluator for ProblemEvaluator<'_, O>
where
    O: CostFunction<Param = Array1<f64>, Output = f64> + DomainConstraints,
{
    fn is_feasible(&self, x: &Array1<f64>) -> bool {
        let xu = self.transform.from_canonical(x);
        self.problem
            .problem
            .as_ref()
            .is_some_and(|pb| pb.is_feasible(&xu))
    }

    fn evaluate(&mut self, x: &Array1<f64>) -> Result<f64> {
        let xu = self.transform.from_canonical(x);
        let y = self.problem.cost(&xu)?;
        self.n_evals += 1;
        Ok(y)
    }

    fn clamp(&self, x: &Array1<f64>) -> Array1<f64> {
        self.transform.canonical_bounds().clamp(x)
    }
}

/// Evaluator judging candidates with the acceptance rule of the run, so
/// that search evaluations also feed the smoothing history
pub(crate) struct AcceptingEvaluator<'a> {
    inner: &'a mut dyn Evaluator,
    acceptance: &'a mut Acceptance,
    mesh_size: f64,
}

impl<'a> AcceptingEvaluator<'a> {
    pub(crate) fn new(
        inner: &'a mut dyn Evaluator,
        acceptance: &'a mut Acceptance,
        mesh_size: f64,
    ) -> Self {
        AcceptingEvaluator {
            inner,
            acceptance,
            mesh_size,
        }
    }
}

impl Evaluator for AcceptingEvaluator<'_> {
    fn is_feasible(&self, x: &Array1<f64>) -> bool {
        self.inner.is_feasible(x)
    }

    fn evaluate(&mut self, x: &Array1<f64>) -> Result<f64> {
        self.inner.evaluate(x)
    }

    fn clamp(&self, x: &Array1<f64>) -> Array1<f64> {
        self.inner.clamp(x)
    }

    fn accept(
        &mut self,
        x: &Array1<f64>,
        y: f64,
        incumbent: &Array1<f64>,
        value: f64,
    ) -> Result<(Success, Array1<f64>, f64)> {
        self.acceptance.evaluate(x, y, incumbent, value, self.mesh_size)
    }
}

/// Opportunistic poll around `incumbent`.
///
/// Directions are tried in generation order, infeasible candidates are
/// skipped without evaluation and the first accepted candidate ends the
/// poll. When every direction fails, [`Success::Failed`] is returned with
/// the current incumbent of the acceptance rule, whose smoothed value may
/// have moved with the failed evaluations.
pub(crate) fn poll(
    evaluator: &mut dyn Evaluator,
    engine: &mut PollState,
    incumbent: &Array1<f64>,
    value: f64,
    rng: &mut Xoshiro256Plus,
) -> Result<(Array1<f64>, f64, Success)> {
    let size = engine.mesh.size();
    let directions = engine.generator.generate(engine.mesh.level(), rng);
    for direction in directions {
        let step = direction.mapv(|d| d as f64 * size);
        let candidate = evaluator.clamp(&(incumbent + &step));
        if !evaluator.is_feasible(&candidate) {
            continue;
        }
        let y = evaluator.evaluate(&candidate)?;
        let (success, x, v) = engine
            .acceptance
            .evaluate(&candidate, y, incumbent, value, size)?;
        if success.is_accepted() {
            debug!("Poll accepted direction {direction} ({success:?})");
            engine.generator.record_success(incumbent, &x);
            return Ok((x, v, success));
        }
    }
    let (x, v) = engine.acceptance.incumbent(incumbent, value);
    Ok((x, v, Success::Failed))
}
