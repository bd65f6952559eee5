//! MADS optimizer builder, the entry point to minimize a blackbox function.
//!
//! ```no_run
//! use mads::{Bounds, MadsBuilder, Method};
//! use ndarray::{ArrayView1, array};
//!
//! fn sphere(x: &ArrayView1<f64>) -> f64 {
//!     x.dot(x)
//! }
//!
//! let res = MadsBuilder::optimize(sphere)
//!     .configure(|config| {
//!         config
//!             .method(Method::OrthoMads { reduction: true })
//!             .x0(array![5., -3.])
//!             .max_evals(1000)
//!             .seed(42)
//!     })
//!     .subject_to(vec![Box::new(|x: &ArrayView1<f64>| x[0] + x[1] <= 10.)])
//!     .min_within(Bounds::broadcast(-10., 10., 2).unwrap())
//!     .run()
//!     .expect("MADS minimization");
//! println!("Minimum {} at {} ({})", res.y_opt, res.x_opt, res.stop_reason);
//! ```
use crate::errors::{MadsError, Result};
use crate::solver::{MadsConfig, MadsSolver, MadsState};
use crate::transform::Bounds;
use crate::types::{Cstr, DomainConstraints, OptimResult, StopReason};

use argmin::core::{CostFunction, Executor, State};
use log::info;
use ndarray::{Array1, ArrayView1};

/// Objective function signature, evaluated at points in user coordinates
pub trait ObjFn: Fn(&ArrayView1<f64>) -> f64 {}
impl<T> ObjFn for T where T: Fn(&ArrayView1<f64>) -> f64 {}

/// Objective and constraints as an argmin problem
pub struct MadsProblem<O: ObjFn> {
    fobj: O,
    cstrs: Vec<Cstr>,
}

impl<O: ObjFn> MadsProblem<O> {
    /// Problem made of the objective `fobj` and the predicates `cstrs`
    pub fn new(fobj: O, cstrs: Vec<Cstr>) -> Self {
        MadsProblem { fobj, cstrs }
    }
}

impl<O: ObjFn> CostFunction for MadsProblem<O> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        Ok((self.fobj)(&x.view()))
    }
}

impl<O: ObjFn> DomainConstraints for MadsProblem<O> {
    fn first_violated(&self, x: &Array1<f64>) -> Option<usize> {
        let x = x.view();
        self.cstrs.iter().position(|cstr| !cstr(&x))
    }
}

/// MADS optimizer builder
pub struct MadsBuilder<O: ObjFn> {
    fobj: O,
    cstrs: Vec<Cstr>,
    config: MadsConfig,
}

impl<O: ObjFn> MadsBuilder<O> {
    /// Function to be minimized, `f(x) -> y` with `x` in user coordinates
    pub fn optimize(fobj: O) -> Self {
        MadsBuilder {
            fobj,
            cstrs: vec![],
            config: MadsConfig::default(),
        }
    }

    /// Set the optimizer configuration
    pub fn configure<F: FnOnce(MadsConfig) -> MadsConfig>(mut self, init: F) -> Self {
        self.config = init(self.config);
        self
    }

    /// Feasibility predicates, a point is feasible when all of them hold
    pub fn subject_to(mut self, cstrs: Vec<Cstr>) -> Self {
        self.cstrs = cstrs;
        self
    }

    /// Build a MADS optimizer minimizing within the given bounds
    pub fn min_within(self, bounds: Bounds) -> Mads<O> {
        Mads {
            problem: MadsProblem::new(self.fobj, self.cstrs),
            config: self.config.bounds(bounds),
        }
    }
}

/// MADS optimizer ready to run
pub struct Mads<O: ObjFn> {
    problem: MadsProblem<O>,
    config: MadsConfig,
}

impl<O: ObjFn> Mads<O> {
    /// Optimizer configuration
    pub fn config(&self) -> &MadsConfig {
        &self.config
    }

    /// Runs the optimization.
    ///
    /// Fails before any evaluation on configuration errors or when the
    /// initial point violates a constraint.
    pub fn run(self) -> Result<OptimResult> {
        let config = self.config.check()?;
        let solver = MadsSolver::new(config);
        let transform = solver.transform().clone();

        let res = Executor::new(self.problem, solver)
            .timer(true)
            .run()
            .map_err(MadsError::from_argmin)?;
        let state: MadsState = res.state().clone();

        let reason = state.get_termination_reason().ok_or_else(|| {
            MadsError::InvalidValue("Optimization ended without termination reason".to_string())
        })?;
        let stop_reason = StopReason::from_termination(reason).ok_or_else(|| {
            MadsError::InvalidValue(format!("Unexpected termination: {reason}"))
        })?;
        let x_best = state.get_best_param().ok_or_else(|| {
            MadsError::InvalidValue("Optimization ended without incumbent".to_string())
        })?;
        let x_opt = transform.from_canonical(x_best);
        let y_opt = state.get_best_cost();
        info!(
            "MADS result: f={y_opt} at x={x_opt} ({stop_reason}, {} iterations, {} evaluations)",
            state.get_iter(),
            state.n_evals
        );

        Ok(OptimResult {
            x_opt,
            y_opt,
            stop_reason,
            n_iters: state.get_iter(),
            n_evals: state.n_evals,
            elapsed: state.get_time().unwrap_or_default(),
            trace: state.trace.clone(),
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshKind;
    use crate::search::RandomSearch;
    use crate::solver::Method;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use web_time::Duration;

    fn sphere(x: &ArrayView1<f64>) -> f64 {
        x.dot(x)
    }

    fn square() -> Bounds {
        Bounds::broadcast(-10., 10., 2).unwrap()
    }

    #[test]
    fn test_sphere_ortho_mads() {
        let res = MadsBuilder::optimize(sphere)
            .configure(|config| config.x0(array![5., -3.]).max_evals(3000).seed(42))
            .min_within(square())
            .run()
            .unwrap();
        assert!(res.y_opt < 1e-6, "f = {}", res.y_opt);
        assert!(matches!(
            res.stop_reason,
            StopReason::MinMeshSize | StopReason::MaxEvaluations
        ));
        assert!(res.n_evals <= 3000 + 4);
        assert_abs_diff_eq!(res.x_opt, array![0., 0.], epsilon = 1e-3);
        assert_abs_diff_eq!(res.y_opt, sphere(&res.x_opt.view()), epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_ortho_mads_neg_reduction() {
        let res = MadsBuilder::optimize(sphere)
            .configure(|config| {
                config
                    .method(Method::OrthoMads { reduction: true })
                    .x0(array![5., -3.])
                    .max_evals(3000)
            })
            .min_within(square())
            .run()
            .unwrap();
        assert!(res.y_opt < 1e-4, "f = {}", res.y_opt);
    }

    #[test]
    fn test_sphere_lt_mads_with_search() {
        let res = MadsBuilder::optimize(sphere)
            .configure(|config| {
                config
                    .method(Method::LtMads)
                    .search(Box::new(RandomSearch::default().n_points(2)))
                    .x0(array![5., -3.])
                    .max_evals(3000)
                    .seed(0)
            })
            .min_within(square())
            .run()
            .unwrap();
        assert!(res.y_opt < 1e-4, "f = {}", res.y_opt);
    }

    #[test]
    fn test_sphere_stochastic_mesh() {
        let res = MadsBuilder::optimize(sphere)
            .configure(|config| {
                config
                    .mesh(MeshKind::Stochastic {
                        base: 4.,
                        expansion_bound: 1,
                        contraction_bound: -2,
                    })
                    .x0(array![5., -3.])
                    .max_evals(3000)
                    .seed(1)
            })
            .min_within(square())
            .run()
            .unwrap();
        assert!(res.y_opt < 1e-2, "f = {}", res.y_opt);
    }

    #[test]
    fn test_degenerate_bound() {
        let bounds = Bounds::new(array![-10., 2.], array![10., 2.]).unwrap();
        let res = MadsBuilder::optimize(sphere)
            .configure(|config| config.x0(array![5., -3.]).max_evals(2000).seed(42))
            .min_within(bounds)
            .run()
            .unwrap();
        assert!(res.x_opt.iter().all(|v| v.is_finite()));
        assert_eq!(res.x_opt[1], 2.);
        assert!(res.y_opt < 4. + 1e-6, "f = {}", res.y_opt);
    }

    #[test]
    fn test_infeasible_start() {
        let n_evals = AtomicUsize::new(0);
        let counted = |x: &ArrayView1<f64>| {
            n_evals.fetch_add(1, Ordering::SeqCst);
            sphere(x)
        };
        let res = MadsBuilder::optimize(counted)
            .configure(|config| config.x0(array![5., -3.]))
            .subject_to(vec![
                Box::new(|x: &ArrayView1<f64>| x[1] < 0.),
                Box::new(|x: &ArrayView1<f64>| x[0] < 0.),
            ])
            .min_within(square())
            .run();
        assert!(matches!(res, Err(MadsError::InfeasibleStartError(1))));
        assert_eq!(n_evals.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_constrained_sphere() {
        let res = MadsBuilder::optimize(sphere)
            .configure(|config| config.x0(array![5., 3.]).max_evals(3000).seed(42))
            .subject_to(vec![Box::new(|x: &ArrayView1<f64>| x[0] + x[1] >= 2.)])
            .min_within(square())
            .run()
            .unwrap();
        assert!(res.x_opt[0] + res.x_opt[1] >= 2.);
        assert!(res.y_opt >= 2. - 1e-9);
        assert!(res.y_opt < 34., "f = {}", res.y_opt);
    }

    #[test]
    fn test_invalid_config_fails_before_evaluation() {
        let n_evals = AtomicUsize::new(0);
        let counted = |x: &ArrayView1<f64>| {
            n_evals.fetch_add(1, Ordering::SeqCst);
            sphere(x)
        };
        let res = MadsBuilder::optimize(counted)
            .configure(|config| config.x0(array![5., -3., 1.]))
            .min_within(square())
            .run();
        assert!(matches!(res, Err(MadsError::InvalidConfigError(_))));
        assert_eq!(n_evals.load(Ordering::SeqCst), 0);
    }

    fn noisy_sphere(x: &ArrayView1<f64>) -> f64 {
        let noise = ((x[0] * 12.9898 + x[1] * 78.233).sin() * 43758.5453).fract();
        sphere(x) + 0.01 * noise
    }

    /// Value of the running minimizer of the smoothing history
    fn smoothed_incumbent(res: &OptimResult) -> (usize, f64) {
        let smoother = res
            .state
            .poll
            .as_ref()
            .unwrap()
            .acceptance
            .smoother()
            .unwrap();
        let last = smoother.cache().last_minimizer().unwrap();
        (smoother.cache().len(), smoother.cache().smoothed()[last])
    }

    #[test]
    fn test_robust_noisy_sphere() {
        let res = MadsBuilder::optimize(noisy_sphere)
            .configure(|config| {
                config
                    .method(Method::RobustOrthoMads {
                        beta: 1.,
                        reduction: false,
                    })
                    .x0(array![5., -3.])
                    .max_evals(2000)
                    .seed(42)
            })
            .min_within(square())
            .run()
            .unwrap();
        assert!(matches!(
            res.stop_reason,
            StopReason::MinMeshSize | StopReason::MaxEvaluations
        ));
        assert!(res.n_evals <= 2000 + 4);
        assert!(res.state.mesh_level().unwrap() > 0);
        assert!(res.x_opt.dot(&res.x_opt).sqrt() < 2., "x = {}", res.x_opt);
        let (cache_len, value) = smoothed_incumbent(&res);
        assert_eq!(cache_len as u64, res.n_evals);
        assert_eq!(res.y_opt, value);
    }

    #[test]
    fn test_robust_lt_mads_with_search() {
        let res = MadsBuilder::optimize(noisy_sphere)
            .configure(|config| {
                config
                    .method(Method::RobustLtMads { beta: 1. })
                    .search(Box::new(RandomSearch::default().n_points(3)))
                    .x0(array![5., -3.])
                    .max_evals(2000)
                    .seed(42)
            })
            .min_within(square())
            .run()
            .unwrap();
        assert!(res.state.mesh_level().unwrap() > 0);
        assert!(res.y_opt < 34., "f = {}", res.y_opt);
        assert!(res.x_opt.dot(&res.x_opt).sqrt() < 2., "x = {}", res.x_opt);
        // search evaluations enter the smoothing history too
        let (cache_len, value) = smoothed_incumbent(&res);
        assert_eq!(cache_len as u64, res.n_evals);
        assert_eq!(res.y_opt, value);
    }

    #[test]
    fn test_robust_value_is_current_smoothed_estimate() {
        for max_iters in 1..40 {
            let res = MadsBuilder::optimize(noisy_sphere)
                .configure(|config| {
                    config
                        .method(Method::RobustLtMads { beta: 1. })
                        .x0(array![5., -3.])
                        .max_iters(max_iters)
                        .store_trace(true)
                        .seed(3)
                })
                .min_within(square())
                .run()
                .unwrap();
            let (_, value) = smoothed_incumbent(&res);
            assert_eq!(res.y_opt, value, "after {max_iters} iterations");
            let trace = res.trace.unwrap();
            assert_eq!(trace.last().unwrap().y, value);
        }
    }

    #[test]
    fn test_unbounded_objective_is_not_a_target_stop() {
        let unbounded = |x: &ArrayView1<f64>| {
            if x[0] > 0. {
                f64::NEG_INFINITY
            } else {
                sphere(x)
            }
        };
        let res = MadsBuilder::optimize(unbounded)
            .configure(|config| config.max_evals(1000))
            .min_within(square())
            .run()
            .unwrap();
        assert_eq!(res.y_opt, f64::NEG_INFINITY);
        assert_ne!(res.stop_reason, StopReason::FTargetReached);
        assert_eq!(res.stop_reason, StopReason::MinMeshSize);
    }

    #[test]
    fn test_stagnation_stops_after_five_iterations() {
        let flat = |_x: &ArrayView1<f64>| 1.;
        let res = MadsBuilder::optimize(flat)
            .configure(|config| config.ftol(1e-8))
            .min_within(square())
            .run()
            .unwrap();
        assert_eq!(res.stop_reason, StopReason::FTolReached);
        assert_eq!(res.n_iters, 5);
        assert_eq!(res.n_evals, 1 + 5 * 4);

        let res = MadsBuilder::optimize(flat)
            .configure(|config| config.xtol(1e-8))
            .min_within(square())
            .run()
            .unwrap();
        assert_eq!(res.stop_reason, StopReason::XTolReached);
        assert_eq!(res.n_iters, 5);
    }

    #[test]
    fn test_max_iters_and_trace() {
        let res = MadsBuilder::optimize(sphere)
            .configure(|config| {
                config
                    .x0(array![5., -3.])
                    .max_iters(7)
                    .store_trace(true)
                    .seed(42)
            })
            .min_within(square())
            .run()
            .unwrap();
        assert_eq!(res.stop_reason, StopReason::MaxIterations);
        assert_eq!(res.n_iters, 7);
        let trace = res.trace.unwrap();
        assert_eq!(trace.len(), 8);
        assert_eq!(trace[0].iter, 0);
        assert_abs_diff_eq!(trace[0].x, array![5., -3.], epsilon = 1e-12);
        assert_abs_diff_eq!(trace[0].y, 34.);
        assert!(trace.windows(2).all(|w| w[1].y <= w[0].y));
        assert_abs_diff_eq!(trace[7].y, res.y_opt);
    }

    #[test]
    fn test_target_and_budgets() {
        let res = MadsBuilder::optimize(sphere)
            .configure(|config| config.x0(array![5., -3.]).target(1.))
            .min_within(square())
            .run()
            .unwrap();
        assert_eq!(res.stop_reason, StopReason::FTargetReached);
        assert!(res.y_opt < 1.);

        let res = MadsBuilder::optimize(sphere)
            .configure(|config| config.x0(array![5., -3.]).max_evals(1))
            .min_within(square())
            .run()
            .unwrap();
        assert_eq!(res.stop_reason, StopReason::MaxEvaluations);
        assert_eq!(res.n_iters, 0);
        assert_eq!(res.n_evals, 1);

        let res = MadsBuilder::optimize(sphere)
            .configure(|config| config.x0(array![5., -3.]).max_time(Duration::ZERO))
            .min_within(square())
            .run()
            .unwrap();
        assert_eq!(res.stop_reason, StopReason::MaxTime);
        assert_eq!(res.n_iters, 0);
    }
}
