//! # MadsState - Optimizer State Implementation
//!
//! This module implements the [`MadsState`] struct which tracks all state
//! information during a MADS run. It implements the `argmin::State` trait for
//! integration with the argmin optimization framework.
//!
//! Besides the core iteration state required by argmin, the state owns the
//! per-run components, so that nothing is shared between two runs:
//!
//! - [`PollState`] - mesh controller, direction generator and acceptance rule
//! - [`StagnationState`] - consecutive stagnating iterations counter
//! - the seeded random generator, the evaluation counter and the optional trace
//!
//! Parameters held by the state are expressed in the canonical domain.
use crate::acceptance::Acceptance;
use crate::directions::DirectionGenerator;
use crate::mesh::Mesh;
use crate::types::{StopReason, Success, TraceEntry};

use argmin::core::{Problem, State, TerminationReason, TerminationStatus};
use ndarray::Array1;
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of consecutive stagnating iterations triggering termination
pub const STAGNATION_LIMIT: u32 = 5;

/// Mesh, directions and acceptance of a run
#[derive(Clone, Debug)]
pub struct PollState {
    /// Mesh size controller
    pub mesh: Box<dyn Mesh>,
    /// Poll direction generator
    pub generator: Box<dyn DirectionGenerator>,
    /// Incumbent acceptance rule
    pub acceptance: Acceptance,
}

/// Stagnation tracking over consecutive unsuccessful iterations
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StagnationState {
    /// Number of consecutive stagnating iterations
    pub count: u32,
    /// Tolerance test which fired at the last stagnating iteration
    pub reason: Option<StopReason>,
}

impl StagnationState {
    /// Account for an iteration with outcome `success` which moved the
    /// objective by `df` and the incumbent by `dx` (user coordinates).
    ///
    /// Only unsuccessful iterations are tested, the objective test first.
    /// A delta strictly below its tolerance is stagnating.
    pub fn update(&mut self, success: Success, df: f64, dx: f64, ftol: f64, xtol: f64) {
        let reason = if success.code() > 0 {
            None
        } else if df < ftol {
            Some(StopReason::FTolReached)
        } else if dx < xtol {
            Some(StopReason::XTolReached)
        } else {
            None
        };
        match reason {
            Some(_) => self.count += 1,
            None => self.count = 0,
        }
        self.reason = reason;
    }

    /// Stop reason once [`STAGNATION_LIMIT`] consecutive iterations stagnated
    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.count >= STAGNATION_LIMIT {
            self.reason
        } else {
            None
        }
    }
}

/// Maintains the state from iteration to iteration of the MADS solver
#[derive(Clone, Debug)]
pub struct MadsState {
    /// Current incumbent
    pub param: Option<Array1<f64>>,
    /// Previous incumbent
    pub prev_param: Option<Array1<f64>>,
    /// Best incumbent
    pub best_param: Option<Array1<f64>>,
    /// Previous best incumbent
    pub prev_best_param: Option<Array1<f64>>,

    /// Current incumbent value (smoothed estimate for the robust variants)
    pub cost: f64,
    /// Previous incumbent value
    pub prev_cost: f64,
    /// Best incumbent value
    pub best_cost: f64,
    /// Previous best incumbent value
    pub prev_best_cost: f64,
    /// Target cost function value
    pub target_cost: f64,

    /// Current iteration
    pub iter: u64,
    /// Iteration number of last incumbent move
    pub last_best_iter: u64,
    /// Maximum number of iterations
    pub max_iters: u64,
    /// Evaluation counts
    pub counts: HashMap<String, u64>,
    /// Time required so far
    pub time: Option<web_time::Duration>,
    /// Optimization status
    pub termination_status: TerminationStatus,

    /// Number of objective evaluations
    pub n_evals: u64,
    /// Outcome of the last iteration
    pub last_success: Option<Success>,
    /// Mesh, directions and acceptance
    pub poll: Option<PollState>,
    /// Stagnation counter
    pub stagnation: StagnationState,
    /// Incumbent history (user coordinates)
    pub trace: Option<Vec<TraceEntry>>,
    /// Random number generator for reproducibility
    pub rng: Option<Xoshiro256Plus>,
}

impl MadsState {
    /// Set incumbent. This shifts the stored incumbent to the previous one.
    #[must_use]
    pub fn param(mut self, param: Array1<f64>) -> Self {
        std::mem::swap(&mut self.prev_param, &mut self.param);
        self.param = Some(param);
        self
    }

    /// Set the incumbent value. This shifts the stored value to the previous one.
    #[must_use]
    pub fn cost(mut self, cost: f64) -> Self {
        std::mem::swap(&mut self.prev_cost, &mut self.cost);
        self.cost = cost;
        self
    }

    /// Set target cost.
    #[must_use]
    pub fn target_cost(mut self, target_cost: f64) -> Self {
        self.target_cost = target_cost;
        self
    }

    /// Set maximum number of iterations
    #[must_use]
    pub fn max_iters(mut self, iters: u64) -> Self {
        self.max_iters = iters;
        self
    }

    /// Set the number of objective evaluations
    #[must_use]
    pub fn n_evals(mut self, n_evals: u64) -> Self {
        self.n_evals = n_evals;
        self
    }

    /// Set the per-run components
    #[must_use]
    pub fn poll(mut self, poll: PollState) -> Self {
        self.poll = Some(poll);
        self
    }

    /// Moves the per-run components out and replaces them internally with `None`
    pub fn take_poll(&mut self) -> Option<PollState> {
        self.poll.take()
    }

    /// Set the random generator
    #[must_use]
    pub fn rng(mut self, rng: Xoshiro256Plus) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Moves the random generator out and replaces it internally with `None`
    pub fn take_rng(&mut self) -> Option<Xoshiro256Plus> {
        self.rng.take()
    }

    /// Current mesh size if the run is initialized
    pub fn mesh_size(&self) -> Option<f64> {
        self.poll.as_ref().map(|p| p.mesh.size())
    }

    /// Current mesh level if the run is initialized
    pub fn mesh_level(&self) -> Option<i32> {
        self.poll.as_ref().map(|p| p.mesh.level())
    }
}

impl State for MadsState {
    /// Type of parameter vector
    type Param = Array1<f64>;
    /// Floating point precision
    type Float = f64;

    fn new() -> Self {
        MadsState {
            param: None,
            prev_param: None,
            best_param: None,
            prev_best_param: None,

            cost: f64::INFINITY,
            prev_cost: f64::INFINITY,
            best_cost: f64::INFINITY,
            prev_best_cost: f64::INFINITY,
            target_cost: f64::NEG_INFINITY,

            iter: 0,
            last_best_iter: 0,
            max_iters: u64::MAX,
            counts: HashMap::new(),
            time: Some(web_time::Duration::new(0, 0)),
            termination_status: TerminationStatus::NotTerminated,

            n_evals: 0,
            last_success: None,
            poll: None,
            stagnation: StagnationState::default(),
            trace: None,
            rng: Some(Xoshiro256Plus::from_entropy()),
        }
    }

    /// The incumbent is the best point by construction: the best point
    /// follows it, recording the iteration whenever it moves.
    fn update(&mut self) {
        if let Some(param) = self.param.as_ref() {
            if self.best_param.as_ref() != Some(param) {
                std::mem::swap(&mut self.prev_best_param, &mut self.best_param);
                self.best_param = Some(param.clone());
                self.last_best_iter = self.iter;
            }
            std::mem::swap(&mut self.prev_best_cost, &mut self.best_cost);
            self.best_cost = self.cost;
        }
    }

    fn get_param(&self) -> Option<&Array1<f64>> {
        self.param.as_ref()
    }

    fn get_best_param(&self) -> Option<&Array1<f64>> {
        self.best_param.as_ref()
    }

    fn terminate_with(mut self, reason: TerminationReason) -> Self {
        self.termination_status = TerminationStatus::Terminated(reason);
        self
    }

    fn time(&mut self, time: Option<web_time::Duration>) -> &mut Self {
        self.time = time;
        self
    }

    fn get_cost(&self) -> Self::Float {
        self.cost
    }

    fn get_best_cost(&self) -> Self::Float {
        self.best_cost
    }

    fn get_target_cost(&self) -> Self::Float {
        self.target_cost
    }

    fn get_iter(&self) -> u64 {
        self.iter
    }

    fn get_last_best_iter(&self) -> u64 {
        self.last_best_iter
    }

    fn get_max_iters(&self) -> u64 {
        self.max_iters
    }

    fn get_termination_status(&self) -> &TerminationStatus {
        &self.termination_status
    }

    fn get_termination_reason(&self) -> Option<&TerminationReason> {
        match &self.termination_status {
            TerminationStatus::Terminated(reason) => Some(reason),
            TerminationStatus::NotTerminated => None,
        }
    }

    fn get_time(&self) -> Option<web_time::Duration> {
        self.time
    }

    fn increment_iter(&mut self) {
        self.iter += 1;
    }

    fn func_counts<O>(&mut self, problem: &Problem<O>) {
        for (k, &v) in problem.counts.iter() {
            let count = self.counts.entry(k.to_string()).or_insert(0);
            *count = v
        }
    }

    fn get_func_counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    fn is_best(&self) -> bool {
        self.last_best_iter == self.iter
    }
}
