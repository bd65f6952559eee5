use crate::solver::MadsState;
use argmin::core::TerminationReason;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a search or poll stage, also used to drive the mesh update.
///
/// The integer codes (`+1`, `0`, `-1`) are the ones used in the MADS
/// literature: `Improved` may coarsen the mesh, `Failed` refines it and
/// `Neutral` leaves it untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum Success {
    /// A strictly better incumbent was found at the evaluated point
    Improved = 1,
    /// No new point but the incumbent may have moved (smoothed cache success)
    Neutral = 0,
    /// No progress
    Failed = -1,
}

impl Success {
    /// Integer code of the outcome
    pub fn code(&self) -> i8 {
        *self as i8
    }

    /// Whether poll has to stop on this outcome (first-improvement policy)
    pub fn is_accepted(&self) -> bool {
        self.code() >= 0
    }
}

/// Reason why an optimization run stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Mesh size fell below the configured floor
    MinMeshSize,
    /// Iteration cap reached
    MaxIterations,
    /// Evaluation budget exhausted
    MaxEvaluations,
    /// Wall-time budget exhausted
    MaxTime,
    /// Objective value went below the target value
    FTargetReached,
    /// Objective stagnation over consecutive unsuccessful iterations
    FTolReached,
    /// Incumbent stagnation over consecutive unsuccessful iterations
    XTolReached,
}

impl StopReason {
    fn as_str(&self) -> &'static str {
        match self {
            StopReason::MinMeshSize => "MinMeshSize",
            StopReason::MaxIterations => "MaxIterations",
            StopReason::MaxEvaluations => "MaxEvaluations",
            StopReason::MaxTime => "MaxTime",
            StopReason::FTargetReached => "FTargetReached",
            StopReason::FTolReached => "FTolReached",
            StopReason::XTolReached => "XTolReached",
        }
    }

    /// Argmin termination reason carrying this stop reason
    pub(crate) fn to_termination(self) -> TerminationReason {
        TerminationReason::SolverExit(self.to_string())
    }

    /// Map back an argmin termination reason
    pub(crate) fn from_termination(reason: &TerminationReason) -> Option<StopReason> {
        match reason {
            TerminationReason::MaxItersReached => Some(StopReason::MaxIterations),
            TerminationReason::SolverExit(msg) => msg.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StopReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        [
            StopReason::MinMeshSize,
            StopReason::MaxIterations,
            StopReason::MaxEvaluations,
            StopReason::MaxTime,
            StopReason::FTargetReached,
            StopReason::FTolReached,
            StopReason::XTolReached,
        ]
        .into_iter()
        .find(|r| r.as_str() == s)
        .ok_or_else(|| format!("Unknown stop reason {s}"))
    }
}

/// A constraint predicate: a point is feasible when every predicate returns `true`.
/// Predicates receive points in user coordinates.
pub type Cstr = Box<dyn Fn(&ArrayView1<f64>) -> bool + Send + Sync>;

/// An interface for problems exposing feasibility predicates
/// besides their cost function.
pub trait DomainConstraints {
    /// Index of the first predicate rejecting `x`, `None` when `x` is feasible.
    fn first_violated(&self, x: &Array1<f64>) -> Option<usize>;

    /// Whether `x` satisfies all the predicates
    fn is_feasible(&self, x: &Array1<f64>) -> bool {
        self.first_violated(x).is_none()
    }
}

/// One snapshot of the optimization history
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Incumbent expressed in user coordinates
    pub x: Array1<f64>,
    /// Incumbent value (smoothed estimate for the robust variant)
    pub y: f64,
    /// Iteration index, 0 being the start point
    pub iter: u64,
}

/// Optimization result
#[derive(Clone, Debug)]
pub struct OptimResult {
    /// Optimum location (user coordinates)
    pub x_opt: Array1<f64>,
    /// Optimum value
    pub y_opt: f64,
    /// Why the run stopped
    pub stop_reason: StopReason,
    /// Number of iterations
    pub n_iters: u64,
    /// Number of objective evaluations
    pub n_evals: u64,
    /// Elapsed wall time
    pub elapsed: web_time::Duration,
    /// Per iteration trace when requested
    pub trace: Option<Vec<TraceEntry>>,
    /// Final state of the optimizer
    pub state: MadsState,
}
