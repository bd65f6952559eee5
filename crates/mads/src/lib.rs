//! This library implements the Mesh Adaptive Direct Search (MADS) method,
//! a derivative-free algorithm to minimize a blackbox function within bounds
//! and subject to feasibility predicates.
//!
//! Each iteration runs an optional search stage then polls the points of a
//! mesh around the incumbent along a positive spanning set of directions.
//! The mesh is refined on failure and coarsened on success.
//!
//! Available variants:
//! * LT-MADS: random lower-triangular direction bases, `N+1` poll directions
//! * OrthoMADS: orthogonal bases built from Halton sequences, `2N` poll
//!   directions or `N+1` with the negative-gradient reduction
//! * Robust LT-MADS and Robust OrthoMADS: acceptance of points based on a
//!   Gaussian kernel smoothing of the evaluation history, suited to noisy
//!   objectives
//!
//! # Example
//!
//! ```no_run
//! use mads::{Bounds, MadsBuilder, Method};
//! use ndarray::{ArrayView1, array};
//!
//! fn rosenbrock(x: &ArrayView1<f64>) -> f64 {
//!     (1. - x[0]).powi(2) + 100. * (x[1] - x[0] * x[0]).powi(2)
//! }
//!
//! let res = MadsBuilder::optimize(rosenbrock)
//!     .configure(|config| {
//!         config
//!             .method(Method::LtMads)
//!             .x0(array![-1.2, 1.])
//!             .max_evals(5000)
//!     })
//!     .min_within(Bounds::broadcast(-5., 5., 2).unwrap())
//!     .run()
//!     .expect("Rosenbrock minimization");
//! println!("Rosenbrock min result = {:?}", res.y_opt);
//! ```
//!
//! The method can also be selected by name, see [`Method`] `FromStr`
//! implementation (`"ltmads"`, `"orthomads"`, `"orthomads-neg"`,
//! `"robust-ltmads"`, `"robust-orthomads"` and `"robust-orthomads-neg"`).
//!
//! Logs are written to stdout and filtered with the `MADS_LOG` environment
//! variable (ex: `MADS_LOG=debug`).
//!
pub mod acceptance;
pub mod directions;
pub mod errors;
pub mod mesh;
pub mod search;
pub mod smoothing;
pub mod solver;
pub mod transform;
pub mod types;

mod mads;

pub use crate::acceptance::Acceptance;
pub use crate::errors::*;
pub use crate::mads::*;
pub use crate::mesh::MeshKind;
pub use crate::search::{NoSearch, RandomSearch, SearchStrategy};
pub use crate::solver::{MadsConfig, MadsSolver, MadsState, Method, ValidMadsConfig};
pub use crate::transform::Bounds;
pub use crate::types::*;

/// Environment variable filtering the log output
pub const MADS_LOG: &str = "MADS_LOG";
