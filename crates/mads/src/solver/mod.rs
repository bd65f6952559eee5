//! # MADS Solver Module
//!
//! This module contains the argmin solver implementing Mesh Adaptive Direct
//! Search.
//!
//! ## Core Components
//!
//! - [`MadsSolver`] - The solver implementing the argmin `Solver` trait
//! - [`MadsState`] - Optimization state tracking (implements argmin `State`)
//! - [`MadsConfig`] / [`ValidMadsConfig`] - Solver configuration
//! - [`Method`] - MADS variant (direction generator and acceptance rule)
//!
//! ## Iteration
//!
//! Each iteration runs the search stage, then the poll stage unless the
//! search improved the incumbent. The outcome drives the mesh update and the
//! stagnation counter. Termination is checked by the solver in this order:
//! mesh size floor, target value, evaluation budget, wall time budget and
//! stagnation. The iteration cap is handled by argmin last.
//!
//! ## Usage with argmin
//!
//! ```no_run
//! use argmin::core::{CostFunction, Error, Executor};
//! use mads::{Bounds, DomainConstraints, MadsConfig, MadsSolver};
//! use ndarray::Array1;
//!
//! struct Sphere;
//! impl CostFunction for Sphere {
//!     type Param = Array1<f64>;
//!     type Output = f64;
//!     fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
//!         Ok(x.dot(x))
//!     }
//! }
//! impl DomainConstraints for Sphere {
//!     fn first_violated(&self, _x: &Array1<f64>) -> Option<usize> {
//!         None
//!     }
//! }
//!
//! let config = MadsConfig::default()
//!     .bounds(Bounds::broadcast(-10., 10., 2).unwrap())
//!     .max_evals(500)
//!     .check()
//!     .unwrap();
//! let result = Executor::new(Sphere, MadsSolver::new(config)).run().unwrap();
//! ```
mod mads_config;
mod mads_solver;
mod mads_state;
mod poll;
mod solver_impl;

pub use mads_config::*;
pub use mads_solver::*;
pub use mads_state::*;
