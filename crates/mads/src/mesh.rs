//! # Mesh controllers
//!
//! The mesh is the grid on which every trial point lies. Its resolution is
//! a positive scalar (the mesh size) associated to a discrete level used by
//! the direction generators to scale integer directions.
//!
//! Two controllers are available:
//!
//! - [`LogMesh`] - size is exactly `base^-level`, success decrements the level
//!   by one, failure increments it by one.
//! - [`StochasticMesh`] - size is multiplied by `base^w` with `w` an integer
//!   drawn uniformly within configured bounds (`[0, expansion]` on success,
//!   `[contraction, -1]` on failure).
//!
//! Both controllers keep the mesh size within `[base^-MAX_MESH_LEVEL, 1]` so
//! that the size stays positive and `2^level` stays representable.
use crate::types::Success;

use dyn_clonable::*;
use ndarray_rand::rand::Rng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Finest mesh level reachable by the controllers
pub const MAX_MESH_LEVEL: i32 = 50;

/// A trait for mesh size controllers.
///
/// Controllers are mutated once per iteration and owned by a single run.
#[clonable]
pub trait Mesh: Clone + Debug + Send + Sync {
    /// Returns the name of this controller.
    fn name(&self) -> &str;

    /// Current mesh size, always strictly positive.
    fn size(&self) -> f64;

    /// Current mesh level, within `[0, MAX_MESH_LEVEL]`.
    fn level(&self) -> i32;

    /// Adjust the mesh according to the iteration outcome.
    fn update(&mut self, success: Success, rng: &mut Xoshiro256Plus);
}

/// Mesh controller where the size is a power of `base` indexed by the level
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogMesh {
    base: f64,
    level: i32,
}

impl LogMesh {
    /// Coarsest mesh (size 1) for the given base
    pub fn new(base: f64) -> Self {
        LogMesh { base, level: 0 }
    }
}

impl Mesh for LogMesh {
    fn name(&self) -> &str {
        "LogMesh"
    }

    fn size(&self) -> f64 {
        self.base.powi(-self.level)
    }

    fn level(&self) -> i32 {
        self.level
    }

    fn update(&mut self, success: Success, _rng: &mut Xoshiro256Plus) {
        match success {
            Success::Improved => self.level = (self.level - 1).max(0),
            Success::Failed => self.level = (self.level + 1).min(MAX_MESH_LEVEL),
            Success::Neutral => (),
        }
    }
}

/// Mesh controller where the size is updated by a random power of `base`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StochasticMesh {
    base: f64,
    size: f64,
    expansion_bound: i32,
    contraction_bound: i32,
}

impl StochasticMesh {
    /// Coarsest mesh (size 1).
    /// `expansion_bound >= 0` and `contraction_bound <= -1` are expected.
    pub fn new(base: f64, expansion_bound: i32, contraction_bound: i32) -> Self {
        StochasticMesh {
            base,
            size: 1.,
            expansion_bound: expansion_bound.max(0),
            contraction_bound: contraction_bound.min(-1),
        }
    }

    fn finest(&self) -> f64 {
        self.base.powi(-MAX_MESH_LEVEL)
    }
}

impl Mesh for StochasticMesh {
    fn name(&self) -> &str {
        "StochasticMesh"
    }

    fn size(&self) -> f64 {
        self.size
    }

    fn level(&self) -> i32 {
        let level = (-self.size.ln() / self.base.ln()).round() as i32;
        level.clamp(0, MAX_MESH_LEVEL)
    }

    fn update(&mut self, success: Success, rng: &mut Xoshiro256Plus) {
        match success {
            Success::Improved => {
                if self.size < 1. {
                    let w = rng.gen_range(0..=self.expansion_bound);
                    self.size = (self.size * self.base.powi(w)).min(1.);
                }
            }
            Success::Failed => {
                let w = rng.gen_range(self.contraction_bound..=-1);
                self.size = (self.size * self.base.powi(w)).max(self.finest());
            }
            Success::Neutral => (),
        }
    }
}

/// Mesh controller choice, built into a fresh [`Mesh`] per run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MeshKind {
    /// See [`LogMesh`]
    LogScale {
        /// Power base of the mesh size
        base: f64,
    },
    /// See [`StochasticMesh`]
    Stochastic {
        /// Power base of the mesh size
        base: f64,
        /// Largest exponent drawn on success
        expansion_bound: i32,
        /// Smallest exponent drawn on failure
        contraction_bound: i32,
    },
}

impl Default for MeshKind {
    fn default() -> Self {
        MeshKind::LogScale { base: 4. }
    }
}

impl MeshKind {
    /// Power base of the mesh size
    pub fn base(&self) -> f64 {
        match self {
            MeshKind::LogScale { base } | MeshKind::Stochastic { base, .. } => *base,
        }
    }

    /// Build a fresh controller at the coarsest mesh
    pub fn build(&self) -> Box<dyn Mesh> {
        match self {
            MeshKind::LogScale { base } => Box::new(LogMesh::new(*base)),
            MeshKind::Stochastic {
                base,
                expansion_bound,
                contraction_bound,
            } => Box::new(StochasticMesh::new(
                *base,
                *expansion_bound,
                *contraction_bound,
            )),
        }
    }
}
