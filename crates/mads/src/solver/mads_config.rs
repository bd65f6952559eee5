//! MADS optimizer configuration.
use crate::acceptance::Acceptance;
use crate::directions::DirectionKind;
use crate::errors::{MadsError, Result};
use crate::mesh::MeshKind;
use crate::search::{NoSearch, SearchStrategy};
use crate::transform::Bounds;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use web_time::Duration;

/// Default kernel bandwidth scale of the robust variants
pub const DEFAULT_BETA: f64 = 1.0;
/// Default mesh size floor
pub const DEFAULT_MIN_MESH_SIZE: f64 = 1e-12;
/// Default progress report period (iterations)
pub const DEFAULT_LOG_INTERVAL: u64 = 10;

/// MADS variant: direction generator and incumbent acceptance rule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Method {
    /// Lower triangular directions, plain acceptance
    LtMads,
    /// Orthogonal directions, plain acceptance
    OrthoMads {
        /// Negative reduction of the direction set (`N+1` instead of `2N`)
        reduction: bool,
    },
    /// Lower triangular directions, kernel-smoothed acceptance
    RobustLtMads {
        /// Bandwidth scale relative to the mesh size
        beta: f64,
    },
    /// Orthogonal directions, kernel-smoothed acceptance
    RobustOrthoMads {
        /// Bandwidth scale relative to the mesh size
        beta: f64,
        /// Negative reduction of the direction set
        reduction: bool,
    },
}

impl Default for Method {
    fn default() -> Self {
        Method::OrthoMads { reduction: false }
    }
}

impl Method {
    /// Direction generator of this variant
    pub fn directions(&self) -> DirectionKind {
        match self {
            Method::LtMads | Method::RobustLtMads { .. } => DirectionKind::Lt,
            Method::OrthoMads { reduction } | Method::RobustOrthoMads { reduction, .. } => {
                DirectionKind::Ortho {
                    reduction: *reduction,
                }
            }
        }
    }

    /// Kernel bandwidth scale for the robust variants
    pub fn beta(&self) -> Option<f64> {
        match self {
            Method::RobustLtMads { beta } | Method::RobustOrthoMads { beta, .. } => Some(*beta),
            _ => None,
        }
    }

    /// Fresh acceptance rule of this variant for `dim`-dimensional points
    pub fn acceptance(&self, dim: usize) -> Acceptance {
        match self.beta() {
            Some(beta) => Acceptance::smoothed(beta, dim),
            None => Acceptance::Plain,
        }
    }
}

impl FromStr for Method {
    type Err = MadsError;

    /// Parse a method identifier: `ltmads`, `orthomads`, `orthomads-neg`,
    /// `robust-ltmads`, `robust-orthomads` or `robust-orthomads-neg` (case insensitive).
    fn from_str(s: &str) -> Result<Self> {
        let method = match s.to_ascii_lowercase().as_str() {
            "ltmads" => Method::LtMads,
            "orthomads" => Method::OrthoMads { reduction: false },
            "orthomads-neg" => Method::OrthoMads { reduction: true },
            "robust-ltmads" => Method::RobustLtMads { beta: DEFAULT_BETA },
            "robust-orthomads" => Method::RobustOrthoMads {
                beta: DEFAULT_BETA,
                reduction: false,
            },
            "robust-orthomads-neg" => Method::RobustOrthoMads {
                beta: DEFAULT_BETA,
                reduction: true,
            },
            _ => {
                return Err(MadsError::InvalidConfigError(format!(
                    "Unknown method '{s}'"
                )));
            }
        };
        Ok(method)
    }
}

/// MADS optimizer configuration builder
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MadsConfig {
    pub(crate) max_iters: u64,
    pub(crate) max_evals: u64,
    pub(crate) max_time: Option<Duration>,
    pub(crate) min_mesh_size: f64,
    pub(crate) target: Option<f64>,
    pub(crate) ftol: f64,
    pub(crate) xtol: f64,
    pub(crate) verbose: u8,
    pub(crate) log_interval: u64,
    pub(crate) store_trace: bool,
    pub(crate) seed: Option<u64>,
    pub(crate) method: Method,
    pub(crate) mesh: MeshKind,
    pub(crate) search: Box<dyn SearchStrategy>,
    pub(crate) bounds: Option<Bounds>,
    pub(crate) x0: Option<Array1<f64>>,
}

impl Default for MadsConfig {
    fn default() -> Self {
        MadsConfig {
            max_iters: u64::MAX,
            max_evals: u64::MAX,
            max_time: None,
            min_mesh_size: DEFAULT_MIN_MESH_SIZE,
            target: None,
            ftol: 0.,
            xtol: 0.,
            verbose: 0,
            log_interval: DEFAULT_LOG_INTERVAL,
            store_trace: false,
            seed: None,
            method: Method::default(),
            mesh: MeshKind::default(),
            search: Box::new(NoSearch),
            bounds: None,
            x0: None,
        }
    }
}

impl MadsConfig {
    /// Sets the maximum number of iterations
    pub fn max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Sets the maximum number of objective evaluations
    pub fn max_evals(mut self, max_evals: u64) -> Self {
        self.max_evals = max_evals;
        self
    }

    /// Sets the wall time budget
    pub fn max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Sets the mesh size below which the optimization stops
    pub fn min_mesh_size(mut self, min_mesh_size: f64) -> Self {
        self.min_mesh_size = min_mesh_size;
        self
    }

    /// Sets the objective value below which the optimization stops
    pub fn target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the objective stagnation tolerance (0 disables the test)
    pub fn ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    /// Sets the incumbent stagnation tolerance (0 disables the test)
    pub fn xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    /// Sets the verbosity: 0 silent, 1 periodic progress, 2 every iteration
    pub fn verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the number of iterations between two progress reports
    pub fn log_interval(mut self, log_interval: u64) -> Self {
        self.log_interval = log_interval;
        self
    }

    /// Whether the incumbent history is recorded
    pub fn store_trace(mut self, store_trace: bool) -> Self {
        self.store_trace = store_trace;
        self
    }

    /// Sets a random seed for reproducibility
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the MADS variant
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the mesh size controller
    pub fn mesh(mut self, mesh: MeshKind) -> Self {
        self.mesh = mesh;
        self
    }

    /// Sets the search stage strategy
    pub fn search(mut self, search: Box<dyn SearchStrategy>) -> Self {
        self.search = search;
        self
    }

    /// Sets the design space bounds
    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Sets the initial point (user coordinates), defaults to the center of the bounds
    pub fn x0(mut self, x0: Array1<f64>) -> Self {
        self.x0 = Some(x0);
        self
    }

    /// Check the configuration and return a validated one
    pub fn check(self) -> Result<ValidMadsConfig> {
        let bounds = self.bounds.ok_or_else(|| {
            MadsError::InvalidConfigError("Bounds of the design space are required".to_string())
        })?;
        let x0 = match self.x0 {
            Some(x0) if x0.len() != bounds.dim() => {
                return Err(MadsError::InvalidConfigError(format!(
                    "Initial point dimension ({}) does not match bounds dimension ({})",
                    x0.len(),
                    bounds.dim()
                )));
            }
            Some(x0) if x0.iter().any(|v| v.is_nan()) => {
                return Err(MadsError::InvalidConfigError(
                    "Initial point should not contain NaN".to_string(),
                ));
            }
            Some(x0) => x0,
            None => (bounds.lower() + bounds.upper()) / 2.,
        };
        if self.mesh.base() <= 1. || !self.mesh.base().is_finite() {
            return Err(MadsError::InvalidConfigError(format!(
                "Mesh base should be greater than 1, got {}",
                self.mesh.base()
            )));
        }
        if let MeshKind::Stochastic {
            expansion_bound,
            contraction_bound,
            ..
        } = self.mesh
            && (expansion_bound < 0 || contraction_bound > -1)
        {
            return Err(MadsError::InvalidConfigError(format!(
                "Stochastic mesh bounds should satisfy expansion >= 0 and contraction <= -1, got ({expansion_bound}, {contraction_bound})"
            )));
        }
        if let Some(beta) = self.method.beta()
            && !(beta > 0. && beta.is_finite())
        {
            return Err(MadsError::InvalidConfigError(format!(
                "Bandwidth scale should be positive, got {beta}"
            )));
        }
        if !(self.min_mesh_size >= 0.) {
            return Err(MadsError::InvalidConfigError(format!(
                "Minimum mesh size should be non negative, got {}",
                self.min_mesh_size
            )));
        }
        if !(self.ftol >= 0.) || !(self.xtol >= 0.) {
            return Err(MadsError::InvalidConfigError(format!(
                "Stagnation tolerances should be non negative, got ftol={} xtol={}",
                self.ftol, self.xtol
            )));
        }
        if self.target.is_some_and(f64::is_nan) {
            return Err(MadsError::InvalidConfigError(
                "Target value should not be NaN".to_string(),
            ));
        }
        Ok(ValidMadsConfig {
            max_iters: self.max_iters,
            max_evals: self.max_evals,
            max_time: self.max_time,
            min_mesh_size: self.min_mesh_size,
            target: self.target,
            ftol: self.ftol,
            xtol: self.xtol,
            verbose: self.verbose,
            log_interval: self.log_interval.max(1),
            store_trace: self.store_trace,
            seed: self.seed,
            method: self.method,
            mesh: self.mesh,
            search: self.search,
            bounds,
            x0,
        })
    }
}

/// A validated MADS optimizer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidMadsConfig {
    /// Maximum number of iterations
    pub max_iters: u64,
    /// Maximum number of objective evaluations
    pub max_evals: u64,
    /// Wall time budget
    pub max_time: Option<Duration>,
    /// Mesh size floor
    pub min_mesh_size: f64,
    /// Objective target value, none meaning `-inf`
    pub target: Option<f64>,
    /// Objective stagnation tolerance
    pub ftol: f64,
    /// Incumbent stagnation tolerance
    pub xtol: f64,
    /// Verbosity level
    pub verbose: u8,
    /// Iterations between two progress reports
    pub log_interval: u64,
    /// Whether the incumbent history is recorded
    pub store_trace: bool,
    /// Random seed
    pub seed: Option<u64>,
    /// MADS variant
    pub method: Method,
    /// Mesh size controller
    pub mesh: MeshKind,
    /// Search stage strategy
    pub search: Box<dyn SearchStrategy>,
    /// Design space bounds
    pub bounds: Bounds,
    /// Initial point (user coordinates)
    pub x0: Array1<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn bounds() -> Bounds {
        Bounds::broadcast(-10., 10., 2).unwrap()
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("LTMADS".parse::<Method>().unwrap(), Method::LtMads);
        assert_eq!(
            "OrthoMads-Neg".parse::<Method>().unwrap(),
            Method::OrthoMads { reduction: true }
        );
        assert_eq!(
            "robust-orthomads".parse::<Method>().unwrap(),
            Method::RobustOrthoMads {
                beta: DEFAULT_BETA,
                reduction: false
            }
        );
        assert!(matches!(
            "nomad".parse::<Method>(),
            Err(MadsError::InvalidConfigError(_))
        ));
    }

    #[test]
    fn test_method_components() {
        let method = Method::RobustLtMads { beta: 2. };
        assert_eq!(method.directions(), DirectionKind::Lt);
        assert_eq!(method.acceptance(2).name(), "Smoothed");
        assert_eq!(Method::default().acceptance(2).name(), "Plain");
    }

    #[test]
    fn test_config_defaults() {
        let config = MadsConfig::default().bounds(bounds()).check().unwrap();
        assert_eq!(config.max_iters, u64::MAX);
        assert_eq!(config.max_evals, u64::MAX);
        assert_eq!(config.min_mesh_size, 1e-12);
        assert_eq!(config.target, None);
        assert_eq!(config.x0, array![0., 0.]);
        assert_eq!(config.method, Method::OrthoMads { reduction: false });
        assert_eq!(config.search.name(), "NoSearch");
    }

    #[test]
    fn test_config_errors() {
        assert!(matches!(
            MadsConfig::default().check(),
            Err(MadsError::InvalidConfigError(_))
        ));
        assert!(matches!(
            MadsConfig::default()
                .bounds(bounds())
                .x0(array![1., 2., 3.])
                .check(),
            Err(MadsError::InvalidConfigError(_))
        ));
        assert!(
            MadsConfig::default()
                .bounds(bounds())
                .mesh(MeshKind::LogScale { base: 1. })
                .check()
                .is_err()
        );
        assert!(
            MadsConfig::default()
                .bounds(bounds())
                .method(Method::RobustLtMads { beta: 0. })
                .check()
                .is_err()
        );
        assert!(
            MadsConfig::default()
                .bounds(bounds())
                .mesh(MeshKind::Stochastic {
                    base: 4.,
                    expansion_bound: 1,
                    contraction_bound: 0
                })
                .check()
                .is_err()
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = MadsConfig::default()
            .bounds(bounds())
            .method(Method::LtMads)
            .seed(42)
            .check()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: ValidMadsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.method, Method::LtMads);
        assert_eq!(back.seed, Some(42));
        assert_eq!(back.bounds, config.bounds);
    }
}
