//! Online Gaussian kernel regression over the evaluation history, used to
//! compare noisy objective values.
//!
//! Every evaluated point is kept in an append-only [`EvaluationCache`] along
//! with its raw value, its smoothed value and its cumulative kernel weight.
//! On each new observation `(x, y)` with kernel weights
//! `psi_i = exp(-|x - x_i|^2 / (2 sigma^2))`:
//!
//! * old points blend `y` in: `s_i <- (w_i s_i + psi_i y) / (w_i + psi_i)`, `w_i <- w_i + psi_i`
//! * the new point gets the Nadaraya-Watson estimate
//!   `s = (sum_i psi_i y_i + y) / (sum_i psi_i + 1)` with weight `sum_i psi_i + 1`
use crate::errors::{MadsError, Result};

use ndarray::{Array1, Array2, ArrayView1, Axis, Zip, aview1};
use ndarray_stats::QuantileExt;
use serde::{Deserialize, Serialize};

/// Cache size above which the kernel update runs in parallel
pub const PARALLEL_THRESHOLD: usize = 1024;

/// Append-only record of the evaluated points (canonical coordinates)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationCache {
    x: Array2<f64>,
    y: Array1<f64>,
    smoothed: Array1<f64>,
    weights: Array1<f64>,
    minimizers: Vec<usize>,
}

impl EvaluationCache {
    /// Empty cache for `dim`-dimensional points
    pub fn new(dim: usize) -> Self {
        EvaluationCache {
            x: Array2::zeros((0, dim)),
            y: Array1::zeros(0),
            smoothed: Array1::zeros(0),
            weights: Array1::zeros(0),
            minimizers: vec![],
        }
    }

    /// Number of cached evaluations
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Evaluated points, one per row
    pub fn points(&self) -> &Array2<f64> {
        &self.x
    }

    /// Raw objective values
    pub fn raw(&self) -> &Array1<f64> {
        &self.y
    }

    /// Smoothed objective values
    pub fn smoothed(&self) -> &Array1<f64> {
        &self.smoothed
    }

    /// Cumulative kernel weights
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Indices which have been the running minimizer, in order
    pub fn minimizers(&self) -> &[usize] {
        &self.minimizers
    }

    /// Last recorded running minimizer
    pub fn last_minimizer(&self) -> Option<usize> {
        self.minimizers.last().copied()
    }

    pub(crate) fn record_minimizer(&mut self, index: usize) {
        self.minimizers.push(index);
    }

    /// Index of the lowest smoothed value
    pub fn best(&self) -> Result<usize> {
        self.smoothed
            .argmin()
            .map_err(|err| MadsError::InvalidValue(format!("No smoothed minimum: {err}")))
    }

    fn push(&mut self, x: &ArrayView1<f64>, y: f64, smoothed: f64, weight: f64) -> Result<()> {
        let shape_err = |err: ndarray::ShapeError| MadsError::InvalidValue(err.to_string());
        self.x.push_row(x.view()).map_err(shape_err)?;
        self.y.append(Axis(0), aview1(&[y])).map_err(shape_err)?;
        self.smoothed
            .append(Axis(0), aview1(&[smoothed]))
            .map_err(shape_err)?;
        self.weights
            .append(Axis(0), aview1(&[weight]))
            .map_err(shape_err)?;
        Ok(())
    }
}

/// Gaussian kernel smoother with a bandwidth proportional to the mesh size
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelSmoother {
    beta: f64,
    variance: f64,
    parallel_threshold: usize,
    cache: EvaluationCache,
}

impl KernelSmoother {
    /// Smoother with bandwidth scale `beta` for `dim`-dimensional points
    pub fn new(beta: f64, dim: usize) -> Self {
        KernelSmoother {
            beta,
            variance: beta * beta,
            parallel_threshold: PARALLEL_THRESHOLD,
            cache: EvaluationCache::new(dim),
        }
    }

    /// Set the cache size above which updates run in parallel
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Bandwidth scale
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Current kernel variance `(beta * mesh_size)^2`
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Recompute the kernel variance from the current mesh size
    pub fn set_mesh_size(&mut self, mesh_size: f64) {
        let sigma = self.beta * mesh_size;
        self.variance = sigma * sigma;
    }

    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut EvaluationCache {
        &mut self.cache
    }

    fn kernel_weights(&self, x: &ArrayView1<f64>) -> Array1<f64> {
        let two_var = 2. * self.variance;
        let kernel = |xi: ArrayView1<f64>| {
            let d2: f64 = xi
                .iter()
                .zip(x.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            (-d2 / two_var).exp()
        };
        let rows = Zip::from(self.cache.x.rows());
        if self.cache.len() >= self.parallel_threshold {
            rows.par_map_collect(kernel)
        } else {
            rows.map_collect(kernel)
        }
    }

    /// Cache the observation `(x, y)`, update smoothed values of the history
    /// and return the index of the new point.
    pub fn observe(&mut self, x: &ArrayView1<f64>, y: f64) -> Result<usize> {
        let psi = self.kernel_weights(x);
        let own_weight = psi.sum() + 1.;
        let own_estimate = (psi.dot(&self.cache.y) + y) / own_weight;

        let blend = |s: &mut f64, w: &mut f64, &p: &f64| {
            let total = *w + p;
            *s = (*w * *s + p * y) / total;
            *w = total;
        };
        let update = Zip::from(&mut self.cache.smoothed)
            .and(&mut self.cache.weights)
            .and(&psi);
        if psi.len() >= self.parallel_threshold {
            update.par_for_each(blend);
        } else {
            update.for_each(blend);
        }

        self.cache.push(x, y, own_estimate, own_weight)?;
        Ok(self.cache.len() - 1)
    }
}
