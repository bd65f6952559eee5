//! Incumbent acceptance rules.
//!
//! The plain rule accepts a strictly better evaluated value. The smoothed
//! rule, used by the robust variants, compares kernel-smoothed estimates
//! over the whole evaluation history instead of raw noisy values.
use crate::errors::Result;
use crate::smoothing::KernelSmoother;
use crate::types::Success;

use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Incumbent acceptance rule, selected once per run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Acceptance {
    /// Raw value comparison
    Plain,
    /// Kernel-smoothed comparison over the evaluation history
    Smoothed(KernelSmoother),
}

impl Acceptance {
    /// Kernel-smoothed acceptance for `dim`-dimensional points
    pub fn smoothed(beta: f64, dim: usize) -> Self {
        Acceptance::Smoothed(KernelSmoother::new(beta, dim))
    }

    pub fn name(&self) -> &str {
        match self {
            Acceptance::Plain => "Plain",
            Acceptance::Smoothed(_) => "Smoothed",
        }
    }

    /// The smoother of the robust rule
    pub fn smoother(&self) -> Option<&KernelSmoother> {
        match self {
            Acceptance::Plain => None,
            Acceptance::Smoothed(smoother) => Some(smoother),
        }
    }

    /// Register the start point and return its incumbent value.
    ///
    /// A non-finite start value is never cached and yields `+inf` so that
    /// any finite evaluation improves on it.
    pub fn init(&mut self, x: &Array1<f64>, y: f64, mesh_size: f64) -> Result<f64> {
        if !y.is_finite() {
            return Ok(f64::INFINITY);
        }
        match self {
            Acceptance::Plain => Ok(y),
            Acceptance::Smoothed(smoother) => {
                smoother.set_mesh_size(mesh_size);
                let index = smoother.observe(&x.view(), y)?;
                smoother.cache_mut().record_minimizer(index);
                Ok(smoother.cache().smoothed()[index])
            }
        }
    }

    /// Decide whether the evaluation `(x, y)` replaces the incumbent.
    ///
    /// Returns the success code together with the resulting incumbent and
    /// its value. With the smoothed rule the incumbent is the point of
    /// lowest smoothed value in the history, which may be neither `x` nor
    /// the previous incumbent. Moving to a cached point is a cache success
    /// (`Neutral`) only when that point never was a running minimizer,
    /// going back to a former minimizer is a failure so that the mesh is
    /// refined.
    pub fn evaluate(
        &mut self,
        x: &Array1<f64>,
        y: f64,
        incumbent: &Array1<f64>,
        value: f64,
        mesh_size: f64,
    ) -> Result<(Success, Array1<f64>, f64)> {
        match self {
            Acceptance::Plain => {
                let y = if y.is_nan() { f64::INFINITY } else { y };
                if y < value {
                    Ok((Success::Improved, x.to_owned(), y))
                } else {
                    Ok((Success::Failed, incumbent.to_owned(), value))
                }
            }
            Acceptance::Smoothed(smoother) => {
                if !y.is_finite() {
                    let (x, v) = smoothed_incumbent(smoother, incumbent, value);
                    return Ok((Success::Failed, x, v));
                }
                smoother.set_mesh_size(mesh_size);
                let index = smoother.observe(&x.view(), y)?;
                let best = smoother.cache().best()?;
                let cache = smoother.cache_mut();
                let success = if best == index {
                    cache.record_minimizer(best);
                    Success::Improved
                } else if !cache.minimizers().contains(&best) {
                    debug!("Smoothed minimizer moved to cached point #{best}");
                    cache.record_minimizer(best);
                    Success::Neutral
                } else {
                    if cache.last_minimizer() != Some(best) {
                        debug!("Smoothed minimizer back to cached point #{best}");
                        cache.record_minimizer(best);
                    }
                    Success::Failed
                };
                Ok((
                    success,
                    cache.points().row(best).to_owned(),
                    cache.smoothed()[best],
                ))
            }
        }
    }

    /// Current incumbent and its value.
    ///
    /// The plain rule keeps `(incumbent, value)`. The smoothed rule returns
    /// the running minimizer with its up to date smoothed value, as every
    /// evaluation is blended into the estimates of the cached points.
    pub fn incumbent(&self, incumbent: &Array1<f64>, value: f64) -> (Array1<f64>, f64) {
        match self {
            Acceptance::Plain => (incumbent.to_owned(), value),
            Acceptance::Smoothed(smoother) => smoothed_incumbent(smoother, incumbent, value),
        }
    }
}

fn smoothed_incumbent(
    smoother: &KernelSmoother,
    incumbent: &Array1<f64>,
    value: f64,
) -> (Array1<f64>, f64) {
    let cache = smoother.cache();
    match cache.last_minimizer() {
        Some(i) => (cache.points().row(i).to_owned(), cache.smoothed()[i]),
        None => (incumbent.to_owned(), value),
    }
}
