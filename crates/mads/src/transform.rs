//! Affine map between the user's bounded box and the canonical domain
//! `[-1, 1]^N` in which all mesh and direction arithmetic happens.
use crate::errors::{MadsError, Result};

use ndarray::{Array1, ArrayBase, Data, Ix1, Zip};
use serde::{Deserialize, Serialize};

/// Finite box bounds of the design space
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl Bounds {
    /// Bounds given per dimension
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
        let bounds = Bounds { lower, upper };
        bounds.check()?;
        Ok(bounds)
    }

    /// Scalar bounds broadcast to `dim` dimensions
    pub fn broadcast(lower: f64, upper: f64, dim: usize) -> Result<Self> {
        Bounds::new(Array1::from_elem(dim, lower), Array1::from_elem(dim, upper))
    }

    /// Update the bounds of the `dim`-th component
    pub fn set(&mut self, dim: usize, lower: f64, upper: f64) -> Result<()> {
        if dim >= self.dim() {
            return Err(MadsError::InvalidConfigError(format!(
                "Bound index {dim} out of range (dimension is {})",
                self.dim()
            )));
        }
        Self::check_component(dim, lower, upper)?;
        self.lower[dim] = lower;
        self.upper[dim] = upper;
        Ok(())
    }

    /// Number of components
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Lower bounds
    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    /// Upper bounds
    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Project `x` into the box
    pub fn clamp(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Array1<f64> {
        Zip::from(x)
            .and(&self.lower)
            .and(&self.upper)
            .map_collect(|&v, &lo, &up| v.clamp(lo, up))
    }

    fn check(&self) -> Result<()> {
        if self.lower.len() != self.upper.len() {
            return Err(MadsError::InvalidConfigError(format!(
                "Lower and upper bounds dimension mismatch ({} != {})",
                self.lower.len(),
                self.upper.len()
            )));
        }
        if self.lower.is_empty() {
            return Err(MadsError::InvalidConfigError(
                "Bounds should have at least one component".to_string(),
            ));
        }
        self.lower
            .iter()
            .zip(self.upper.iter())
            .enumerate()
            .try_for_each(|(i, (&lo, &up))| Self::check_component(i, lo, up))
    }

    fn check_component(dim: usize, lower: f64, upper: f64) -> Result<()> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(MadsError::InvalidConfigError(format!(
                "Bounds of component {dim} should be finite, got [{lower}, {upper}]"
            )));
        }
        if lower > upper {
            return Err(MadsError::InvalidConfigError(format!(
                "Lower bound greater than upper bound for component {dim}: [{lower}, {upper}]"
            )));
        }
        Ok(())
    }
}

/// Affine map between user bounds and the canonical domain.
///
/// A component with `lower == upper` is mapped to the degenerate canonical
/// interval `[0, 0]`, hence any direction contribution along it vanishes
/// once candidates are clamped.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinateTransform {
    bounds: Bounds,
    canonical: Bounds,
}

impl CoordinateTransform {
    /// Transform attached to the given user bounds
    pub fn new(bounds: Bounds) -> Self {
        let canonical_lower = Self::widths(&bounds).mapv(|w| if w > 0. { -1. } else { 0. });
        let canonical = Bounds {
            upper: canonical_lower.mapv(|v| -v),
            lower: canonical_lower,
        };
        CoordinateTransform { bounds, canonical }
    }

    fn widths(bounds: &Bounds) -> Array1<f64> {
        bounds.upper() - bounds.lower()
    }

    /// User bounds
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Canonical domain bounds
    pub fn canonical_bounds(&self) -> &Bounds {
        &self.canonical
    }

    /// Map a user point to the canonical domain
    pub fn to_canonical(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Array1<f64> {
        Zip::from(x)
            .and(self.bounds.lower())
            .and(self.bounds.upper())
            .map_collect(|&v, &lo, &up| {
                let width = up - lo;
                if width > 0. {
                    2. * (v - lo) / width - 1.
                } else {
                    0.
                }
            })
    }

    /// Map a canonical point back to the user bounds
    pub fn from_canonical(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Array1<f64> {
        Zip::from(x)
            .and(self.bounds.lower())
            .and(self.bounds.upper())
            .map_collect(|&v, &lo, &up| lo + 0.5 * (v + 1.) * (up - lo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_bounds_validation() {
        assert!(Bounds::new(array![0., 0.], array![1.]).is_err());
        assert!(Bounds::new(array![2.], array![1.]).is_err());
        assert!(Bounds::new(array![f64::NEG_INFINITY], array![1.]).is_err());
        assert!(Bounds::new(Array1::zeros(0), Array1::zeros(0)).is_err());
        let bounds = Bounds::broadcast(-10., 10., 3).unwrap();
        assert_eq!(bounds.dim(), 3);
        assert_eq!(bounds.upper(), &array![10., 10., 10.]);
    }

    #[test]
    fn test_bounds_set() {
        let mut bounds = Bounds::broadcast(-1., 1., 2).unwrap();
        bounds.set(1, 0., 5.).unwrap();
        assert_eq!(bounds.lower(), &array![-1., 0.]);
        assert_eq!(bounds.upper(), &array![1., 5.]);
        assert!(matches!(
            bounds.set(2, 0., 1.),
            Err(MadsError::InvalidConfigError(_))
        ));
        assert!(bounds.set(0, 2., 1.).is_err());
    }

    #[test]
    fn test_clamp() {
        let bounds = Bounds::new(array![0., -1.], array![1., 1.]).unwrap();
        assert_eq!(bounds.clamp(&array![2., -3.]), array![1., -1.]);
    }

    #[test]
    fn test_transform_round_trip() {
        let bounds = Bounds::new(array![-10., 0., 3.], array![10., 5., 7.]).unwrap();
        let transform = CoordinateTransform::new(bounds);
        for p in [array![0.3, -0.7, 1.], array![-1., 1., 0.], array![0.999, 0.001, -0.5]] {
            let back = transform.to_canonical(&transform.from_canonical(&p));
            assert_abs_diff_eq!(back, p, epsilon = 1e-12);
        }
        let x = array![5., -3.];
        let bounds = Bounds::broadcast(-10., 10., 2).unwrap();
        let transform = CoordinateTransform::new(bounds);
        assert_abs_diff_eq!(transform.to_canonical(&x), array![0.5, -0.3], epsilon = 1e-12);
        assert_abs_diff_eq!(
            transform.from_canonical(&transform.to_canonical(&x)),
            x,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_transform_degenerate_component() {
        let bounds = Bounds::new(array![-10., 2.], array![10., 2.]).unwrap();
        let transform = CoordinateTransform::new(bounds);
        assert_eq!(transform.canonical_bounds().lower(), &array![-1., 0.]);
        assert_eq!(transform.canonical_bounds().upper(), &array![1., 0.]);
        let xc = transform.to_canonical(&array![5., 2.]);
        assert!(xc.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(xc, array![0.5, 0.], epsilon = 1e-12);
        let x = transform.from_canonical(&array![0.5, 0.7]);
        assert_abs_diff_eq!(x, array![5., 2.], epsilon = 1e-12);
    }
}
