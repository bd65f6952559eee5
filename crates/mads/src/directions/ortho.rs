use super::{DirectionGenerator, DirectionSet, first_primes, halton};

use log::warn;
use ndarray::{Array1, Array2, Axis};
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};

/// Grid increment of the direction scaling search
const ALPHA_STEP: f64 = 0.1;

/// Deterministic orthogonal direction generator (OrthoMADS).
///
/// Each call draws a Halton point of strictly increasing index, turns it
/// into an integer vector whose norm is tied to the mesh level and builds
/// the scaled Householder basis `H = |q|^2 I - 2 q q^T` from it.
///
/// Without reduction the `N` columns of `H` and their negatives are polled.
/// With the negative reduction, once a successful displacement is known,
/// the columns are oriented along it and completed by their negated sum.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrthoGenerator {
    bases: Vec<u64>,
    t0: u64,
    level_max: i32,
    t_max: u64,
    reduction: bool,
    previous: Option<Array1<f64>>,
    displacement: Option<Array1<f64>>,
}

impl OrthoGenerator {
    /// Generator for `dim`-dimensional directions, without reduction
    pub fn new(dim: usize) -> Self {
        let bases = first_primes(dim);
        let t0 = bases.last().copied().unwrap_or(2);
        OrthoGenerator {
            bases,
            t0,
            level_max: -1,
            t_max: 0,
            reduction: false,
            previous: None,
            displacement: None,
        }
    }

    /// Enable or disable the negative reduction
    pub fn with_reduction(mut self, reduction: bool) -> Self {
        self.reduction = reduction;
        self
    }

    /// Set the Halton index offset (defaults to the `N`-th prime)
    pub fn with_t0(mut self, t0: u64) -> Self {
        self.t0 = t0;
        self
    }

    /// Displacement of the last accepted poll step if any
    pub fn displacement(&self) -> Option<&Array1<f64>> {
        self.displacement.as_ref()
    }

    /// Incumbent preceding the last accepted poll step if any
    pub fn previous_incumbent(&self) -> Option<&Array1<f64>> {
        self.previous.as_ref()
    }

    /// Next Halton index for the given mesh level, strictly increasing over calls
    pub fn next_index(&mut self, level: i32) -> u64 {
        if level > self.level_max {
            let t = (self.t0 + level.max(0) as u64).max(self.t_max + 1);
            self.level_max = level;
            self.t_max = t;
        } else {
            self.t_max += 1;
        }
        self.t_max
    }

    /// Scaled Householder basis for Halton index `t` at mesh level `level`
    pub fn householder(&self, t: u64, level: i32) -> Array2<i64> {
        let u = halton(t, &self.bases);
        let q = u.mapv(|v| 2. * v - 1.);
        let norm = q.dot(&q).sqrt();
        let q = if norm > 0. {
            q / norm
        } else {
            let mut e1 = Array1::zeros(q.len());
            e1[0] = 1.;
            e1
        };
        let q_hat = scale_direction(&q, level);
        let dim = q_hat.len();
        let squared_norm: i64 = q_hat.iter().map(|v| v * v).sum();
        Array2::from_shape_fn((dim, dim), |(i, j)| {
            let diag = if i == j { squared_norm } else { 0 };
            diag - 2 * q_hat[i] * q_hat[j]
        })
    }
}

fn rounded(alpha: f64, q: &Array1<f64>) -> Array1<i64> {
    q.mapv(|v| (alpha * v).round() as i64)
}

fn norm(v: &Array1<i64>) -> f64 {
    (v.iter().map(|&x| (x * x) as f64).sum::<f64>()).sqrt()
}

/// Integer direction `round(alpha q)` for the largest `alpha` on the 0.1 grid
/// whose successor first reaches the norm `2^(l/2)`.
///
/// Every `alpha < 2^(l/2) - sqrt(N)/2` fails the norm test since rounding moves
/// a vector by at most `sqrt(N)/2`, so the search starts from there.
fn scale_direction(q: &Array1<f64>, level: i32) -> Array1<i64> {
    let target = 2f64.powf(level as f64 / 2.);
    let half_diag = (q.len() as f64).sqrt() / 2.;
    let start = ((target - half_diag) / ALPHA_STEP).floor().max(0.) as u64;
    let max_steps = (10. * (2. * half_diag + 2.)).ceil() as u64;

    let found = (start..start + max_steps)
        .find(|&k| norm(&rounded(k as f64 * ALPHA_STEP, q)) >= target);
    match found {
        Some(k) => {
            let reached = rounded(k as f64 * ALPHA_STEP, q);
            if k == 0 {
                return reached;
            }
            let backed = rounded((k - 1) as f64 * ALPHA_STEP, q);
            if backed.iter().all(|&v| v == 0) {
                reached
            } else {
                backed
            }
        }
        None => {
            warn!("Ortho direction scaling did not converge at level {level}, using axis direction");
            let axis = q.mapv(f64::abs).argmax().unwrap_or(0);
            let mut dir = Array1::zeros(q.len());
            let sign = if q[axis] < 0. { -1 } else { 1 };
            dir[axis] = sign * target.ceil() as i64;
            dir
        }
    }
}

impl DirectionGenerator for OrthoGenerator {
    fn name(&self) -> &str {
        "Ortho"
    }

    fn generate(&mut self, level: i32, _rng: &mut Xoshiro256Plus) -> DirectionSet {
        let t = self.next_index(level);
        let mut basis = self.householder(t, level);
        match (self.reduction, &self.displacement) {
            (true, Some(displacement)) => {
                for mut column in basis.axis_iter_mut(Axis(1)) {
                    let dot: f64 = column
                        .iter()
                        .zip(displacement.iter())
                        .map(|(&h, &d)| h as f64 * d)
                        .sum();
                    if dot < 0. {
                        column.mapv_inplace(|v| -v);
                    }
                }
                DirectionSet::with_negated_sum(basis.reversed_axes())
            }
            _ => DirectionSet::with_negations(basis.reversed_axes()),
        }
    }

    fn record_success(&mut self, previous: &Array1<f64>, accepted: &Array1<f64>) {
        self.displacement = Some(accepted - previous);
        self.previous = Some(previous.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;

    fn sum(dirs: &[Array1<i64>], dim: usize) -> Array1<i64> {
        dirs.iter().fold(Array1::zeros(dim), |acc, d| acc + d)
    }

    #[test]
    fn test_ortho_no_reduction() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let mut generator = OrthoGenerator::new(3);
        for level in [0, 1, 4, 2] {
            let dirs: Vec<_> = generator.generate(level, &mut rng).collect();
            assert_eq!(dirs.len(), 6);
            for k in 0..3 {
                assert_eq!(dirs[k], -&dirs[k + 3]);
            }
        }
    }

    #[test]
    fn test_ortho_basis_is_orthogonal() {
        let generator = OrthoGenerator::new(4);
        let h = generator.householder(11, 6);
        let hth = h.t().dot(&h);
        let d = hth[[0, 0]];
        assert!(d > 0);
        assert_eq!(hth, Array2::from_diag_elem(4, d));
    }

    #[test]
    fn test_ortho_neg_reduction() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let mut generator = OrthoGenerator::new(3).with_reduction(true);
        assert_eq!(generator.generate(2, &mut rng).count(), 6);

        let displacement = array![0.25, -0.5, 0.125];
        generator.record_success(&array![0., 0., 0.], &displacement);
        assert_eq!(generator.previous_incumbent(), Some(&array![0., 0., 0.]));
        let dirs: Vec<_> = generator.generate(2, &mut rng).collect();
        assert_eq!(dirs.len(), 4);
        assert_eq!(sum(&dirs, 3), Array1::<i64>::zeros(3));
        for d in &dirs[..3] {
            let dot: f64 = d.mapv(|v| v as f64).dot(&displacement);
            assert!(dot >= 0.);
        }
    }

    #[test]
    fn test_ortho_index_strictly_increasing() {
        let mut generator = OrthoGenerator::new(2);
        let mut last = 0;
        for level in [0, 1, 2, 1, 0, 3, 5, 4, 6, 2, 7] {
            let t = generator.next_index(level);
            assert!(t > last);
            last = t;
        }
        let mut generator = OrthoGenerator::new(2);
        assert_eq!(generator.next_index(0), 3);
        assert_eq!(generator.next_index(0), 4);
        assert_eq!(generator.next_index(4), 7);
        assert_eq!(generator.next_index(5), 8);
        assert_eq!(generator.next_index(6), 9);

        let mut generator = OrthoGenerator::new(2).with_t0(10);
        assert_eq!(generator.next_index(1), 11);
        assert_eq!(generator.next_index(1), 12);
    }

    #[test]
    fn test_scale_direction_norm() {
        let q = array![0.6, 0.8];
        for level in 0..20 {
            let dir = scale_direction(&q, level);
            let target = 2f64.powf(level as f64 / 2.);
            assert!(dir.iter().any(|&v| v != 0));
            assert!(norm(&rounded(0., &q)) < target);
            assert!(norm(&dir) <= target + 1.5);
        }
        // alpha = 3.5 first reaches the norm, backed off to 3.4
        assert_eq!(scale_direction(&array![0., -1.], 4), array![0, -3]);
    }
}
