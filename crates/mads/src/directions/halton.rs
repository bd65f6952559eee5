//! Halton low-discrepancy sequence used to seed Ortho directions.
use ndarray::Array1;

/// Returns the first `n` prime numbers
pub fn first_primes(n: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(n);
    let mut candidate = 2u64;
    while primes.len() < n {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Van der Corput radical inverse of `index` in the given `base`
pub fn radical_inverse(index: u64, base: u64) -> f64 {
    let mut result = 0.0;
    let mut digit = 1.0 / base as f64;
    let mut n = index;
    while n > 0 {
        result += (n % base) as f64 * digit;
        digit /= base as f64;
        n /= base;
    }
    result
}

/// Halton point in `[0, 1)^dim` of index `index`, one prime base per dimension
pub fn halton(index: u64, bases: &[u64]) -> Array1<f64> {
    bases.iter().map(|&b| radical_inverse(index, b)).collect()
}
