//! Coupling models - phase velocity laws integrated by the solver
//!
//! ```text
//! dθᵢ/dt = ωᵢ + (K / Nᵢ) Σⱼ wᵢⱼ sin(q (θⱼ - θᵢ))
//! ```
//!
//! Nᵢ is the oscillator degree, or the oscillator count for fully-connected
//! layouts.

use crate::topology::Connectivity;

/// Right-hand side of an ODE system dy/dt = f(t, y).
pub trait OdeSystem {
    /// Length of the state vector.
    fn dimension(&self) -> usize;

    /// Write f(t, state) into `out`. Both slices have length `dimension()`.
    fn derivative(&self, t: f64, state: &[f64], out: &mut [f64]);
}

/// Kuramoto coupling over a connectivity graph.
#[derive(Clone, Copy, Debug)]
pub struct KuramotoCoupling<'a> {
    connectivity: &'a Connectivity,
    frequencies: &'a [f64],
    weight: f64,
    qcluster: f64,
}

impl<'a> KuramotoCoupling<'a> {
    pub fn new(
        connectivity: &'a Connectivity,
        frequencies: &'a [f64],
        weight: f64,
        qcluster: u32,
    ) -> Self {
        debug_assert_eq!(connectivity.size(), frequencies.len());
        Self {
            connectivity,
            frequencies,
            weight,
            qcluster: f64::from(qcluster),
        }
    }

    /// Phase velocity of one oscillator.
    pub fn phase_velocity(&self, index: usize, phases: &[f64]) -> f64 {
        let theta = phases[index];
        let neighbors = self.connectivity.neighbors(index);

        let sum: f64 = match self.connectivity.weights(index) {
            Some(weights) => neighbors
                .iter()
                .zip(weights)
                .map(|(&j, &w)| w * (self.qcluster * (phases[j] - theta)).sin())
                .sum(),
            None => neighbors
                .iter()
                .map(|&j| (self.qcluster * (phases[j] - theta)).sin())
                .sum(),
        };

        let norm = self.connectivity.normalization(index);
        let coupling = if norm > 0.0 { self.weight * sum / norm } else { 0.0 };
        self.frequencies[index] + coupling
    }
}

impl OdeSystem for KuramotoCoupling<'_> {
    fn dimension(&self) -> usize {
        self.frequencies.len()
    }

    fn derivative(&self, _t: f64, state: &[f64], out: &mut [f64]) {
        for (i, velocity) in out.iter_mut().enumerate() {
            *velocity = self.phase_velocity(i, state);
        }
    }
}

/// Coupling through a trained pattern matrix with harmonic sharpening.
///
/// ```text
/// dθᵢ/dt = (1/N) Σ_{k≠i} [ Cᵢₖ sin(Δ) + a₁ sin(2Δ) - a₂ sin(3Δ) ],  Δ = θₖ - θᵢ
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PatternCoupling<'a> {
    /// Row-major N x N matrix.
    matrix: &'a [f64],
    size: usize,
    increase_strength1: f64,
    increase_strength2: f64,
}

impl<'a> PatternCoupling<'a> {
    pub fn new(matrix: &'a [f64], size: usize, increase_strength1: f64, increase_strength2: f64) -> Self {
        debug_assert_eq!(matrix.len(), size * size);
        Self {
            matrix,
            size,
            increase_strength1,
            increase_strength2,
        }
    }
}

impl OdeSystem for PatternCoupling<'_> {
    fn dimension(&self) -> usize {
        self.size
    }

    fn derivative(&self, _t: f64, state: &[f64], out: &mut [f64]) {
        let n = self.size as f64;
        for (i, velocity) in out.iter_mut().enumerate() {
            let row = &self.matrix[i * self.size..(i + 1) * self.size];
            let theta = state[i];
            let mut sum = 0.0;
            for (k, &coupling) in row.iter().enumerate() {
                if k == i {
                    continue;
                }
                let delta = state[k] - theta;
                sum += coupling * delta.sin();
                sum += self.increase_strength1 * (2.0 * delta).sin();
                sum -= self.increase_strength2 * (3.0 * delta).sin();
            }
            *velocity = sum / n;
        }
    }
}
