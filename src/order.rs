//! Order parameters - synchronization metrics over phase vectors
//!
//! ```text
//! r · e^(iψ) = (1/N) Σⱼ e^(iθⱼ)
//! ```
//!
//! r ≈ 0 means incoherent phases, r = 1 perfect synchrony. Phases may be
//! stored unwrapped; every comparison here reduces modulo 2π.

use std::f64::consts::{PI, TAU};

use crate::topology::Connectivity;

/// Kuramoto order parameter (r, ψ) of a phase vector.
///
/// Returns (0, 0) for an empty vector.
pub fn order_parameter(phases: &[f64]) -> (f64, f64) {
    if phases.is_empty() {
        return (0.0, 0.0);
    }
    let n = phases.len() as f64;
    let (sum_cos, sum_sin) = phases
        .iter()
        .fold((0.0, 0.0), |(c, s), &theta| (c + theta.cos(), s + theta.sin()));

    let avg_cos = sum_cos / n;
    let avg_sin = sum_sin / n;
    let r = (avg_cos * avg_cos + avg_sin * avg_sin).sqrt().clamp(0.0, 1.0);
    let psi = avg_sin.atan2(avg_cos).rem_euclid(TAU);

    (r, psi)
}

/// Global synchronization level r ∈ [0, 1].
#[inline]
pub fn global_order(phases: &[f64]) -> f64 {
    order_parameter(phases).0
}

/// Local synchronization level.
///
/// For every oscillator the order parameter of its closed neighbourhood
/// (itself plus direct neighbours), averaged over all oscillators. An
/// isolated oscillator counts as synchronized with itself.
pub fn local_order(phases: &[f64], connectivity: &Connectivity) -> f64 {
    if phases.is_empty() {
        return 0.0;
    }

    let total: f64 = (0..phases.len())
        .map(|i| {
            let neighbors = connectivity.neighbors(i);
            let (mut sum_cos, mut sum_sin) = (phases[i].cos(), phases[i].sin());
            for &j in neighbors {
                sum_cos += phases[j].cos();
                sum_sin += phases[j].sin();
            }
            let n = (neighbors.len() + 1) as f64;
            ((sum_cos / n).powi(2) + (sum_sin / n).powi(2)).sqrt()
        })
        .sum();

    (total / phases.len() as f64).clamp(0.0, 1.0)
}

/// Overlap between a phase vector and a bipolar pattern.
///
/// |(1/N) Σⱼ pⱼ e^(iθⱼ)|. Equals 1 when every +1 oscillator sits at one phase
/// and every -1 oscillator at the antiphase.
pub fn memory_order(phases: &[f64], pattern: &[f64]) -> f64 {
    if phases.is_empty() {
        return 0.0;
    }
    let n = phases.len() as f64;
    let (sum_cos, sum_sin) = phases
        .iter()
        .zip(pattern)
        .fold((0.0, 0.0), |(c, s), (&theta, &p)| {
            (c + p * theta.cos(), s + p * theta.sin())
        });

    (((sum_cos / n).powi(2) + (sum_sin / n).powi(2)).sqrt()).clamp(0.0, 1.0)
}

/// Shortest angular distance between two phases, in [0, π].
#[inline]
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(TAU);
    if diff > PI {
        TAU - diff
    } else {
        diff
    }
}

/// Largest circular change of any oscillator between two snapshots.
pub fn max_phase_change(previous: &[f64], current: &[f64]) -> f64 {
    previous
        .iter()
        .zip(current)
        .map(|(&a, &b)| circular_distance(a, b))
        .fold(0.0, f64::max)
}

/// Largest phase change of any oscillator in the frame co-rotating with
/// the network.
///
/// Each oscillator's advance is measured against the mean advance, so a
/// phase-locked group drifting at a common frequency reads as zero change.
pub fn max_relative_phase_change(previous: &[f64], current: &[f64]) -> f64 {
    if previous.is_empty() {
        return 0.0;
    }

    let advances: Vec<f64> = previous
        .iter()
        .zip(current)
        .map(|(&a, &b)| signed_difference(b, a))
        .collect();
    let drift = advances.iter().sum::<f64>() / advances.len() as f64;

    advances
        .iter()
        .map(|advance| (advance - drift).abs())
        .fold(0.0, f64::max)
}

/// a - b reduced to (-π, π].
#[inline]
fn signed_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(TAU);
    if diff > PI {
        diff - TAU
    } else {
        diff
    }
}
