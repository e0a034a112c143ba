//! Morris one-at-a-time trajectories.
//!
//! # References
//!
//! - Morris, M. D. (1991). "Factorial sampling plans for preliminary
//!   computational experiments", *Technometrics* 33(2).
//! - Campolongo, F., Cariboni, J. & Saltelli, A. (2007). "An effective
//!   screening design for sensitivity analysis of large models",
//!   *Environmental Modelling & Software* 22(10).

use super::map_unit_design;
use crate::error::{Error, Result};
use crate::param::{Assignment, Batch, ParameterSpec};
use u_numflow::random::shuffled_indices;
use rand::{Rng, RngExt};

/// Grid jump for `levels` levels: `p / (2 (p - 1))`.
pub fn morris_delta(levels: usize) -> f64 {
    levels as f64 / (2.0 * (levels as f64 - 1.0))
}

/// One trajectory: `k + 1` points, consecutive points differing in exactly
/// one unit coordinate by `±delta`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Unit-cube coordinates of each point.
    pub points: Vec<Vec<f64>>,
    /// Parameter index moved at each step (`k` entries, a permutation).
    pub changed: Vec<usize>,
    /// `+1.0` or `-1.0` for each step.
    pub directions: Vec<f64>,
    /// Points mapped into the parameter domains.
    pub assignments: Vec<Assignment>,
}

/// `r` trajectories over the same parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MorrisSample {
    pub parameters: Vec<String>,
    pub levels: usize,
    pub delta: f64,
    pub trajectories: Vec<Trajectory>,
}

impl MorrisSample {
    /// Every point of every trajectory, in trajectory order.
    pub fn batch(&self) -> Batch {
        self.trajectories
            .iter()
            .flat_map(|t| t.assignments.iter().cloned())
            .collect()
    }

    /// Number of points, `r (k + 1)`.
    pub fn len(&self) -> usize {
        self.trajectories.iter().map(|t| t.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Starting grid `{0, ..., 1 - delta}` with `levels / 2` values.
fn seed_grid(levels: usize, delta: f64) -> Vec<f64> {
    let n = levels / 2;
    if n <= 1 {
        return vec![0.0];
    }
    let bound = 1.0 - delta;
    (0..n).map(|i| i as f64 * bound / (n - 1) as f64).collect()
}

fn trajectory<R: Rng>(specs: &[ParameterSpec], grid: &[f64], delta: f64, rng: &mut R) -> Trajectory {
    let k = specs.len();
    let base: Vec<f64> = (0..k).map(|_| grid[rng.random_range(0..grid.len())]).collect();
    let directions: Vec<f64> = (0..k)
        .map(|_| if rng.random_bool(0.5) { 1.0 } else { -1.0 })
        .collect();
    let changed = shuffled_indices(k, rng);

    // A parameter that goes down starts one jump above its seed, so every
    // coordinate stays in [0, 1].
    let mut current: Vec<f64> = base
        .iter()
        .zip(&directions)
        .map(|(x, d)| if *d < 0.0 { x + delta } else { *x })
        .collect();
    let mut points = Vec::with_capacity(k + 1);
    points.push(current.clone());
    for &j in &changed {
        current[j] = (current[j] + directions[j] * delta).clamp(0.0, 1.0);
        points.push(current.clone());
    }
    let assignments = map_unit_design(specs, &points);
    let step_directions = changed.iter().map(|&j| directions[j]).collect();
    Trajectory {
        points,
        changed,
        directions: step_directions,
        assignments,
    }
}

/// Draws `r` Morris trajectories on a `levels`-level grid.
///
/// Each trajectory consumes, in order: `k` seed draws, `k` direction draws
/// and one shuffle of the parameter order.
///
/// # Errors
///
/// [`Error::Configuration`] when `levels` is odd or below 2.
pub fn morris_sample<R: Rng>(
    specs: &[ParameterSpec],
    levels: usize,
    r: usize,
    rng: &mut R,
) -> Result<MorrisSample> {
    if levels < 2 || levels % 2 != 0 {
        return Err(Error::config(format!(
            "morris levels must be even and at least 2, got {levels}"
        )));
    }
    let delta = morris_delta(levels);
    let grid = seed_grid(levels, delta);
    let trajectories = if specs.is_empty() {
        Vec::new()
    } else {
        (0..r).map(|_| trajectory(specs, &grid, delta, rng)).collect()
    };
    Ok(MorrisSample {
        parameters: specs.iter().map(|s| s.name.clone()).collect(),
        levels,
        delta,
        trajectories,
    })
}
