//! Survivor selection.
//!
//! After offspring are evaluated the enlarged population is cut back to
//! `population_dim` chromosomes. Two strategies are offered: deterministic
//! truncation and fitness-proportionate sampling without replacement.
//!
//! # References
//!
//! - Goldberg & Deb (1991), "A Comparative Analysis of Selection Schemes
//!   Used in Genetic Algorithms"

use super::types::{Chromosome, Objective};
use rand::{Rng, RngExt};

/// Survivor selection strategy.
///
/// # Examples
///
/// ```
/// use u_explore::ga::Selection;
///
/// // keep the best chromosomes
/// let sel = Selection::Best;
///
/// // roulette wheel, no chromosome drawn twice
/// let sel = Selection::Roulette;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Selection {
    /// Keep the `n` best chromosomes. Ties keep population order.
    ///
    /// # Complexity
    /// O(m log m) for a population of m
    #[default]
    Best,

    /// Draw `n` chromosomes with probability proportional to fitness
    /// quality, without replacement.
    ///
    /// Weights are shifted so the worst chromosome still gets a small
    /// positive weight; for minimization the scale is inverted.
    ///
    /// # Complexity
    /// O(n·m)
    Roulette,
}

impl Selection {
    /// Selects `n` survivors from `population`.
    ///
    /// Returns the whole population when it holds at most `n` chromosomes.
    /// Unevaluated chromosomes rank as the worst.
    pub fn select<R: Rng>(
        &self,
        population: Vec<Chromosome>,
        n: usize,
        objective: Objective,
        rng: &mut R,
    ) -> Vec<Chromosome> {
        if population.len() <= n {
            return population;
        }
        match self {
            Selection::Best => best(population, n, objective),
            Selection::Roulette => roulette(population, n, objective, rng),
        }
    }
}

fn fitness_or_nan(c: &Chromosome) -> f64 {
    c.fitness().unwrap_or(f64::NAN)
}

fn best(mut population: Vec<Chromosome>, n: usize, objective: Objective) -> Vec<Chromosome> {
    population.sort_by(|a, b| objective.compare(fitness_or_nan(a), fitness_or_nan(b)));
    population.truncate(n);
    population
}

/// Roulette wheel without replacement.
///
/// For maximization: `w_i = f_i - min + eps`; for minimization:
/// `w_i = max - f_i + eps`. Non-finite fitness gets `eps`.
fn roulette<R: Rng>(
    population: Vec<Chromosome>,
    n: usize,
    objective: Objective,
    rng: &mut R,
) -> Vec<Chromosome> {
    const EPSILON: f64 = 1e-10;

    let fitness: Vec<f64> = population.iter().map(fitness_or_nan).collect();
    let finite = fitness.iter().copied().filter(|f| f.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), f| {
        (lo.min(f), hi.max(f))
    });
    let mut weights: Vec<f64> = fitness
        .iter()
        .map(|&f| {
            if !f.is_finite() {
                return EPSILON;
            }
            let w = match objective {
                Objective::Maximize => f - lo,
                Objective::Minimize => hi - f,
            };
            w.max(0.0) + EPSILON
        })
        .collect();

    let mut slots: Vec<Option<Chromosome>> = population.into_iter().map(Some).collect();
    let mut chosen = Vec::with_capacity(n);
    for _ in 0..n {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            break;
        }
        let threshold = rng.random_range(0.0..total);
        let mut cumulative = 0.0;
        // floating-point fallback: last still-available slot
        let mut pick = weights.iter().rposition(|w| *w > 0.0).unwrap_or(0);
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            cumulative += w;
            if cumulative > threshold {
                pick = i;
                break;
            }
        }
        weights[pick] = 0.0;
        if let Some(c) = slots[pick].take() {
            chosen.push(c);
        }
    }
    chosen
}
