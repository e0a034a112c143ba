//! Genetic operators on parameter chromosomes.
//!
//! # Crossover
//!
//! - [`one_point_crossover`]: cut both parents at one gene, swap tails
//!
//! # Mutation
//!
//! - [`mutate_one_gene`]: resample exactly one gene from its domain
//!
//! # Neighborhood
//!
//! - [`one_step_neighbors`]: every chromosome one step away in a single
//!   parameter, used by local search
//!
//! The runner only talks to operators through [`GeneticOperators`];
//! [`StandardOperators`] bundles the functions above with a
//! [`Selection`] strategy.
//!
//! # References
//!
//! - Holland (1975), *Adaptation in Natural and Artificial Systems*
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and Machine Learning*

use super::selection::Selection;
use super::types::{Chromosome, Objective};
use crate::param::ParameterSpec;
use rand::{Rng, RngExt};

/// The three operations the generational loop needs.
///
/// Implement this to plug in other crossover, mutation or survivor
/// selection schemes. Every method receives the run's single generator and
/// must draw from it deterministically.
pub trait GeneticOperators: Send + Sync {
    /// Recombines two parents into zero or more children.
    fn crossover<R: Rng>(
        &self,
        specs: &[ParameterSpec],
        parent1: &Chromosome,
        parent2: &Chromosome,
        rng: &mut R,
    ) -> Vec<Chromosome>;

    /// Returns a mutant of `chromosome`.
    fn mutate<R: Rng>(
        &self,
        specs: &[ParameterSpec],
        slices: usize,
        chromosome: &Chromosome,
        rng: &mut R,
    ) -> Chromosome;

    /// Cuts an evaluated population down to `n` survivors.
    fn select<R: Rng>(
        &self,
        population: Vec<Chromosome>,
        n: usize,
        objective: Objective,
        rng: &mut R,
    ) -> Vec<Chromosome>;
}

/// One-point crossover, one-gene mutation and the configured selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardOperators {
    pub selection: Selection,
}

impl StandardOperators {
    pub fn new(selection: Selection) -> Self {
        Self { selection }
    }
}

impl GeneticOperators for StandardOperators {
    fn crossover<R: Rng>(
        &self,
        specs: &[ParameterSpec],
        parent1: &Chromosome,
        parent2: &Chromosome,
        rng: &mut R,
    ) -> Vec<Chromosome> {
        one_point_crossover(specs, parent1, parent2, rng)
    }

    fn mutate<R: Rng>(
        &self,
        specs: &[ParameterSpec],
        slices: usize,
        chromosome: &Chromosome,
        rng: &mut R,
    ) -> Chromosome {
        mutate_one_gene(specs, slices, chromosome, rng)
    }

    fn select<R: Rng>(
        &self,
        population: Vec<Chromosome>,
        n: usize,
        objective: Objective,
        rng: &mut R,
    ) -> Vec<Chromosome> {
        self.selection.select(population, n, objective, rng)
    }
}

/// One-point crossover.
///
/// Draws a cut `c` in `1..k` and returns `p1[..c] ++ p2[c..]` and
/// `p2[..c] ++ p1[c..]`. With fewer than two genes there is nothing to cut
/// and no child is produced (no draw either).
///
/// # Complexity
/// O(k)
pub fn one_point_crossover<R: Rng>(
    specs: &[ParameterSpec],
    parent1: &Chromosome,
    parent2: &Chromosome,
    rng: &mut R,
) -> Vec<Chromosome> {
    let k = parent1.genes().len().min(parent2.genes().len());
    if k < 2 {
        return Vec::new();
    }
    let cut = rng.random_range(1..k);
    let (a, b) = (parent1.genes(), parent2.genes());
    let child1 = a[..cut].iter().chain(&b[cut..k]).cloned().collect();
    let child2 = b[..cut].iter().chain(&a[cut..k]).cloned().collect();
    vec![Chromosome::new(specs, child1), Chromosome::new(specs, child2)]
}

/// Resamples exactly one gene, chosen uniformly.
///
/// The new value is drawn with [`ParameterSpec::random_value`] and may
/// coincide with the old one.
pub fn mutate_one_gene<R: Rng>(
    specs: &[ParameterSpec],
    slices: usize,
    chromosome: &Chromosome,
    rng: &mut R,
) -> Chromosome {
    let k = chromosome.genes().len().min(specs.len());
    if k == 0 {
        return chromosome.clone();
    }
    let index = rng.random_range(0..k);
    match specs[index].random_value(rng, slices) {
        Some(value) => chromosome.with_gene(specs, index, value),
        None => chromosome.clone(),
    }
}

/// All chromosomes that differ from `chromosome` by one step in exactly
/// one parameter, parameter by parameter, lower neighbour first.
pub fn one_step_neighbors(specs: &[ParameterSpec], slices: usize, chromosome: &Chromosome) -> Vec<Chromosome> {
    specs
        .iter()
        .zip(chromosome.genes())
        .enumerate()
        .flat_map(|(i, (spec, gene))| {
            spec.neighbors(gene, slices)
                .into_iter()
                .map(move |v| (i, v))
        })
        .map(|(i, v)| chromosome.with_gene(specs, i, v))
        .collect()
}
