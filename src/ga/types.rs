//! Chromosomes and the optimization direction.

use crate::param::{Assignment, ParameterSpec, Value};
use rand::Rng;
use std::cmp::Ordering;

/// Direction of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Objective {
    #[default]
    Maximize,
    Minimize,
}

impl Objective {
    /// Whether `a` is strictly better than `b`. `NaN` is never better.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Objective::Maximize => a > b,
            Objective::Minimize => a < b,
        }
    }

    /// Orders fitness values best first; `NaN` sorts last.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self {
                Objective::Maximize => b.total_cmp(&a),
                Objective::Minimize => a.total_cmp(&b),
            },
        }
    }

    /// The fitness every real value beats.
    pub fn worst(self) -> f64 {
        match self {
            Objective::Maximize => f64::NEG_INFINITY,
            Objective::Minimize => f64::INFINITY,
        }
    }
}

/// A candidate solution: one gene per active parameter, in declaration
/// order, plus the decoded assignment and the fitness once evaluated.
///
/// Chromosomes are values: operators and local search build new ones
/// instead of editing genes in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    genes: Vec<Value>,
    assignment: Assignment,
    fitness: Option<f64>,
}

impl Chromosome {
    /// Builds an unevaluated chromosome. `genes[i]` belongs to `specs[i]`.
    pub fn new(specs: &[ParameterSpec], genes: Vec<Value>) -> Self {
        let assignment = specs
            .iter()
            .zip(&genes)
            .map(|(s, g)| (s.name.clone(), g.clone()))
            .collect();
        Self {
            genes,
            assignment,
            fitness: None,
        }
    }

    /// Draws every gene with [`ParameterSpec::random_value`].
    ///
    /// Returns `None` if a parameter has no value to offer.
    pub fn random<R: Rng>(specs: &[ParameterSpec], slices: usize, rng: &mut R) -> Option<Self> {
        let genes = specs
            .iter()
            .map(|s| s.random_value(rng, slices))
            .collect::<Option<Vec<_>>>()?;
        Some(Self::new(specs, genes))
    }

    pub fn genes(&self) -> &[Value] {
        &self.genes
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// Copy of this chromosome carrying `fitness`.
    pub fn with_fitness(mut self, fitness: f64) -> Self {
        self.fitness = Some(fitness);
        self
    }

    /// Copy with gene `index` replaced; the fitness is cleared.
    pub fn with_gene(&self, specs: &[ParameterSpec], index: usize, value: Value) -> Self {
        let mut genes = self.genes.clone();
        if let Some(g) = genes.get_mut(index) {
            *g = value;
        }
        Self::new(specs, genes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_objective_ordering() {
        let mut v = vec![1.0, f64::NAN, 3.0, 2.0];
        v.sort_by(|a, b| Objective::Maximize.compare(*a, *b));
        assert_eq!(&v[..3], &[3.0, 2.0, 1.0]);
        assert!(v[3].is_nan());
        v.sort_by(|a, b| Objective::Minimize.compare(*a, *b));
        assert_eq!(&v[..3], &[1.0, 2.0, 3.0]);
        assert!(Objective::Minimize.is_better(1.0, 2.0));
        assert!(!Objective::Maximize.is_better(f64::NAN, 2.0));
    }

    #[test]
    fn test_chromosome_decodes_assignment() {
        let specs = vec![ParameterSpec::int("a", 0, 9), ParameterSpec::boolean("b")];
        let c = Chromosome::new(&specs, vec![Value::Int(4), Value::Bool(true)]);
        assert_eq!(
            c.assignment(),
            &Assignment::from_pairs([("a", Value::Int(4)), ("b", Value::Bool(true))])
        );
        let d = c.with_gene(&specs, 0, Value::Int(5)).with_fitness(1.0);
        assert_eq!(c.genes()[0], Value::Int(4));
        assert_eq!(d.assignment().get("a"), Some(&Value::Int(5)));
        assert_eq!(d.fitness(), Some(1.0));
    }

    #[test]
    fn test_random_chromosome() {
        let specs = vec![ParameterSpec::int("a", 0, 9)];
        let c = Chromosome::random(&specs, 9, &mut create_rng(3));
        assert!(c.is_some_and(|c| c.genes().len() == 1 && c.fitness().is_none()));
        let empty = vec![ParameterSpec::enumerated::<Value>("e", vec![])];
        assert!(Chromosome::random(&empty, 9, &mut create_rng(3)).is_none());
    }
}
