//! Genetic Algorithm over parameter spaces.
//!
//! Chromosomes carry one gene per active parameter; fitness is one output of
//! the model, read through a [`FitnessCache`](crate::cache::FitnessCache) so
//! that no assignment is evaluated twice in a run.
//!
//! # Key Types
//!
//! - [`GaConfig`]: Algorithm parameters (population, rates, objective)
//! - [`GaRunner`]: Executes the evolutionary loop
//! - [`GaResult`]: Best assignment with run statistics
//! - [`GeneticOperators`]: Crossover, mutation and survivor selection
//!
//! # Generation
//!
//! 1. Crossover: each chromosome, with probability `crossover_prob`, is
//!    crossed with a uniformly chosen mate
//! 2. Mutation: each chromosome (children included), with probability
//!    `mutation_prob`, yields a one-gene mutant
//! 3. New chromosomes are evaluated as one batch
//! 4. Duplicates are dropped and `population_dim` survivors selected
//! 5. Optionally every survivor is hill-climbed through one-step neighbours
//!
//! # References
//!
//! - Holland (1975), *Adaptation in Natural and Artificial Systems*
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and Machine Learning*
//! - De Jong (2006), *Evolutionary Computation: A Unified Approach*

mod config;
pub mod operators;
mod runner;
mod selection;
mod types;

pub use config::GaConfig;
pub use operators::{GeneticOperators, StandardOperators};
pub use runner::{GaResult, GaRunner};
pub use selection::Selection;
pub use types::{Chromosome, Objective};
