//! Saltelli cross-sampling for variance-based sensitivity.
//!
//! # References
//!
//! - Saltelli, A. (2002). "Making best use of model evaluations to compute
//!   sensitivity indices", *Computer Physics Communications* 145(2).

use super::{map_unit_design, UnitDesign};
use crate::param::{Batch, ParameterSpec};
use rand::{Rng, RngExt};

/// Points generated from `n` base rows, `2k + 2` per row.
///
/// Block `i` holds, in order: `A_i`, `AB_i^1 .. AB_i^k` (row `A_i` with
/// column `j` taken from `B_i`), `BA_i^1 .. BA_i^k` (row `B_i` with column
/// `j` taken from `A_i`), then `B_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct SaltelliSample {
    pub parameters: Vec<String>,
    pub base_rows: usize,
    pub points: UnitDesign,
    pub assignments: Batch,
}

impl SaltelliSample {
    /// Points per base row, `2k + 2`.
    pub fn block_len(&self) -> usize {
        2 * self.parameters.len() + 2
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Index of `A_i` in the flattened sample.
    pub fn index_a(&self, i: usize) -> usize {
        i * self.block_len()
    }

    /// Index of `AB_i^j`.
    pub fn index_ab(&self, i: usize, j: usize) -> usize {
        i * self.block_len() + 1 + j
    }

    /// Index of `BA_i^j`.
    pub fn index_ba(&self, i: usize, j: usize) -> usize {
        i * self.block_len() + 1 + self.parameters.len() + j
    }

    /// Index of `B_i`.
    pub fn index_b(&self, i: usize) -> usize {
        i * self.block_len() + self.block_len() - 1
    }
}

/// Builds a Saltelli sample from two pseudo-random base matrices.
///
/// Draw order: matrix `A` row by row, then matrix `B` row by row.
pub fn saltelli_sample<R: Rng>(specs: &[ParameterSpec], n: usize, rng: &mut R) -> SaltelliSample {
    let k = specs.len();
    let parameters = specs.iter().map(|s| s.name.clone()).collect();
    if k == 0 {
        return SaltelliSample {
            parameters,
            base_rows: 0,
            points: Vec::new(),
            assignments: Vec::new(),
        };
    }
    let draw = |rng: &mut R| -> UnitDesign {
        (0..n)
            .map(|_| (0..k).map(|_| rng.random::<f64>()).collect())
            .collect()
    };
    let a = draw(rng);
    let b = draw(rng);

    let mut points = Vec::with_capacity(n * (2 * k + 2));
    for (ra, rb) in a.iter().zip(&b) {
        points.push(ra.clone());
        for j in 0..k {
            let mut row = ra.clone();
            row[j] = rb[j];
            points.push(row);
        }
        for j in 0..k {
            let mut row = rb.clone();
            row[j] = ra[j];
            points.push(row);
        }
        points.push(rb.clone());
    }
    let assignments = map_unit_design(specs, &points);
    SaltelliSample {
        parameters,
        base_rows: n,
        points,
        assignments,
    }
}
