//! Exhaustive (cartesian) designs.

use crate::param::{Assignment, Batch, ParameterSpec, Value};

/// Cartesian product of per-parameter value lists.
///
/// `columns[j]` holds the candidate values of `specs[j]`. The first column
/// varies slowest. Any empty column makes the product empty.
pub fn cartesian(specs: &[ParameterSpec], columns: &[Vec<Value>]) -> Batch {
    if specs.is_empty() || columns.iter().any(Vec::is_empty) {
        return Vec::new();
    }
    let total: usize = columns.iter().map(Vec::len).product();
    let mut batch = Vec::with_capacity(total);
    let mut index = vec![0usize; columns.len()];
    loop {
        batch.push(
            specs
                .iter()
                .zip(&index)
                .zip(columns)
                .map(|((spec, &i), col)| (spec.name.clone(), col[i].clone()))
                .collect::<Assignment>(),
        );
        // odometer increment, last column fastest
        let mut j = columns.len();
        loop {
            if j == 0 {
                return batch;
            }
            j -= 1;
            index[j] += 1;
            if index[j] < columns[j].len() {
                break;
            }
            index[j] = 0;
        }
    }
}

/// Every combination of every parameter's value ladder.
pub fn exhaustive(specs: &[ParameterSpec], slices: usize) -> Batch {
    let columns: Vec<Vec<Value>> = specs.iter().map(|s| s.values(slices)).collect();
    cartesian(specs, &columns)
}
