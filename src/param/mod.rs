//! Parameter domains and assignments.
//!
//! - [`ParameterSpec`]: declaration of one tunable parameter (kind, range,
//!   step, optional explicit value list)
//! - [`Value`]: a concrete typed value
//! - [`Assignment`]: one value per parameter, usable as a hash key
//! - [`Batch`]: assignments submitted to the evaluator together

mod assignment;
mod spec;
mod value;

pub use assignment::{Assignment, Batch};
pub use spec::{ParamKind, ParameterSpec, DEFAULT_SLICES};
pub use value::{Point, Value};

use crate::error::{Error, Result};
use std::collections::HashSet;

/// Validates a declaration list and drops degenerate parameters.
///
/// Duplicate names and unusable declarations are configuration errors.
/// Parameters with an empty `among` list are skipped (with a warning) and
/// the run proceeds with the rest.
pub fn active_specs(specs: &[ParameterSpec]) -> Result<Vec<ParameterSpec>> {
    let mut seen = HashSet::new();
    let mut active = Vec::with_capacity(specs.len());
    for spec in specs {
        spec.validate()?;
        if !seen.insert(spec.name.as_str()) {
            return Err(Error::config(format!(
                "parameter '{}' is declared twice",
                spec.name
            )));
        }
        if !spec.is_degenerate() {
            active.push(spec.clone());
        }
    }
    Ok(active)
}

/// Number of assignments an exhaustive exploration produces.
///
/// Degenerate parameters are skipped, so they do not zero the product.
pub fn exploration_dimension(specs: &[ParameterSpec], slices: usize) -> usize {
    let dims: Vec<usize> = specs
        .iter()
        .filter(|s| !s.is_degenerate())
        .map(|s| s.dimension(slices))
        .collect();
    if dims.is_empty() {
        0
    } else {
        dims.into_iter().product()
    }
}
