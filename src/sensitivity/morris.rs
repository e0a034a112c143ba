//! Morris elementary effects screening.
//!
//! Each step of a trajectory moves one parameter by `±Δ` on the unit grid;
//! the elementary effect of that parameter is
//! `(y_after - y_before) / (±Δ)`. Over `r` trajectories:
//!
//! - `mu`: mean effect (signed, cancellations possible)
//! - `mu_star`: mean absolute effect (overall influence)
//! - `sigma`: sample standard deviation (non-linearity or interactions)
//!
//! # References
//!
//! - Morris, M. D. (1991). "Factorial sampling plans for preliminary
//!   computational experiments", *Technometrics* 33(2).
//! - Campolongo, F., Cariboni, J. & Saltelli, A. (2007). "An effective
//!   screening design for sensitivity analysis of large models".

use super::{distinct, output_value};
use crate::error::{Error, Result};
use crate::evaluator::{evaluate_all, Combination, EvaluationResult, Evaluator};
use crate::param::{active_specs, Assignment, ParameterSpec};
use crate::random::rng_from_seed;
use crate::sampling::{morris_delta, morris_sample, MorrisSample, DEFAULT_LEVELS};
use crate::table::{write_text, Table};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};
use u_numflow::stats::{mean, std_dev};

/// Default number of trajectories.
pub const DEFAULT_TRAJECTORIES: usize = 10;

/// Options for a complete Morris run.
///
/// ```
/// use u_explore::sensitivity::MorrisConfig;
///
/// let config = MorrisConfig::new(["infected"]).with_trajectories(20).with_seed(1);
/// assert_eq!(config.levels, 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MorrisConfig {
    /// Grid levels, even and at least 2.
    pub levels: usize,
    pub trajectories: usize,
    /// Outputs to analyse.
    pub outputs: Vec<String>,
    /// How replicates collapse into one value per point.
    pub combination: Combination,
    pub seed: Option<u64>,
}

impl MorrisConfig {
    pub fn new<S: Into<String>>(outputs: impl IntoIterator<Item = S>) -> Self {
        Self {
            levels: DEFAULT_LEVELS,
            trajectories: DEFAULT_TRAJECTORIES,
            outputs: outputs.into_iter().map(Into::into).collect(),
            combination: Combination::Mean,
            seed: None,
        }
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_trajectories(mut self, r: usize) -> Self {
        self.trajectories = r;
        self
    }

    pub fn with_combination(mut self, combination: Combination) -> Self {
        self.combination = combination;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels < 2 || self.levels % 2 != 0 {
            return Err(Error::config(format!(
                "morris levels must be even and at least 2, got {}",
                self.levels
            )));
        }
        if self.trajectories == 0 {
            return Err(Error::config("morris needs at least one trajectory"));
        }
        if self.outputs.is_empty() {
            return Err(Error::config("morris needs at least one output"));
        }
        Ok(())
    }
}

/// Screening measures of one parameter for one output.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MorrisIndices {
    pub mu: f64,
    pub mu_star: f64,
    /// `NaN` with fewer than two effects.
    pub sigma: f64,
}

impl MorrisIndices {
    fn of(effects: &[f64]) -> Self {
        if effects.is_empty() {
            return Self {
                mu: f64::NAN,
                mu_star: f64::NAN,
                sigma: f64::NAN,
            };
        }
        let abs: Vec<f64> = effects.iter().map(|e| e.abs()).collect();
        Self {
            mu: mean(effects).unwrap_or(f64::NAN),
            mu_star: mean(&abs).unwrap_or(f64::NAN),
            sigma: std_dev(effects).unwrap_or(f64::NAN),
        }
    }
}

/// Steps of one trajectory: which parameter moved and in which direction.
#[derive(Debug, Clone)]
struct Steps {
    changed: Vec<usize>,
    directions: Vec<f64>,
}

/// Per-output, per-parameter Morris measures.
#[derive(Debug, Clone, PartialEq)]
pub struct MorrisAnalysis {
    pub parameters: Vec<String>,
    /// Outputs in analysis order, each with one entry per parameter.
    pub outputs: Vec<(String, Vec<MorrisIndices>)>,
}

impl MorrisAnalysis {
    /// Samples, evaluates and analyses in one go.
    ///
    /// Duplicate points are evaluated once, in a single batch.
    ///
    /// # Errors
    ///
    /// Configuration errors before any evaluation; evaluator failures and
    /// missing outputs are propagated.
    pub fn run<E: Evaluator + ?Sized>(specs: &[ParameterSpec], evaluator: &E, config: &MorrisConfig) -> Result<Self> {
        config.validate()?;
        let specs = active_specs(specs)?;
        let mut rng = rng_from_seed(config.seed);
        let sample = morris_sample(&specs, config.levels, config.trajectories, &mut rng)?;
        let batch = distinct(&sample.batch());
        info!(
            parameters = specs.len(),
            trajectories = config.trajectories,
            points = batch.len(),
            "starting morris analysis"
        );
        let results = evaluate_all(evaluator, &batch)?;
        Self::analyze(&sample, &results, &config.outputs, config.combination)
    }

    /// Computes the measures from an evaluated sample.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use u_explore::evaluator::{Combination, EvaluationResult};
    /// use u_explore::param::ParameterSpec;
    /// use u_explore::random::create_rng;
    /// use u_explore::sampling::morris_sample;
    /// use u_explore::sensitivity::MorrisAnalysis;
    ///
    /// let specs = vec![ParameterSpec::float("a", 0.0, 1.0), ParameterSpec::float("b", 0.0, 1.0)];
    /// let sample = morris_sample(&specs, 4, 5, &mut create_rng(1)).unwrap();
    /// let results: HashMap<_, _> = sample
    ///     .batch()
    ///     .into_iter()
    ///     .map(|a| {
    ///         let y = 3.0 * a.get("a").and_then(|v| v.as_f64()).unwrap();
    ///         (a, EvaluationResult::new().with_output("y", [y]))
    ///     })
    ///     .collect();
    /// let m = MorrisAnalysis::analyze(&sample, &results, &["y".to_string()], Combination::Mean).unwrap();
    /// assert!((m.get("y", "a").unwrap().mu_star - 3.0).abs() < 1e-9);
    /// assert_eq!(m.get("y", "b").unwrap().mu_star, 0.0);
    /// ```
    pub fn analyze(
        sample: &MorrisSample,
        results: &HashMap<Assignment, EvaluationResult>,
        outputs: &[String],
        combination: Combination,
    ) -> Result<Self> {
        let steps: Vec<Steps> = sample
            .trajectories
            .iter()
            .map(|t| Steps {
                changed: t.changed.clone(),
                directions: t.directions.clone(),
            })
            .collect();
        let mut analysed = Vec::with_capacity(outputs.len());
        for output in outputs {
            let ys = sample
                .trajectories
                .iter()
                .map(|t| {
                    t.assignments
                        .iter()
                        .map(|a| output_value(results, a, output, combination))
                        .collect::<Result<Vec<f64>>>()
                })
                .collect::<Result<Vec<_>>>()?;
            let indices = indices(sample.parameters.len(), sample.delta, &steps, &ys);
            analysed.push((output.clone(), indices));
        }
        debug!(outputs = outputs.len(), trajectories = steps.len(), "morris measures computed");
        Ok(Self {
            parameters: sample.parameters.clone(),
            outputs: analysed,
        })
    }

    /// Rebuilds an analysis from a results table.
    ///
    /// The first `k` columns are parameters, the remaining ones outputs.
    /// Rows form consecutive trajectories of `k + 1` points. Boolean cells
    /// read as 0/1. A step where no parameter changes contributes no effect.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] when the row count is not a multiple of
    /// `k + 1`, a cell is not numeric, or a step moves several parameters.
    pub fn from_table(source_name: &str, table: &Table, k: usize, levels: usize) -> Result<Self> {
        if k == 0 || table.header.len() < k {
            return Err(Error::malformed(
                source_name,
                1,
                format!("expected at least {k} parameter columns, found {}", table.header.len()),
            ));
        }
        if table.rows.len() % (k + 1) != 0 {
            return Err(Error::malformed(
                source_name,
                table.rows.len() + 1,
                format!("{} rows do not form trajectories of {} points", table.rows.len(), k + 1),
            ));
        }
        if levels < 2 {
            return Err(Error::config("morris levels must be at least 2"));
        }
        let delta = morris_delta(levels);

        let mut values = Vec::with_capacity(table.rows.len());
        for (i, row) in table.rows.iter().enumerate() {
            let parsed = row
                .iter()
                .map(|cell| parse_cell(cell))
                .collect::<std::result::Result<Vec<f64>, String>>()
                .map_err(|m| Error::malformed(source_name, i + 2, m))?;
            values.push(parsed);
        }

        let mut steps = Vec::new();
        for (t, block) in values.chunks(k + 1).enumerate() {
            let mut changed = Vec::with_capacity(k);
            let mut directions = Vec::with_capacity(k);
            for s in 0..k {
                let moved: Vec<(usize, f64)> = (0..k)
                    .map(|j| (j, block[s + 1][j] - block[s][j]))
                    .filter(|(_, d)| *d != 0.0)
                    .collect();
                match moved.as_slice() {
                    [] => {
                        changed.push(usize::MAX);
                        directions.push(0.0);
                    }
                    [(j, d)] => {
                        changed.push(*j);
                        directions.push(d.signum());
                    }
                    _ => {
                        return Err(Error::malformed(
                            source_name,
                            t * (k + 1) + s + 3,
                            "more than one parameter changes in one step",
                        ))
                    }
                }
            }
            steps.push(Steps { changed, directions });
        }

        let mut analysed = Vec::new();
        for (o, name) in table.header.iter().enumerate().skip(k) {
            let ys: Vec<Vec<f64>> = values
                .chunks(k + 1)
                .map(|block| block.iter().map(|row| row[o]).collect())
                .collect();
            analysed.push((name.clone(), indices(k, delta, &steps, &ys)));
        }
        Ok(Self {
            parameters: table.header[..k].to_vec(),
            outputs: analysed,
        })
    }

    /// Reads a results file and analyses it.
    pub fn read(path: impl AsRef<Path>, k: usize, levels: usize) -> Result<Self> {
        let path = path.as_ref();
        let table = Table::read(path)?;
        Self::from_table(&path.display().to_string(), &table, k, levels)
    }

    /// Measures of `parameter` for `output`.
    pub fn get(&self, output: &str, parameter: &str) -> Option<&MorrisIndices> {
        let p = self.parameters.iter().position(|n| n == parameter)?;
        self.outputs
            .iter()
            .find(|(o, _)| o == output)
            .and_then(|(_, v)| v.get(p))
    }

    /// Human-readable report, one section per output.
    pub fn text_report(&self) -> String {
        let mut out = String::from("MORRIS ANALYSIS\n");
        for (output, indices) in &self.outputs {
            let _ = writeln!(out, "\nResult for output: {output}");
            for (s, label) in ["mu", "mu*", "sigma"].into_iter().enumerate() {
                let _ = writeln!(out, "{label}:");
                for (p, m) in self.parameters.iter().zip(indices) {
                    let value = [m.mu, m.mu_star, m.sigma][s];
                    let _ = writeln!(out, "\t{p} : {value}");
                }
            }
        }
        out
    }

    /// One row per output and parameter: `output,parameter,mu,mu_star,sigma`.
    pub fn csv_table(&self) -> Table {
        let header = ["output", "parameter", "mu", "mu_star", "sigma"]
            .map(String::from)
            .to_vec();
        let rows = self
            .outputs
            .iter()
            .flat_map(|(output, indices)| {
                self.parameters.iter().zip(indices).map(move |(p, m)| {
                    vec![
                        output.clone(),
                        p.clone(),
                        m.mu.to_string(),
                        m.mu_star.to_string(),
                        m.sigma.to_string(),
                    ]
                })
            })
            .collect();
        Table { header, rows }
    }

    /// Writes the report; a `.txt` extension selects the text form, anything
    /// else the CSV form.
    pub fn write_report(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let is_text = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
        if is_text {
            write_text(path, &self.text_report())
        } else {
            self.csv_table().write(path)
        }
    }
}

/// Parses a numeric or boolean cell.
fn parse_cell(cell: &str) -> std::result::Result<f64, String> {
    let cell = cell.trim();
    match cell.to_ascii_lowercase().as_str() {
        "true" => Ok(1.0),
        "false" => Ok(0.0),
        _ => cell
            .parse::<f64>()
            .map_err(|_| format!("'{cell}' is not a number")),
    }
}

/// Collects elementary effects per parameter and reduces them.
///
/// `ys[t]` holds the outputs of trajectory `t`, one per point.
fn indices(k: usize, delta: f64, steps: &[Steps], ys: &[Vec<f64>]) -> Vec<MorrisIndices> {
    let mut effects = vec![Vec::new(); k];
    for (trajectory, y) in steps.iter().zip(ys) {
        for (s, (&j, &dir)) in trajectory.changed.iter().zip(&trajectory.directions).enumerate() {
            if j >= k || dir == 0.0 || s + 1 >= y.len() {
                continue;
            }
            effects[j].push((y[s + 1] - y[s]) / (dir * delta));
        }
    }
    effects.iter().map(|e| MorrisIndices::of(e)).collect()
}
