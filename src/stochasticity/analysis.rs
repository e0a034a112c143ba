//! Per-output stochasticity analysis over replicated evaluations.

use super::config::{StochasticityConfig, StochasticityMethod};
use super::methods::{
    anova_effect_size, coefficient_of_variation_series, critical_effect_size,
    power_test_replicates, recommend_replicates, standard_error_series, Criterion,
    CONFIDENCE_PAIRS, EFFECT_SIZE_BANDS, MIN_REPLICATES,
};
use crate::error::{Error, Result};
use crate::evaluator::EvaluationResult;
use crate::param::Assignment;
use crate::table::{write_text, Table};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

/// Spread of recommended counts across assignments.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CountSummary {
    pub min: usize,
    pub max: usize,
    pub average: f64,
}

impl CountSummary {
    /// `None` for an empty slice.
    pub fn of(counts: &[usize]) -> Option<Self> {
        let min = *counts.iter().min()?;
        let max = *counts.iter().max()?;
        let average = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        Some(Self { min, max, average })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThresholdSummary {
    pub threshold: f64,
    pub counts: Option<CountSummary>,
}

/// Critical effect size results for one band, under both confidence pairs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectSizeSummary {
    pub band: String,
    pub effect_size: f64,
    pub strict: Option<CountSummary>,
    pub lenient: Option<CountSummary>,
    /// Every assignment used its whole series without detecting the effect.
    pub not_enough: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerEstimate {
    pub groups: usize,
    /// ANOVA effect size `f`.
    pub effect_size: f64,
    pub replicates: f64,
}

/// Raw indicator values of one assignment, kept for the CSV report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndicatorSeries {
    pub assignment: Assignment,
    pub method: StochasticityMethod,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputStochasticity {
    pub output: String,
    pub coefficient_of_variation: Vec<ThresholdSummary>,
    pub standard_error: Vec<ThresholdSummary>,
    pub effect_sizes: Vec<EffectSizeSummary>,
    pub power_test: Option<PowerEstimate>,
    /// Assignments with fewer than three replicates, left out of every summary.
    pub insufficient: usize,
    pub series: Vec<IndicatorSeries>,
}

/// Recommended replicate counts for every output and configured method.
///
/// ```
/// use std::collections::HashMap;
/// use u_explore::evaluator::EvaluationResult;
/// use u_explore::param::Assignment;
/// use u_explore::stochasticity::{StochasticityAnalysis, StochasticityConfig};
///
/// let mut results = HashMap::new();
/// results.insert(
///     Assignment::from_pairs([("x", 1)]),
///     EvaluationResult::new().with_output("y", [2.0, 2.0, 2.0, 2.0]),
/// );
/// let analysis = StochasticityAnalysis::run(&results, &StochasticityConfig::default()).unwrap();
/// assert_eq!(analysis.max_replicates, 4);
/// assert!(analysis.text_report().starts_with("== STOCHASTICITY ANALYSIS =="));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StochasticityAnalysis {
    pub parameters: Vec<String>,
    pub samples: usize,
    pub max_replicates: usize,
    pub thresholds: Vec<f64>,
    pub outputs: Vec<OutputStochasticity>,
}

impl StochasticityAnalysis {
    /// Analyses every assignment of `results`, ordered by their display form.
    pub fn run(
        results: &HashMap<Assignment, EvaluationResult>,
        config: &StochasticityConfig,
    ) -> Result<Self> {
        let mut order: Vec<Assignment> = results.keys().cloned().collect();
        order.sort_by_cached_key(|a| a.to_string());
        Self::analyze(&order, results, config)
    }

    /// Analyses the assignments of `order`, in that order.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] for an invalid config,
    /// [`Error::MissingEvaluation`] when an assignment has no result and
    /// [`Error::MissingOutput`] when a result lacks an analysed output.
    pub fn analyze(
        order: &[Assignment],
        results: &HashMap<Assignment, EvaluationResult>,
        config: &StochasticityConfig,
    ) -> Result<Self> {
        config.validate()?;
        let found = order
            .iter()
            .map(|a| {
                results
                    .get(a)
                    .map(|r| (a, r))
                    .ok_or_else(|| Error::MissingEvaluation(a.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let outputs = if config.outputs.is_empty() {
            common_outputs(&found)
        } else {
            config.outputs.clone()
        };
        let parameters: Vec<String> = order
            .iter()
            .flat_map(|a| a.names())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect();
        let max_replicates = found
            .iter()
            .flat_map(|(_, r)| r.iter().map(|(_, v)| v.len()))
            .max()
            .unwrap_or(0);
        info!(
            outputs = outputs.len(),
            samples = order.len(),
            max_replicates,
            "starting stochasticity analysis"
        );

        let outputs = outputs
            .iter()
            .map(|o| analyze_output(o, &found, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            parameters,
            samples: order.len(),
            max_replicates,
            thresholds: config.thresholds.clone(),
            outputs,
        })
    }

    pub fn output(&self, name: &str) -> Option<&OutputStochasticity> {
        self.outputs.iter().find(|o| o.output == name)
    }

    pub fn text_report(&self) -> String {
        let mut out = String::from("== STOCHASTICITY ANALYSIS ==\n");
        let _ = writeln!(
            out,
            "{} outputs | {} samples | {} max replications | Thresholds: {:?} | Critical effect size: {:?}",
            self.outputs.len(),
            self.samples,
            self.max_replicates,
            self.thresholds,
            EFFECT_SIZE_BANDS.map(|(_, es)| es),
        );
        out.push_str(
            "Thresholds bound the marginal decrease of an indicator when one replicate is added.\n",
        );
        out.push_str(
            "Critical effect size counts are given for alpha=0.01, beta=0.05 (alpha=0.05, beta=0.2).\n",
        );

        for o in &self.outputs {
            let _ = writeln!(out, "\n## Output : {}", o.output);
            if o.insufficient > 0 {
                let _ = writeln!(
                    out,
                    "{} samples skipped with fewer than {MIN_REPLICATES} replicates",
                    o.insufficient
                );
            }
            for (method, summaries) in [
                (StochasticityMethod::CoefficientOfVariation, &o.coefficient_of_variation),
                (StochasticityMethod::StandardError, &o.standard_error),
            ] {
                if summaries.is_empty() {
                    continue;
                }
                let _ = writeln!(out, "{method}");
                for s in summaries {
                    match s.counts {
                        Some(c) => {
                            let _ = writeln!(
                                out,
                                "{} : min = {} | max = {} | avr = {}",
                                s.threshold,
                                c.min,
                                c.max,
                                c.average.round()
                            );
                        }
                        None => {
                            let _ = writeln!(out, "{} : not enough replicates", s.threshold);
                        }
                    }
                }
            }
            if !o.effect_sizes.is_empty() {
                let _ = writeln!(out, "{}", StochasticityMethod::CriticalEffectSize);
                for es in &o.effect_sizes {
                    let _ = write!(out, "{} ({}) : ", es.band, es.effect_size);
                    match (es.not_enough, es.strict, es.lenient) {
                        (true, _, _) => {
                            let _ = writeln!(out, "{} replicates is not enough", self.max_replicates);
                        }
                        (false, Some(s), Some(l)) => {
                            let _ = writeln!(
                                out,
                                "min = {} ({}) | max = {} ({}) | avr = {} ({})",
                                s.min,
                                l.min,
                                s.max,
                                l.max,
                                s.average.round(),
                                l.average.round()
                            );
                        }
                        _ => out.push_str("not enough replicates\n"),
                    }
                }
            }
            if let Some(p) = o.power_test {
                let _ = writeln!(
                    out,
                    "{} with {} groups and (ANOVA) effect size f={}, theoretical number of replicates is {}",
                    StochasticityMethod::PowerTest,
                    p.groups,
                    p.effect_size,
                    p.replicates
                );
            }
        }
        out
    }

    /// `Outputs,<parameters>,Indicator,1..n-1`: one row per output,
    /// assignment and indicator series, the first (single replicate) value
    /// dropped.
    pub fn csv_table(&self) -> Table {
        let mut header = vec!["Outputs".to_string()];
        header.extend(self.parameters.iter().cloned());
        header.push("Indicator".to_string());
        header.extend((1..self.max_replicates).map(|i| i.to_string()));
        let width = header.len();

        let mut rows = Vec::new();
        for o in &self.outputs {
            for s in &o.series {
                let mut row = vec![o.output.clone()];
                row.extend(self.parameters.iter().map(|p| {
                    s.assignment.get(p).map(|v| v.to_string()).unwrap_or_default()
                }));
                row.push(s.method.code().to_string());
                row.extend(s.values.iter().skip(1).map(|v| v.to_string()));
                row.resize(width, String::new());
                rows.push(row);
            }
        }
        Table { header, rows }
    }

    /// Writes the report; a `.txt` extension selects the text form, anything
    /// else the CSV form.
    pub fn write_report(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("txt")) {
            write_text(path, &self.text_report())
        } else {
            self.csv_table().write(path)
        }
    }
}

/// Outputs present in every result, sorted.
fn common_outputs(found: &[(&Assignment, &EvaluationResult)]) -> Vec<String> {
    let mut common: Option<BTreeSet<&str>> = None;
    for &(_, r) in found {
        let names: BTreeSet<&str> = r.output_names().collect();
        common = Some(match common {
            None => names,
            Some(c) => c.intersection(&names).copied().collect(),
        });
    }
    common
        .unwrap_or_default()
        .into_iter()
        .map(String::from)
        .collect()
}

fn analyze_output(
    output: &str,
    found: &[(&Assignment, &EvaluationResult)],
    config: &StochasticityConfig,
) -> Result<OutputStochasticity> {
    let mut usable: Vec<(&Assignment, &[f64])> = Vec::new();
    let mut groups: Vec<&[f64]> = Vec::new();
    let mut insufficient = 0;
    for &(a, r) in found {
        let values = r.get(output).ok_or_else(|| Error::MissingOutput {
            output: output.to_string(),
            assignment: a.clone(),
        })?;
        if !values.is_empty() {
            groups.push(values);
        }
        if values.len() < MIN_REPLICATES {
            insufficient += 1;
        } else {
            usable.push((a, values));
        }
    }
    if insufficient > 0 {
        warn!(
            output,
            insufficient,
            min = MIN_REPLICATES,
            "samples skipped for lack of replicates"
        );
    }

    let mut series = Vec::new();
    let mut threshold_summaries = |method: StochasticityMethod| -> Vec<ThresholdSummary> {
        if !config.has(method) {
            return Vec::new();
        }
        for (a, values) in &usable {
            let values = match method {
                StochasticityMethod::CoefficientOfVariation => coefficient_of_variation_series(values),
                _ => standard_error_series(values),
            };
            series.push(IndicatorSeries {
                assignment: (*a).clone(),
                method,
                values,
            });
        }
        config
            .thresholds
            .iter()
            .map(|&threshold| {
                let criterion = match method {
                    StochasticityMethod::CoefficientOfVariation => {
                        Criterion::CoefficientOfVariation { threshold }
                    }
                    _ => Criterion::StandardError { threshold },
                };
                let mut exhausted = 0;
                let counts: Vec<usize> = usable
                    .iter()
                    .filter_map(|(_, values)| {
                        let n = recommend_replicates(values, criterion).count()?;
                        if n == values.len() {
                            exhausted += 1;
                        }
                        Some(n)
                    })
                    .collect();
                if exhausted > 0 {
                    warn!(
                        output,
                        method = method.code(),
                        threshold,
                        exhausted,
                        "threshold not met within the replicate series"
                    );
                }
                ThresholdSummary {
                    threshold,
                    counts: CountSummary::of(&counts),
                }
            })
            .collect()
    };
    let coefficient_of_variation = threshold_summaries(StochasticityMethod::CoefficientOfVariation);
    let standard_error = threshold_summaries(StochasticityMethod::StandardError);

    let effect_sizes = if config.has(StochasticityMethod::CriticalEffectSize) {
        EFFECT_SIZE_BANDS
            .iter()
            .map(|&(band, effect_size)| {
                let counts = CONFIDENCE_PAIRS.map(|(alpha, beta)| {
                    usable
                        .iter()
                        .map(|(_, v)| critical_effect_size(v, effect_size, alpha, beta))
                        .collect::<Vec<_>>()
                });
                let [strict, lenient] = &counts;
                let not_enough = !usable.is_empty()
                    && counts
                        .iter()
                        .all(|c| c.iter().zip(&usable).all(|(n, (_, v))| *n == v.len()));
                EffectSizeSummary {
                    band: band.to_string(),
                    effect_size,
                    strict: CountSummary::of(strict),
                    lenient: CountSummary::of(lenient),
                    not_enough,
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    let power_test = if config.has(StochasticityMethod::PowerTest) {
        let f = anova_effect_size(&groups);
        (groups.len() >= 2 && f.is_finite() && f > 0.0).then(|| PowerEstimate {
            groups: groups.len(),
            effect_size: f,
            replicates: power_test_replicates(groups.len(), f),
        })
    } else {
        None
    };

    Ok(OutputStochasticity {
        output: output.to_string(),
        coefficient_of_variation,
        standard_error,
        effect_sizes,
        power_test,
        insufficient,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> HashMap<Assignment, EvaluationResult> {
        let mut results = HashMap::new();
        results.insert(
            Assignment::from_pairs([("x", 1)]),
            EvaluationResult::new().with_output("y", [5.0; 6]),
        );
        results.insert(
            Assignment::from_pairs([("x", 2)]),
            EvaluationResult::new().with_output("y", [10.0, 12.0, 11.0, 11.0, 11.0]),
        );
        results.insert(
            Assignment::from_pairs([("x", 3)]),
            EvaluationResult::new().with_output("y", [7.0, 8.0]),
        );
        results
    }

    #[test]
    fn test_threshold_summaries() {
        let analysis = StochasticityAnalysis::run(&results(), &StochasticityConfig::default()).unwrap();
        assert_eq!(analysis.samples, 3);
        assert_eq!(analysis.max_replicates, 6);
        assert_eq!(analysis.parameters, vec!["x".to_string()]);

        let y = analysis.output("y").unwrap();
        assert_eq!(y.insufficient, 1);
        let cv = &y.coefficient_of_variation;
        assert_eq!(cv.len(), 3);
        assert_eq!(cv[0].threshold, 0.05);
        assert_eq!(
            cv[0].counts,
            Some(CountSummary {
                min: 2,
                max: 5,
                average: 3.5
            })
        );
        assert_eq!(y.standard_error.len(), 3);
        assert_eq!(y.effect_sizes.len(), EFFECT_SIZE_BANDS.len());
        // two indicator series (CV, SE) per usable assignment
        assert_eq!(y.series.len(), 4);
    }

    #[test]
    fn test_power_test() {
        let analysis = StochasticityAnalysis::run(&results(), &StochasticityConfig::default()).unwrap();
        let p = analysis.output("y").and_then(|o| o.power_test).unwrap();
        assert_eq!(p.groups, 3);
        assert!(p.effect_size > 0.0);
        assert_eq!(p.replicates, power_test_replicates(3, p.effect_size));

        let mut single = HashMap::new();
        single.insert(
            Assignment::from_pairs([("x", 1)]),
            EvaluationResult::new().with_output("y", [1.0, 2.0, 3.0]),
        );
        let analysis = StochasticityAnalysis::run(&single, &StochasticityConfig::default()).unwrap();
        assert!(analysis.outputs[0].power_test.is_none());
    }

    #[test]
    fn test_effect_size_not_enough() {
        let mut results = HashMap::new();
        results.insert(
            Assignment::from_pairs([("x", 1)]),
            EvaluationResult::new().with_output("y", [90.0, 110.0, 95.0, 105.0, 100.0, 98.0]),
        );
        let config = StochasticityConfig::default().with_methods([StochasticityMethod::CriticalEffectSize]);
        let analysis = StochasticityAnalysis::run(&results, &config).unwrap();
        let y = &analysis.outputs[0];
        assert!(y.coefficient_of_variation.is_empty());
        assert!(y.power_test.is_none());
        assert!(y.effect_sizes[0].not_enough);
        let huge = &y.effect_sizes[5];
        assert_eq!(huge.band, "huge");
        assert!(!huge.not_enough);
        assert_eq!(huge.lenient.map(|c| c.min), Some(3));

        let text = analysis.text_report();
        assert!(text.contains("ultra-micro (0.01) : 6 replicates is not enough"));
        assert!(text.contains("Critical effect size\n"));
    }

    #[test]
    fn test_missing_output() {
        let config = StochasticityConfig::default().with_outputs(["z"]);
        assert!(matches!(
            StochasticityAnalysis::run(&results(), &config),
            Err(Error::MissingOutput { .. })
        ));
    }

    #[test]
    fn test_outputs_default_to_common_names() {
        let mut results = HashMap::new();
        results.insert(
            Assignment::from_pairs([("x", 1)]),
            EvaluationResult::new()
                .with_output("a", [1.0, 2.0, 3.0])
                .with_output("b", [1.0, 2.0, 3.0]),
        );
        results.insert(
            Assignment::from_pairs([("x", 2)]),
            EvaluationResult::new().with_output("b", [1.0, 2.0, 3.0]),
        );
        let analysis = StochasticityAnalysis::run(&results, &StochasticityConfig::default()).unwrap();
        let names: Vec<&str> = analysis.outputs.iter().map(|o| o.output.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_reports() {
        let analysis = StochasticityAnalysis::run(&results(), &StochasticityConfig::default()).unwrap();
        let text = analysis.text_report();
        assert!(text.starts_with("== STOCHASTICITY ANALYSIS ==\n1 outputs | 3 samples | 6 max replications"));
        assert!(text.contains("## Output : y"));
        assert!(text.contains("Coefficient of variation\n0.05 : min = 2 | max = 5 | avr = 4"));
        assert!(text.contains("1 samples skipped"));
        assert!(text.contains("Power test with 3 groups"));

        let csv = analysis.csv_table();
        assert_eq!(csv.header, ["Outputs", "x", "Indicator", "1", "2", "3", "4", "5"]);
        assert_eq!(csv.rows.len(), 4);
        assert!(csv.rows.iter().all(|r| r.len() == csv.header.len()));
        // x=1 sorts first; its CV series is all zeros
        assert_eq!(csv.rows[0][..3], ["y", "1", "CV"]);
        assert_eq!(csv.rows[0][3], "0");

        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("stoch.txt");
        analysis.write_report(&txt).unwrap();
        assert_eq!(std::fs::read_to_string(&txt).unwrap(), text);
        let path = dir.path().join("stoch.csv");
        analysis.write_report(&path).unwrap();
        assert_eq!(Table::read(&path).unwrap(), csv);
    }
}
