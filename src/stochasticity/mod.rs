//! How many replicates does a stochastic model need?
//!
//! Each assignment is evaluated several times; the replicate series of an
//! output is fed to one or more estimators:
//!
//! - **Coefficient of variation** and **standard error**: the smallest
//!   replicate count after which one more replicate barely lowers the
//!   running indicator (relative thresholds 5%, 1%, 0.1%).
//! - **Critical effect size**: the smallest subset able to detect a given
//!   relative effect with a two-sample t-test.
//! - **Power test**: a regression estimate from the ANOVA effect size
//!   across assignments.
//!
//! [`recommend_replicates`] works on a single series;
//! [`StochasticityAnalysis`] runs every configured method over a whole
//! result map and renders text and CSV reports.

mod analysis;
mod config;
mod methods;

pub use analysis::{
    CountSummary, EffectSizeSummary, IndicatorSeries, OutputStochasticity, PowerEstimate,
    StochasticityAnalysis, ThresholdSummary,
};
pub use config::{StochasticityConfig, StochasticityMethod, DEFAULT_THRESHOLDS};
pub use methods::{
    anova_effect_size, coefficient_of_variation_series, critical_effect_size,
    find_with_relative_threshold, power_test_replicates, recommend_replicates,
    standard_error_series, Criterion, Recommendation, CONFIDENCE_PAIRS, EFFECT_SIZE_BANDS,
    MIN_REPLICATES,
};
