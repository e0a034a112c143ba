//! Stochasticity analysis configuration.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Relative thresholds applied by the CV and SE searches.
pub const DEFAULT_THRESHOLDS: [f64; 3] = [0.05, 0.01, 0.001];

/// Replicate-count estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StochasticityMethod {
    /// Marginal decrease of the running coefficient of variation.
    CoefficientOfVariation,
    /// Marginal decrease of the running standard error.
    StandardError,
    /// Smallest subset detecting a critical effect size with a t-test.
    CriticalEffectSize,
    /// Regression estimate from the ANOVA effect size across assignments.
    PowerTest,
}

impl StochasticityMethod {
    pub const ALL: [StochasticityMethod; 4] = [
        StochasticityMethod::CoefficientOfVariation,
        StochasticityMethod::StandardError,
        StochasticityMethod::CriticalEffectSize,
        StochasticityMethod::PowerTest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StochasticityMethod::CoefficientOfVariation => "Coefficient of variation",
            StochasticityMethod::StandardError => "Standard error",
            StochasticityMethod::CriticalEffectSize => "Critical effect size",
            StochasticityMethod::PowerTest => "Power test",
        }
    }

    /// Short label used in CSV output.
    pub fn code(self) -> &'static str {
        match self {
            StochasticityMethod::CoefficientOfVariation => "CV",
            StochasticityMethod::StandardError => "SE",
            StochasticityMethod::CriticalEffectSize => "ES",
            StochasticityMethod::PowerTest => "PT",
        }
    }
}

impl fmt::Display for StochasticityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StochasticityMethod {
    type Err = Error;

    /// Accepts the short code or the full name, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| key == m.code().to_ascii_lowercase() || key == m.name().to_ascii_lowercase())
            .ok_or_else(|| Error::config(format!("unknown stochasticity method '{s}'")))
    }
}

/// Configuration of a stochasticity analysis.
///
/// ```
/// use u_explore::stochasticity::{StochasticityConfig, StochasticityMethod};
///
/// let config = StochasticityConfig::default()
///     .with_methods([StochasticityMethod::StandardError])
///     .with_thresholds([0.01]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StochasticityConfig {
    pub methods: Vec<StochasticityMethod>,
    /// Thresholds for the CV and SE searches, each in `(0, 1]`.
    pub thresholds: Vec<f64>,
    /// Outputs to analyse; empty means every output found in the results.
    pub outputs: Vec<String>,
}

impl Default for StochasticityConfig {
    fn default() -> Self {
        Self {
            methods: StochasticityMethod::ALL.to_vec(),
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            outputs: Vec::new(),
        }
    }
}

impl StochasticityConfig {
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = StochasticityMethod>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn with_thresholds(mut self, thresholds: impl IntoIterator<Item = f64>) -> Self {
        self.thresholds = thresholds.into_iter().collect();
        self
    }

    pub fn with_outputs<S: Into<String>>(mut self, outputs: impl IntoIterator<Item = S>) -> Self {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn has(&self, method: StochasticityMethod) -> bool {
        self.methods.contains(&method)
    }

    pub fn validate(&self) -> Result<()> {
        if self.methods.is_empty() {
            return Err(Error::config("no stochasticity method selected"));
        }
        let needs_thresholds = self.has(StochasticityMethod::CoefficientOfVariation)
            || self.has(StochasticityMethod::StandardError);
        if needs_thresholds && self.thresholds.is_empty() {
            return Err(Error::config("CV and SE need at least one threshold"));
        }
        if let Some(t) = self.thresholds.iter().find(|t| !(**t > 0.0 && **t <= 1.0)) {
            return Err(Error::config(format!("threshold {t} is outside (0, 1]")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_round_trip() {
        for m in StochasticityMethod::ALL {
            assert_eq!(m.code().parse::<StochasticityMethod>().ok(), Some(m));
            assert_eq!(m.name().to_uppercase().parse::<StochasticityMethod>().ok(), Some(m));
        }
        assert!("anova".parse::<StochasticityMethod>().is_err());
    }

    #[test]
    fn test_validate() {
        let config = StochasticityConfig::default();
        assert_eq!(config.methods.len(), 4);
        assert_eq!(config.thresholds, vec![0.05, 0.01, 0.001]);
        assert!(config.validate().is_ok());
        assert!(config.clone().with_methods([]).validate().is_err());
        assert!(config.clone().with_thresholds([0.0]).validate().is_err());
        assert!(config.clone().with_thresholds([]).validate().is_err());
        assert!(config
            .with_methods([StochasticityMethod::PowerTest])
            .with_thresholds([])
            .validate()
            .is_ok());
    }
}
