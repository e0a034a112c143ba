//! Local-search calibration: hill climbing, simulated annealing, tabu
//! search and reactive tabu search.
//!
//! Every runner walks the same one-step neighbourhood the GA's local search
//! uses ([`one_step_neighbors`](crate::ga::operators::one_step_neighbors))
//! and reads fitness through a [`FitnessCache`](crate::cache::FitnessCache),
//! so an assignment is evaluated at most once per run however often the
//! walk returns to it.
//!
//! # Key Types
//!
//! - [`SearchConfig`]: objective, fitness output, starting point, seed
//! - [`HillClimbingRunner`], [`SaRunner`], [`TabuRunner`],
//!   [`ReactiveTabuRunner`]: one runner per algorithm, each with its config
//! - [`SearchResult`]: best assignment with run statistics

mod annealing;
mod config;
mod hill;
mod reactive;
mod search;
mod tabu;

pub use annealing::SaRunner;
pub use config::{
    CoolingSchedule, HillClimbingConfig, ReactiveTabuConfig, SaConfig, SearchConfig, TabuConfig,
};
pub use hill::HillClimbingRunner;
pub use reactive::ReactiveTabuRunner;
pub use search::SearchResult;
pub use tabu::TabuRunner;

#[cfg(test)]
pub(crate) mod testing {
    use crate::error::Result;
    use crate::evaluator::{EvaluationResult, Evaluator, FITNESS_OUTPUT};
    use crate::param::{Assignment, ParameterSpec, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    pub fn grid_specs() -> Vec<ParameterSpec> {
        vec![ParameterSpec::int("x", 0, 20), ParameterSpec::int("y", 0, 20)]
    }

    fn term(a: &Assignment, name: &str, peak: f64) -> f64 {
        a.get(name)
            .and_then(Value::as_f64)
            .map_or(0.0, |v| (v - peak).powi(2))
    }

    /// Concave bowl peaking at x = 7, y = 12; absent coordinates count zero.
    pub fn bowl(a: &Assignment) -> f64 {
        -term(a, "x", 7.0) - term(a, "y", 12.0)
    }

    /// Records every assignment submitted and scores it with [`bowl`].
    pub struct RecordingEvaluator {
        seen: Mutex<Vec<Assignment>>,
        cancelled: AtomicBool,
    }

    impl RecordingEvaluator {
        pub fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                cancelled: AtomicBool::new(false),
            }
        }

        pub fn submitted(&self) -> Vec<Assignment> {
            self.seen.lock().map(|s| s.clone()).unwrap_or_default()
        }

        pub fn was_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }
    }

    impl Evaluator for RecordingEvaluator {
        fn evaluate(&self, batch: &[Assignment]) -> Result<HashMap<Assignment, EvaluationResult>> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.extend(batch.iter().cloned());
            }
            Ok(batch
                .iter()
                .map(|a| (a.clone(), EvaluationResult::new().with_output(FITNESS_OUTPUT, [bowl(a)])))
                .collect())
        }

        fn on_cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }
}
