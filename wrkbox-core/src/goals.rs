use std::fmt;

use serde::{Deserialize, Serialize};

use crate::output::BenchmarkOutput;
use crate::units::Metric;

/// A pass/fail rule checked against one parsed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Goal {
    NoErrors,
    AverageLatency { threshold_ms: f64 },
    MaxLatency { threshold_ms: f64 },
    PercentileLatency { percentile: f64, threshold_ms: f64 },
    MinRequestsPerSecond { threshold: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub goal_description: String,
    pub passed: bool,
    pub detail: String,
}

impl Verdict {
    fn new(goal: &Goal, passed: bool, detail: String) -> Self {
        Self {
            goal_description: goal.describe(),
            passed,
            detail,
        }
    }
}

impl Goal {
    pub fn describe(&self) -> String {
        match self {
            Goal::NoErrors => "No errors".to_string(),
            Goal::AverageLatency { threshold_ms } => {
                format!("Average latency <= {} ms", threshold_ms)
            }
            Goal::MaxLatency { threshold_ms } => format!("Max latency <= {} ms", threshold_ms),
            Goal::PercentileLatency {
                percentile,
                threshold_ms,
            } => format!("p{} latency <= {} ms", percentile, threshold_ms),
            Goal::MinRequestsPerSecond { threshold } => format!("Requests/sec >= {}", threshold),
        }
    }

    pub fn evaluate(&self, output: &BenchmarkOutput) -> Verdict {
        match self {
            Goal::NoErrors => match output.errors() {
                None => Verdict::new(self, true, "no errors reported".to_string()),
                Some(errors) if errors.is_clean() => {
                    Verdict::new(self, true, "all error counters are zero".to_string())
                }
                Some(errors) => {
                    let counts = errors
                        .non_zero()
                        .iter()
                        .map(|(name, count)| format!("{} {}", name, count))
                        .collect::<Vec<_>>()
                        .join(", ");
                    Verdict::new(
                        self,
                        false,
                        format!("{} errors: {}", errors.total(), counts),
                    )
                }
            },
            Goal::AverageLatency { threshold_ms } => at_most(
                self,
                "average latency",
                output.latency().average,
                *threshold_ms,
                " ms",
            ),
            Goal::MaxLatency { threshold_ms } => at_most(
                self,
                "max latency",
                output.latency().max,
                *threshold_ms,
                " ms",
            ),
            Goal::PercentileLatency {
                percentile,
                threshold_ms,
            } => match output.latency_at(*percentile) {
                Some(latency_ms) => at_most(
                    self,
                    &format!("p{} latency", percentile),
                    Metric::Value(latency_ms),
                    *threshold_ms,
                    " ms",
                ),
                None => Verdict::new(
                    self,
                    false,
                    format!("p{} is not in the latency distribution", percentile),
                ),
            },
            Goal::MinRequestsPerSecond { threshold } => {
                let rps = output.totals().requests_per_second;
                if rps >= *threshold {
                    Verdict::new(
                        self,
                        true,
                        format!("{:.2} requests/sec meets {}", rps, threshold),
                    )
                } else {
                    Verdict::new(
                        self,
                        false,
                        format!("{:.2} requests/sec is below {}", rps, threshold),
                    )
                }
            }
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

fn at_most(goal: &Goal, label: &str, metric: Metric, threshold: f64, unit: &str) -> Verdict {
    match metric {
        Metric::Value(v) if v <= threshold => Verdict::new(
            goal,
            true,
            format!("{} {:.3}{} is within {}{}", label, v, unit, threshold, unit),
        ),
        Metric::Value(v) => Verdict::new(
            goal,
            false,
            format!("{} {:.3}{} exceeds {}{}", label, v, unit, threshold, unit),
        ),
        Metric::Undefined => Verdict::new(
            goal,
            false,
            format!("{} was not measured by the load tool", label),
        ),
        Metric::Infinite => Verdict::new(goal, false, format!("{} is infinite", label)),
    }
}

/// Evaluates `goals` in declaration order. No goals means no gating.
pub fn evaluate_goals(goals: &[Goal], output: &BenchmarkOutput) -> Vec<Verdict> {
    goals.iter().map(|goal| goal.evaluate(output)).collect()
}
