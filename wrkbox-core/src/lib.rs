mod classify;
mod error;
mod goals;
mod output;
mod parser;
mod report;
mod suite;
mod units;

pub use classify::{Classified, Classifier, LineClass, classify};
pub use error::*;
pub use goals::{Goal, Verdict, evaluate_goals};
pub use output::*;
pub use parser::{Diagnostic, parse, parse_with_diagnostics};
pub use report::{ReportWriter, default_file_name};
pub use suite::{BenchmarkConfig, BenchmarkSuite, RunReport, SuiteReport};
pub use units::{
    Dimension, Metric, normalize, parse_count, parse_percent, parse_size_bytes, parse_time_ms,
};
