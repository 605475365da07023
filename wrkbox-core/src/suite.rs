use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::goals::{Goal, Verdict, evaluate_goals};
use crate::output::BenchmarkOutput;

fn default_threads() -> u32 {
    2
}

fn default_connections() -> u32 {
    10
}

fn default_duration() -> String {
    "10s".to_string()
}

fn default_latency() -> bool {
    true
}

/// One target of a suite, with the wrk options it is run with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub url: String,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default = "default_connections")]
    pub connections: u32,
    #[serde(default = "default_duration")]
    pub duration: String,
    /// Constant request rate (wrk2 `-R`).
    #[serde(default)]
    pub rate: Option<u32>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default = "default_latency")]
    pub latency: bool,
}

impl BenchmarkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            threads: default_threads(),
            connections: default_connections(),
            duration: default_duration(),
            rate: None,
            script: None,
            latency: default_latency(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSuite {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub configs: Vec<BenchmarkConfig>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub scripts_dir: Option<PathBuf>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub public_ip: Option<String>,
}

impl BenchmarkSuite {
    pub fn new(name: impl Into<String>, configs: Vec<BenchmarkConfig>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            configs,
            goals: Vec::new(),
            scripts_dir: None,
            start_time: None,
            end_time: None,
            location: None,
            public_ip: None,
        }
    }
}

/// Verdicts for one completed run of a suite config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub config_index: usize,
    pub url: Option<String>,
    pub verdicts: Vec<Verdict>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.verdicts.iter().all(|v| v.passed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub suite: BenchmarkSuite,
    #[serde(default)]
    pub runs: Vec<RunReport>,
}

impl SuiteReport {
    pub fn new(suite: BenchmarkSuite) -> Self {
        Self {
            suite,
            runs: Vec::new(),
        }
    }

    pub fn evaluate(&self, output: &BenchmarkOutput) -> Vec<Verdict> {
        evaluate_goals(&self.suite.goals, output)
    }

    /// Evaluates the suite goals against the output of config `config_index`
    /// and keeps the verdicts.
    pub fn record(&mut self, config_index: usize, output: &BenchmarkOutput) -> &RunReport {
        let url = self
            .suite
            .configs
            .get(config_index)
            .map(|c| c.url.clone())
            .or_else(|| output.header().map(|h| h.url.clone()));
        let verdicts = self.evaluate(output);
        self.runs.push(RunReport {
            config_index,
            url,
            verdicts,
        });
        &self.runs[self.runs.len() - 1]
    }

    pub fn failed_verdicts(&self) -> usize {
        self.runs
            .iter()
            .flat_map(|run| &run.verdicts)
            .filter(|v| !v.passed)
            .count()
    }

    pub fn passed(&self) -> bool {
        self.failed_verdicts() == 0
    }
}
