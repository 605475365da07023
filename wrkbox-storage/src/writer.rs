use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};
use wrkbox_core::{BenchmarkOutput, BenchmarkSuite, ReportWriter, SuiteReport, Verdict};

use crate::{Error, Result};

#[derive(Serialize)]
#[serde(tag = "document", rename_all = "snake_case")]
enum ReportDocument<'a> {
    Suite {
        suite: &'a BenchmarkSuite,
    },
    Run {
        url: Option<&'a str>,
        passed: bool,
        verdicts: Vec<Verdict>,
        output: &'a BenchmarkOutput,
    },
}

/// Writes a suite report as a multi-document YAML file: the suite first, then
/// one document per run with its output and verdicts.
pub struct YamlReportWriter {
    file_name: String,
    out: Option<BufWriter<fs::File>>,
}

impl YamlReportWriter {
    pub const EXTENSION: &'static str = "yaml";

    /// Creates (or truncates) `file_name`, or a timestamped default name.
    pub fn create(file_name: Option<String>) -> Result<Self> {
        let file_name = file_name
            .unwrap_or_else(|| wrkbox_core::default_file_name("wrk-report", Self::EXTENSION));
        let file = fs::File::create(&file_name)?;
        Ok(Self {
            file_name,
            out: Some(BufWriter::new(file)),
        })
    }

    /// Like [`create`](Self::create), with the file placed under `dir`.
    pub fn create_in(dir: impl AsRef<Path>, file_name: Option<String>) -> Result<Self> {
        let file_name = file_name
            .unwrap_or_else(|| wrkbox_core::default_file_name("wrk-report", Self::EXTENSION));
        Self::create(Some(dir.as_ref().join(file_name).to_string_lossy().into_owned()))
    }

    fn document(&mut self, document: &ReportDocument<'_>) -> Result<()> {
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| Error::WriterFinished(self.file_name.clone()))?;
        out.write_all(b"---\n")?;
        serde_yaml::to_writer(&mut *out, document)?;
        Ok(())
    }
}

impl ReportWriter for YamlReportWriter {
    type Error = Error;

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn write(&mut self, report: &SuiteReport) -> Result<()> {
        self.document(&ReportDocument::Suite {
            suite: &report.suite,
        })
    }

    fn write_output(&mut self, report: &SuiteReport, output: &BenchmarkOutput) -> Result<()> {
        let verdicts = report.evaluate(output);
        self.document(&ReportDocument::Run {
            url: output.header().map(|h| h.url.as_str()),
            passed: verdicts.iter().all(|v| v.passed),
            verdicts,
            output,
        })
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
            info!("Report written to {}", self.file_name);
        }
        Ok(())
    }
}

impl Drop for YamlReportWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Failed to flush report {}: {}", self.file_name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::Deserialize;
    use wrkbox_core::{BenchmarkConfig, Goal};

    const WITHOUT_ERRORS: &str =
        include_str!("../../wrkbox-core/testdata/wrk2_without_errors.txt");
    const WITH_ERRORS: &str = include_str!("../../wrkbox-core/testdata/wrk2_with_errors.txt");

    fn report() -> SuiteReport {
        let mut suite = wrkbox_core::BenchmarkSuite::new(
            "example",
            vec![
                BenchmarkConfig::new("http://localhost:44555"),
                BenchmarkConfig::new("http://localhost:44555/api/alive"),
            ],
        );
        suite.goals = vec![Goal::NoErrors, Goal::AverageLatency { threshold_ms: 200.0 }];
        SuiteReport::new(suite)
    }

    fn documents(path: &std::path::Path) -> Vec<serde_yaml::Value> {
        let content = fs::read_to_string(path).unwrap();
        serde_yaml::Deserializer::from_str(&content)
            .map(|doc| serde_yaml::Value::deserialize(doc).unwrap())
            .collect()
    }

    #[test]
    fn assigned_file_name_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["hello.yaml", "123.yaml", "hello-world.yaml", "foo.bin"] {
            let path = dir.path().join(name).to_string_lossy().to_string();
            let writer = YamlReportWriter::create(Some(path.clone())).unwrap();
            assert_eq!(writer.file_name(), path);
        }
    }

    #[test]
    fn writes_suite_then_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.yaml");
        let report = report();
        {
            let mut writer =
                YamlReportWriter::create(Some(path.to_string_lossy().to_string())).unwrap();
            writer.write(&report).unwrap();
            let now = Utc::now();
            for text in [WITHOUT_ERRORS, WITH_ERRORS] {
                let output = BenchmarkOutput::parse(text, now, now, report.suite.id).unwrap();
                writer.write_output(&report, &output).unwrap();
            }
            writer.finish().unwrap();
        }

        let docs = documents(&path);
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0]["document"].as_str(), Some("suite"));
        assert_eq!(docs[0]["suite"]["name"].as_str(), Some("example"));
        assert_eq!(docs[1]["document"].as_str(), Some("run"));
        assert_eq!(docs[1]["passed"].as_bool(), Some(false));
        assert_eq!(docs[1]["verdicts"][0]["passed"].as_bool(), Some(true));
        assert_eq!(docs[1]["output"]["throughput"]["average"].as_str(), Some("nan"));
        assert_eq!(docs[2]["verdicts"][0]["passed"].as_bool(), Some(false));
        assert_eq!(docs[2]["output"]["errors"]["timeout"].as_u64(), Some(20));
    }

    #[test]
    fn drop_flushes_without_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.yaml");
        {
            let mut writer =
                YamlReportWriter::create(Some(path.to_string_lossy().to_string())).unwrap();
            writer.write(&report()).unwrap();
        }
        let docs = documents(&path);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["document"].as_str(), Some("suite"));
    }

    #[test]
    fn write_after_finish_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finished.yaml");
        let mut writer =
            YamlReportWriter::create(Some(path.to_string_lossy().to_string())).unwrap();
        writer.finish().unwrap();
        writer.finish().unwrap();
        assert!(matches!(
            writer.write(&report()),
            Err(Error::WriterFinished(_))
        ));
    }

    #[test]
    fn default_name_uses_yaml_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = YamlReportWriter::create_in(dir.path(), None).unwrap();
        writer.finish().unwrap();

        let path = std::path::PathBuf::from(writer.file_name());
        assert!(writer.file_name().ends_with(".yaml"));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("wrk-report-")
        );
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.is_file());
    }
}
