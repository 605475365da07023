use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;
use wrkbox_core::BenchmarkSuite;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    inner: Arc<ConfigInner>,
}

#[derive(Debug)]
struct ConfigInner {
    suites: Vec<SuiteEntry>,
}

/// A suite as declared in a config file, with its selection flags.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SuiteEntry {
    #[serde(flatten)]
    pub suite: BenchmarkSuite,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub only: bool,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ConfigFile {
    Suite(Box<SuiteEntry>),
}

impl Config {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        WalkDir::new(dir.as_ref())
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml" || ext == "json" || ext == "jsonl")
                    .unwrap_or(false)
            })
            .try_fold(
                ConfigInner { suites: Vec::new() },
                |mut acc, entry| -> Result<_> {
                    let path = entry.path();
                    debug!("Loading config file {}", path.display());
                    let content = std::fs::read_to_string(path)?;
                    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

                    let items: Vec<ConfigFile> = match ext {
                        "json" => {
                            let value: serde_json::Value = serde_json::from_str(&content)?;
                            if value.is_array() {
                                serde_json::from_value(value)?
                            } else {
                                vec![serde_json::from_value(value)?]
                            }
                        }
                        "jsonl" => content
                            .lines()
                            .filter(|line| !line.trim().is_empty())
                            .map(|line| serde_json::from_str(line).map_err(Error::Serialize))
                            .collect::<Result<Vec<_>>>()?,
                        "yaml" | "yml" => {
                            let mut items = Vec::new();
                            for doc in serde_yaml::Deserializer::from_str(&content) {
                                let value = serde_yaml::Value::deserialize(doc)?;
                                if value.is_null() {
                                    continue;
                                }
                                if let Ok(list) =
                                    serde_yaml::from_value::<Vec<ConfigFile>>(value.clone())
                                {
                                    items.extend(list);
                                } else {
                                    items.push(serde_yaml::from_value(value)?);
                                }
                            }
                            items
                        }
                        _ => Vec::new(),
                    };

                    for config_file in items {
                        match config_file {
                            ConfigFile::Suite(suite) => acc.suites.push(*suite),
                        }
                    }

                    Ok(acc)
                },
            )
            .map(|inner| Config {
                inner: Arc::new(inner),
            })
    }

    /// Suites selected to run: the `only` ones if any suite sets it,
    /// otherwise every suite not `disabled`.
    pub fn get_suites(&self) -> Vec<&BenchmarkSuite> {
        let has_only = self.inner.suites.iter().any(|s| s.only);
        self.inner
            .suites
            .iter()
            .filter(|s| if has_only { s.only } else { !s.disabled })
            .map(|s| &s.suite)
            .collect()
    }

    pub fn get_suite(&self, name: &str) -> Option<&BenchmarkSuite> {
        self.inner
            .suites
            .iter()
            .map(|s| &s.suite)
            .find(|suite| suite.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use wrkbox_core::Goal;

    const SMOKE_SUITE: &str = r#"
type: suite
name: smoke
scripts_dir: wrk_scripts
location: waw
public_ip: 0.0.0.1
configs:
  - url: http://localhost:44555
  - url: http://localhost:44555/api/alive
    threads: 4
    connections: 64
    duration: 30s
    rate: 100
goals:
  - kind: no_errors
  - kind: average_latency
    threshold_ms: 200
"#;

    #[test]
    fn loads_yaml_suite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("smoke.yaml"), SMOKE_SUITE).unwrap();

        let config = Config::load(dir.path()).unwrap();
        let suite = config.get_suite("smoke").expect("suite not loaded");
        assert_eq!(suite.configs.len(), 2);
        assert_eq!(suite.configs[0].threads, 2);
        assert_eq!(suite.configs[1].connections, 64);
        assert_eq!(suite.configs[1].rate, Some(100));
        assert_eq!(suite.location.as_deref(), Some("waw"));
        assert_eq!(
            suite.goals,
            vec![Goal::NoErrors, Goal::AverageLatency { threshold_ms: 200.0 }]
        );
        assert!(config.get_suite("missing").is_none());
    }

    #[test]
    fn loads_json_and_jsonl_suites() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"[{"type":"suite","name":"a","configs":[{"url":"http://a"}]}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.jsonl"),
            "{\"type\":\"suite\",\"name\":\"b\",\"configs\":[]}\n\n{\"type\":\"suite\",\"name\":\"c\",\"configs\":[],\"disabled\":true}\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a config").unwrap();

        let config = Config::load(dir.path()).unwrap();
        let names: Vec<_> = config.get_suites().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(config.get_suite("c").is_some());
    }

    #[test]
    fn only_flag_narrows_selection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("suites.yaml"),
            "type: suite\nname: one\nconfigs: []\n---\ntype: suite\nname: two\nconfigs: []\nonly: true\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        let names: Vec<_> = config.get_suites().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["two"]);
    }

    #[test]
    fn invalid_suite_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.yaml"), "type: suite\nconfigs: 3\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::Yaml(_))));
    }
}
