use std::{fs, path::Path};

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    metric::Metric,
    stat::RunDir,
};

/// Experiment descriptor shared with the simulation launcher.
///
/// Only the fields needed to locate stat files are read, anything else in the
/// document is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "workloads_list")]
    pub workloads: Vec<String>,
    /// Keys of the `configurations` object, in document order
    #[serde(deserialize_with = "configuration_names")]
    pub configurations: Vec<String>,
    pub experiment: String,
}

fn configuration_names<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let configurations = Map::<String, Value>::deserialize(deserializer)?;
    Ok(configurations.into_iter().map(|(name, _)| name).collect())
}

impl Descriptor {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        Self::parse(&contents, path)
    }

    /// Parses descriptor JSON, `origin` is only used for error reporting
    pub fn parse(contents: &str, origin: &Path) -> Result<Self> {
        let descriptor: Descriptor =
            serde_json::from_str(contents).map_err(|source| Error::Descriptor {
                path: origin.to_path_buf(),
                source,
            })?;
        if descriptor.configurations.is_empty() {
            return Err(Error::EmptyConfigurations(origin.to_path_buf()));
        }
        Ok(descriptor)
    }

    /// Benchmark names, the last path segment of every workload entry
    pub fn benchmarks(&self) -> Vec<&str> {
        self.workloads
            .iter()
            .map(|w| w.rsplit('/').next().unwrap_or(w))
            .collect()
    }

    pub fn run_dir(&self, sim_root: &Path, benchmark: &str, configuration: &str) -> RunDir {
        RunDir::new(
            sim_root
                .join(benchmark)
                .join(&self.experiment)
                .join(configuration),
        )
    }
}

/// Per-invocation settings handed to the plotting run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub metrics: Vec<Metric>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            metrics: Metric::ALL.to_vec(),
        }
    }
}

impl RunSettings {
    /// Uses `metrics` when non-empty, otherwise the defaults. Repeated metrics
    /// are kept once, at their first position.
    pub fn with_metrics(metrics: Vec<Metric>) -> Self {
        if metrics.is_empty() {
            return Self::default();
        }
        let mut unique = Vec::with_capacity(metrics.len());
        for metric in metrics {
            if !unique.contains(&metric) {
                unique.push(metric);
            }
        }
        Self { metrics: unique }
    }
}
