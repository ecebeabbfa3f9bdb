use std::{fmt, path::Path, str::FromStr};

use tracing::debug;

use crate::{
    AVG_LABEL,
    config::Descriptor,
    error::{Error, Result},
    stat::{StatFile, StatSource},
    util::{mean, share},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Ipc,
    BranchMispred,
    DcacheMiss,
    IcacheMiss,
}

/// How a metric is derived from the raw counters
enum Formula {
    /// Instructions over cycles, or the simulator's own IPC figure
    Ipc,
    /// `part / (part + rest)` from a single stat file
    Share {
        file: StatFile,
        part: &'static str,
        rest: &'static str,
    },
}

const RATIO_RANGE: (f64, f64) = (0.0, 0.25);

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Ipc,
        Metric::BranchMispred,
        Metric::DcacheMiss,
        Metric::IcacheMiss,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Ipc => "ipc",
            Metric::BranchMispred => "branch_mispred",
            Metric::DcacheMiss => "dcache_miss",
            Metric::IcacheMiss => "icache_miss",
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            Metric::Ipc => "IPC",
            Metric::BranchMispred => "Branch Misprediction Ratio",
            Metric::DcacheMiss => "D-Cache Miss Ratio",
            Metric::IcacheMiss => "I-Cache Miss Ratio",
        }
    }

    /// Fixed y axis range, if the metric has one
    pub fn clamp(self) -> Option<(f64, f64)> {
        match self {
            Metric::Ipc => None,
            Metric::BranchMispred | Metric::DcacheMiss | Metric::IcacheMiss => Some(RATIO_RANGE),
        }
    }

    /// Name of the chart written for this metric
    pub fn file_name(self) -> &'static str {
        match self {
            Metric::Ipc => "ipc.png",
            Metric::BranchMispred => "branch_mispred.png",
            Metric::DcacheMiss => "dcache_miss.png",
            Metric::IcacheMiss => "icache_miss.png",
        }
    }

    fn formula(self) -> Formula {
        match self {
            Metric::Ipc => Formula::Ipc,
            Metric::BranchMispred => Formula::Share {
                file: StatFile::BranchPredictor,
                part: "CBR_RECOVER_MISPREDICT_count",
                rest: "CBR_CORRECT_count",
            },
            Metric::DcacheMiss => Formula::Share {
                file: StatFile::Memory,
                part: "DCACHE_MISS_ONPATH_count",
                rest: "DCACHE_HIT_ONPATH_count",
            },
            Metric::IcacheMiss => Formula::Share {
                file: StatFile::Memory,
                part: "ICACHE_MISS_ONPATH_count",
                rest: "ICACHE_HIT_ONPATH_count",
            },
        }
    }

    /// Computes the metric for one run. Missing counters never fail, they
    /// fall back to `0.0`; only I/O errors other than a missing file do.
    pub fn evaluate(self, source: &impl StatSource) -> Result<f64> {
        match self.formula() {
            Formula::Ipc => {
                let cycles = source.stat(StatFile::Memory, "Periodic_Cycles")?;
                let instructions = source.stat(StatFile::Memory, "Periodic_Instructions")?;
                if let (Some(cycles), Some(instructions)) = (cycles, instructions)
                    && cycles != 0.0
                {
                    return Ok(instructions / cycles);
                }
                Ok(source
                    .stat(StatFile::Memory, "Periodic IPC")?
                    .unwrap_or(0.0))
            }
            Formula::Share { file, part, rest } => {
                Ok(share(source.stat(file, part)?, source.stat(file, rest)?))
            }
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name() == s)
            .ok_or_else(|| Error::UnknownMetric(s.to_owned()))
    }
}

/// Values of one configuration, one per benchmark followed by their mean
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub configuration: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    pub metric: Metric,
    /// Benchmark names followed by [`AVG_LABEL`]
    pub labels: Vec<String>,
    /// In descriptor configuration order
    pub series: Vec<Series>,
}

impl MetricResult {
    pub fn axis_label(&self) -> &'static str {
        self.metric.axis_label()
    }

    pub fn clamp(&self) -> Option<(f64, f64)> {
        self.metric.clamp()
    }

    pub fn values(&self, configuration: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.configuration == configuration)
            .map(|s| s.values.as_slice())
    }
}

/// Computes `metric` for every configuration and benchmark of `descriptor`,
/// reading stat files below `sim_root`
pub fn compute(descriptor: &Descriptor, sim_root: &Path, metric: Metric) -> Result<MetricResult> {
    compute_with(descriptor, metric, |benchmark, configuration| {
        descriptor.run_dir(sim_root, benchmark, configuration)
    })
}

/// Like [`compute`], for a metric given by name
pub fn compute_named(descriptor: &Descriptor, sim_root: &Path, name: &str) -> Result<MetricResult> {
    compute(descriptor, sim_root, name.parse()?)
}

/// Computes `metric` with `source` supplying the counters of each
/// (benchmark, configuration) run
pub fn compute_with<S, F>(descriptor: &Descriptor, metric: Metric, source: F) -> Result<MetricResult>
where
    S: StatSource,
    F: Fn(&str, &str) -> S,
{
    let benchmarks = descriptor.benchmarks();
    let mut series = Vec::with_capacity(descriptor.configurations.len());

    for configuration in &descriptor.configurations {
        let mut values = Vec::with_capacity(benchmarks.len() + 1);
        for benchmark in &benchmarks {
            let value = metric.evaluate(&source(benchmark, configuration))?;
            debug!("{metric} {configuration}/{benchmark} = {value}");
            values.push(value);
        }
        let avg = mean(&values);
        debug!("{metric} {configuration} average = {avg}");
        values.push(avg);
        series.push(Series {
            configuration: configuration.clone(),
            values,
        });
    }

    let labels = benchmarks
        .into_iter()
        .map(str::to_owned)
        .chain(std::iter::once(AVG_LABEL.to_owned()))
        .collect();

    Ok(MetricResult {
        metric,
        labels,
        series,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Table(HashMap<(&'static str, &'static str), f64>);

    impl Table {
        fn with(mut self, file: StatFile, key: &'static str, value: f64) -> Self {
            let file = match file {
                StatFile::Memory => "mem",
                StatFile::BranchPredictor => "bp",
            };
            self.0.insert((file, key), value);
            self
        }
    }

    impl StatSource for Table {
        fn stat(&self, file: StatFile, key: &str) -> Result<Option<f64>> {
            let file = match file {
                StatFile::Memory => "mem",
                StatFile::BranchPredictor => "bp",
            };
            Ok(self
                .0
                .iter()
                .find(|((f, k), _)| *f == file && *k == key)
                .map(|(_, v)| *v))
        }
    }

    fn descriptor(workloads: &[&str], configurations: &[&str]) -> Descriptor {
        Descriptor {
            workloads: workloads.iter().map(|s| s.to_string()).collect(),
            configurations: configurations.iter().map(|s| s.to_string()).collect(),
            experiment: "exp".to_owned(),
        }
    }

    #[test]
    fn names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.name().parse::<Metric>().unwrap(), metric);
            assert_eq!(metric.file_name(), format!("{metric}.png"));
        }
    }

    #[test]
    fn unknown_metric() {
        let err = "l2_miss".parse::<Metric>().unwrap_err();
        assert!(matches!(err, Error::UnknownMetric(ref name) if name == "l2_miss"));
        let err = compute_named(&descriptor(&["b"], &["c"]), Path::new("/nonexistent"), "IPC")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownMetric(_)));
    }

    #[test]
    fn ipc_from_counters() {
        let t = Table::default()
            .with(StatFile::Memory, "Periodic_Instructions", 300.0)
            .with(StatFile::Memory, "Periodic_Cycles", 200.0)
            .with(StatFile::Memory, "Periodic IPC", 9.0);
        assert_eq!(Metric::Ipc.evaluate(&t).unwrap(), 1.5);
    }

    #[test]
    fn ipc_falls_back_on_zero_cycles() {
        let t = Table::default()
            .with(StatFile::Memory, "Periodic_Cycles", 0.0)
            .with(StatFile::Memory, "Periodic IPC", 1.23);
        assert_eq!(Metric::Ipc.evaluate(&t).unwrap(), 1.23);
    }

    #[test]
    fn ipc_falls_back_on_missing_cycles() {
        let t = Table::default()
            .with(StatFile::Memory, "Periodic_Instructions", 100.0)
            .with(StatFile::Memory, "Periodic IPC", 0.8);
        assert_eq!(Metric::Ipc.evaluate(&t).unwrap(), 0.8);
    }

    #[test]
    fn ipc_falls_back_on_missing_instructions() {
        let t = Table::default()
            .with(StatFile::Memory, "Periodic_Cycles", 10.0)
            .with(StatFile::Memory, "Periodic IPC", 0.7);
        assert_eq!(Metric::Ipc.evaluate(&t).unwrap(), 0.7);
        assert_eq!(Metric::Ipc.evaluate(&Table::default()).unwrap(), 0.0);
    }

    #[test]
    fn ratios_read_the_right_counters() {
        let t = Table::default()
            .with(StatFile::BranchPredictor, "CBR_RECOVER_MISPREDICT_count", 1.0)
            .with(StatFile::BranchPredictor, "CBR_CORRECT_count", 9.0)
            .with(StatFile::Memory, "DCACHE_MISS_ONPATH_count", 1.0)
            .with(StatFile::Memory, "DCACHE_HIT_ONPATH_count", 3.0)
            .with(StatFile::Memory, "ICACHE_MISS_ONPATH_count", 2.0)
            .with(StatFile::Memory, "ICACHE_HIT_ONPATH_count", 98.0)
            // branch counters in the wrong file must be ignored
            .with(StatFile::Memory, "CBR_CORRECT_count", 1000.0);
        assert_eq!(Metric::BranchMispred.evaluate(&t).unwrap(), 0.1);
        assert_eq!(Metric::DcacheMiss.evaluate(&t).unwrap(), 0.25);
        assert_eq!(Metric::IcacheMiss.evaluate(&t).unwrap(), 0.02);
    }

    #[test]
    fn ratios_are_zero_without_counters() {
        for metric in [Metric::BranchMispred, Metric::DcacheMiss, Metric::IcacheMiss] {
            assert_eq!(metric.evaluate(&Table::default()).unwrap(), 0.0);
            assert_eq!(metric.clamp(), Some((0.0, 0.25)));
        }
        assert_eq!(Metric::Ipc.clamp(), None);
    }

    #[test]
    fn series_shape_and_average() {
        let d = descriptor(&["x/b1", "b2", "b3"], &["cfgB", "cfgA"]);
        let result = compute_with(&d, Metric::DcacheMiss, |bench, cfg| match (bench, cfg) {
            ("b1", "cfgA") => Table::default()
                .with(StatFile::Memory, "DCACHE_MISS_ONPATH_count", 1.0)
                .with(StatFile::Memory, "DCACHE_HIT_ONPATH_count", 1.0),
            ("b2", _) => Table::default().with(StatFile::Memory, "DCACHE_MISS_ONPATH_count", 4.0),
            _ => Table::default(),
        })
        .unwrap();

        assert_eq!(result.labels, vec!["b1", "b2", "b3", "Avg"]);
        let configurations: Vec<_> = result.series.iter().map(|s| s.configuration.as_str()).collect();
        assert_eq!(configurations, vec!["cfgB", "cfgA"]);
        assert_eq!(result.values("cfgA").unwrap(), &[0.5, 1.0, 0.0, 0.5]);
        assert_eq!(result.values("cfgB").unwrap(), &[0.0, 1.0, 0.0, 1.0 / 3.0]);
        for series in &result.series {
            assert_eq!(series.values.len(), result.labels.len());
        }
        assert_eq!(result.axis_label(), "D-Cache Miss Ratio");
    }

    #[test]
    fn empty_workloads_average_to_zero() {
        let d = descriptor(&[], &["only"]);
        for metric in Metric::ALL {
            let result = compute_with(&d, metric, |_, _| Table::default()).unwrap();
            assert_eq!(result.labels, vec!["Avg"]);
            assert_eq!(result.values("only").unwrap(), &[0.0]);
        }
    }
}
