use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use common::{
    config::{Descriptor, RunSettings},
    metric::Metric,
    plot::BarChart,
};
use eyre::{Context, Result};
use tokio::task::spawn_blocking;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod plot;

const LOG_TARGETS: [&str; 2] = ["plot_metrics", "common"];

/// Plot per-benchmark simulator metrics for every configuration of an experiment
#[derive(Parser, Debug)]
struct Cli {
    /// Output directory for plots
    #[arg(short, long, alias = "output_dir")]
    output_dir: PathBuf,
    /// Experiment descriptor JSON
    #[arg(short, long)]
    descriptor: PathBuf,
    /// Root of the simulation results, ie. <path>/<benchmark>/<experiment>/<config>
    #[arg(short, long, alias = "simulation_path")]
    simulation_path: PathBuf,
    /// Metrics to plot, all of them when omitted
    #[arg(short, long, num_args = 1.., value_parser = Metric::from_str)]
    metrics: Vec<Metric>,
    /// Extra tracing directives, ie. common=trace
    #[arg(short, long)]
    log: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("{}={log_level}", LOG_TARGETS[0]));
    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }
    for target in &LOG_TARGETS[1..] {
        if !args.log.iter().any(|x| x.starts_with(target)) {
            env_filter = env_filter.add_directive(format!("{target}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    let descriptor_path = args.descriptor.clone();
    let descriptor = spawn_blocking(move || Descriptor::load(descriptor_path))
        .await?
        .wrap_err_with(|| format!("Load descriptor {:?}", args.descriptor))?;
    info!(
        "Loaded {} workloads x {} configurations for experiment {}",
        descriptor.workloads.len(),
        descriptor.configurations.len(),
        descriptor.experiment
    );

    let settings = RunSettings::with_metrics(args.metrics);
    if let Err(err) = plot::run(
        descriptor,
        args.simulation_path,
        &args.output_dir,
        &settings,
        BarChart::default(),
    )
    .await
    {
        error!("{err:#?}");
        return Err(err);
    }

    Ok(())
}
