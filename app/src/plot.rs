use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use common::{
    config::{Descriptor, RunSettings},
    metric::compute,
    plot::ChartRenderer,
};
use eyre::{Context, Result};
use tokio::{fs::create_dir_all, task::spawn_blocking};
use tracing::{debug, info};

/// Computes and renders every metric of `settings`, one after the other.
/// Returns the written chart paths in metric order.
pub async fn run<R>(
    descriptor: Descriptor,
    sim_root: PathBuf,
    output_dir: &Path,
    settings: &RunSettings,
    renderer: R,
) -> Result<Vec<PathBuf>>
where
    R: ChartRenderer + Send + Sync + 'static,
{
    create_dir_all(output_dir)
        .await
        .wrap_err_with(|| format!("Create output dir {output_dir:?}"))?;

    let descriptor = Arc::new(descriptor);
    let sim_root = Arc::new(sim_root);
    let renderer = Arc::new(renderer);
    let mut written = Vec::with_capacity(settings.metrics.len());

    for &metric in &settings.metrics {
        let out = output_dir.join(metric.file_name());
        debug!("Plotting {metric} to {out:?}");

        let (descriptor, sim_root, renderer, path) = (
            descriptor.clone(),
            sim_root.clone(),
            renderer.clone(),
            out.clone(),
        );
        spawn_blocking(move || -> common::Result<()> {
            let result = compute(&descriptor, &sim_root, metric)?;
            renderer.render(&result, &path)
        })
        .await?
        .wrap_err_with(|| format!("Plot {metric}"))?;

        info!("Wrote {out:?}");
        written.push(out);
    }
    Ok(written)
}
