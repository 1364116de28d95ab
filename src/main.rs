use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

mod aggregate;
mod cli;
mod config;
mod error;
mod io;
mod join;
mod layers;
mod observation;
mod pipeline;
mod precipitation;
mod render;

use cli::get_args;
use config::{ColumnConfig, window_label};
use join::{JoinReport, join_topics, precipitation_centroids};
use layers::MapLayers;
use pipeline::summarize;
use render::{MapFigure, figure_title, render_to_file};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Configuration
    let run = get_args()?;
    let column_config = ColumnConfig::new();

    // Load inputs
    let observations = io::csv::load_observations(&run.observations_csv, &column_config)
        .with_context(|| format!("Failed to load observations: {:?}", run.observations_csv))?;
    let layers = MapLayers::load(&run.layer_paths, &column_config)
        .with_context(|| format!("Failed to load map layers: {:?}", run.layer_paths.watersheds))?;

    JoinReport::new(&observations, &layers.watersheds).log();

    // Aggregate and select dominant topics
    let summaries = summarize(&observations, &run.periods, &run.style)?;

    if let Some(path) = &run.summary_csv {
        io::results::save_dominant_topics(path, &summaries.dominant)
            .with_context(|| format!("Failed to write summary: {:?}", path))?;
        info!("Dominant topics saved to {}", path.display());
    }

    // Spatial join
    let features = join_topics(
        &layers.watersheds,
        &summaries.assignments,
        &summaries.dominant,
        &run.style,
    );
    let points = precipitation_centroids(&layers.watersheds, &summaries.precipitation);

    info!("Map Configuration:");
    info!("  Window: {}", window_label(&run.periods));
    info!("  Facets: {}", run.periods.len());
    info!("  Watershed features: {}", features.len());
    info!("  Precipitation markers: {}", points.len());

    let figure = MapFigure {
        title: figure_title(&run.periods),
        periods: &run.periods,
        features: &features,
        points: &points,
        layers: &layers,
        style: &run.style,
    };

    // Create progress bar
    let pb = ProgressBar::new(features.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} watersheds ({eta})")?
            .progress_chars("#>-"),
    );

    render_to_file(&run.output, run.format, run.size, &figure, &pb)
        .with_context(|| format!("Failed to render map: {:?}", run.output))?;
    pb.finish_and_clear();

    info!("Map complete. Output saved to {}", run.output.display());
    Ok(())
}
