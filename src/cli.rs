use crate::config::{OutputFormat, Period, StyleConfig, check_unique_labels};
use crate::layers::LayerPaths;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Map the dominant social-media topic of every watershed, with
/// precipitation markers, rivers and cities.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding observations.csv and geometry/*.geojson
    data_dir: PathBuf,

    /// Figure to write, .png or .svg
    #[arg(short, long, default_value = "dominant_topics.png")]
    output: PathBuf,

    /// Facet window, repeatable (default Overall=2021-07-07..2021-07-27)
    #[arg(short, long = "period", value_name = "LABEL=START..END")]
    periods: Vec<Period>,

    /// JSON file overriding the palette, topic order and marker sizes
    #[arg(long)]
    style: Option<PathBuf>,

    /// Also write the dominant-topic table to this CSV file
    #[arg(long)]
    summary_csv: Option<PathBuf>,

    /// Figure width in pixels
    #[arg(long, default_value_t = 1600)]
    width: u32,

    /// Figure height in pixels
    #[arg(long, default_value_t = 1000)]
    height: u32,
}

// Resolved settings for one run
#[derive(Debug)]
pub struct RunConfig {
    pub observations_csv: PathBuf,
    pub layer_paths: LayerPaths,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub periods: Vec<Period>,
    pub style: StyleConfig,
    pub summary_csv: Option<PathBuf>,
    pub size: (u32, u32),
}

pub fn get_args() -> Result<RunConfig> {
    resolve(Args::parse())
}

fn resolve(args: Args) -> Result<RunConfig> {
    let format = OutputFormat::from_path(&args.output)?;

    let style = match &args.style {
        Some(path) => StyleConfig::from_json_file(path)
            .with_context(|| format!("Failed to load style file: {:?}", path))?,
        None => StyleConfig::default(),
    };

    let periods = if args.periods.is_empty() {
        vec![Period::default()]
    } else {
        args.periods
    };
    check_unique_labels(&periods)?;

    Ok(RunConfig {
        observations_csv: args.data_dir.join("observations.csv"),
        layer_paths: LayerPaths::in_dir(&args.data_dir),
        output: args.output,
        format,
        periods,
        style,
        summary_csv: args.summary_csv,
        size: (args.width, args.height),
    })
}
