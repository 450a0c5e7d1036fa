use std::path::PathBuf;
use std::process;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use elia_balancing::{
    render_day, CachedFetcher, DayLoader, EliaClient, Report, Settings, SvgRenderer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "elia-balancing")]
#[command(about = "Charts Elia balancing and imbalance data for one day")]
#[command(version)]
struct Cli {
    /// Day to chart (YYYY-MM-DD), today in the configured timezone by default
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Configuration file, `elia.toml` is read when present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory, overrides `output_dir`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only write the HTML report
    #[arg(long)]
    no_files: bool,
}

#[tokio::main]
async fn main() {
    setup_tracing();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("{:?}", err);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let zone = settings.zone()?;
    let date = cli
        .date
        .unwrap_or_else(|| Utc::now().with_timezone(&zone).date_naive());
    let output_dir = cli.output.unwrap_or_else(|| settings.output_dir.clone());

    let client = EliaClient::new(&settings.api_url).with_rows(settings.rows);
    let loader = DayLoader::new(CachedFetcher::new(client, settings.cache_policy()), zone);

    info!(%date, timezone = zone.name(), "loading balancing data");
    let day = loader
        .load_day(&settings.catalog(), date)
        .await
        .context("Error fetching data")?;

    let mut renderer = SvgRenderer::new(settings.chart_size());
    if !cli.no_files {
        renderer = renderer.with_output_dir(&output_dir);
    }

    let (charts, warnings) = render_day(&mut renderer, &day);
    for warning in &warnings {
        warn!("{}", warning);
    }
    info!(charts = charts.len(), "charts rendered");

    let report_path = output_dir.join(format!("{date}.html"));
    Report::new(&day.window, charts, warnings).write(&report_path)?;
    info!(path = %report_path.display(), "report written");

    Ok(())
}

fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();
}
