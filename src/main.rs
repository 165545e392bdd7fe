use clap::Parser;
use forecast_enrich::chart::{ChartGenerator, ChartStyle, DirectorySink};
use forecast_enrich::config::Config;
use forecast_enrich::credentials::EnvCredentials;
use forecast_enrich::fetcher::Fetcher;
use forecast_enrich::pipeline::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// City name or ZIP code; omit to print the empty view
    location: Option<String>,

    /// Number of forecast days (unparseable values fall back to `default_days`)
    #[arg(short, long)]
    days: Option<String>,

    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,forecast_enrich=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = Config::load_or_default(&args.config).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {}: {}",
            args.config.display(),
            e
        )
    })?;
    info!(
        "Configuration loaded (provider {}, charts in {})",
        config.provider.base_url,
        config.charts.output_dir.display()
    );

    let credentials = Arc::new(EnvCredentials::new(config.provider.api_key_env.clone()));
    let fetcher = Fetcher::new(&config.provider, credentials)?;

    let style = ChartStyle::from(&config.charts);
    let sink = Arc::new(DirectorySink::new(&config.charts.output_dir));
    let charts = ChartGenerator::new(style, sink);

    let pipeline = Pipeline::new(fetcher, charts, config.default_days);
    let result = pipeline
        .run(args.location.as_deref(), args.days.as_deref())
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
