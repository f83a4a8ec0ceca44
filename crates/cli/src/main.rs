use anyhow::Context;
use clap::Parser;
use optfinder_core::config::Settings;
use optfinder_core::domain::contract::RecommendationInput;
use optfinder_core::ingest::fixture::StaticMarketData;
use optfinder_core::ingest::provider::{HttpJsonMarketData, MarketDataSource};
use optfinder_core::pricing::BlackScholes;
use optfinder_core::time::expiration::ExpirationWindow;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod render;

#[derive(Debug, Parser)]
#[command(name = "optfinder_cli", about = "Recommend option contracts for a price forecast")]
struct Args {
    /// JSON request file. When set, the request flags below are ignored.
    #[arg(long)]
    request_file: Option<PathBuf>,

    /// Underlying ticker, e.g. WMT.
    #[arg(long, required_unless_present = "request_file")]
    ticker: Option<String>,

    /// Expected future price of the underlying.
    #[arg(long, required_unless_present = "request_file")]
    target_price: Option<f64>,

    /// Date the target price is expected to be reached (YYYY-MM-DD).
    #[arg(long, required_unless_present = "request_file")]
    target_date: Option<String>,

    /// Capital budget for the position.
    #[arg(long, required_unless_present = "request_file")]
    max_risk: Option<f64>,

    /// Number of contracts to recommend.
    #[arg(long, default_value_t = 5)]
    contracts: i64,

    /// Annualized interest rate in percent, used for delta.
    #[arg(long, default_value_t = 1.0)]
    interest_rate: f64,

    /// Ranking criterion: Return or Delta.
    #[arg(long, default_value = "Return")]
    rank: String,

    /// Inclusive delta band as LO,HI (required with --rank Delta).
    #[arg(long, value_parser = parse_delta_range)]
    delta_range: Option<(f64, f64)>,

    /// Read chains from a JSON fixture instead of the market data API.
    #[arg(long)]
    chain_file: Option<PathBuf>,

    /// Weekly expirations to collect (default 3).
    #[arg(long)]
    expirations: Option<usize>,

    /// Weekly candidates to try before giving up (default 52).
    #[arg(long)]
    max_attempts: Option<usize>,
}

impl Args {
    fn into_input(self) -> anyhow::Result<(RecommendationInput, Option<PathBuf>, ExpirationWindow)> {
        let mut window = ExpirationWindow::from_env();
        if let Some(n) = self.expirations {
            window.expirations = n;
        }
        if let Some(n) = self.max_attempts {
            window.max_attempts = n;
        }

        let input = match self.request_file {
            Some(path) => RecommendationInput::from_json_file(&path)?,
            None => RecommendationInput {
                ticker: self.ticker.context("--ticker is required")?,
                target_price: self.target_price.context("--target-price is required")?,
                target_date: self.target_date.context("--target-date is required")?,
                max_risk: self.max_risk.context("--max-risk is required")?,
                contract_count: self.contracts,
                interest_rate: self.interest_rate,
                rank: self.rank,
                delta_range: self.delta_range,
            },
        };

        Ok((input, self.chain_file, window))
    }
}

fn parse_delta_range(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LO,HI (got {s:?})"))?;
    let lo = lo.trim().parse::<f64>().map_err(|e| format!("invalid LO: {e}"))?;
    let hi = hi.trim().parse::<f64>().map_err(|e| format!("invalid HI: {e}"))?;
    Ok((lo, hi))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match run(&settings, args).await {
        Ok(text) => {
            print!("{text}");
            Ok(())
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "recommendation failed");
            Err(err)
        }
    }
}

async fn run(settings: &Settings, args: Args) -> anyhow::Result<String> {
    let (input, chain_file, window) = args.into_input()?;
    // Configuration problems surface here, before any market data is requested.
    let request = input.validate_and_into_request()?;
    window.validate()?;

    let source: Box<dyn MarketDataSource> = match chain_file {
        Some(path) => Box::new(StaticMarketData::from_json_file(&path)?),
        None => Box::new(HttpJsonMarketData::from_settings(settings)?),
    };

    tracing::info!(
        ticker = %request.ticker,
        target_price = request.target_price,
        target_date = %request.target_date,
        rank = ?request.rank,
        provider = source.provider_name(),
        "starting recommendation run"
    );

    let rec = optfinder_core::pipeline::recommend(
        source.as_ref(),
        &BlackScholes::new(),
        &request,
        &window,
        chrono::Utc::now(),
    )
    .await?;

    Ok(render::render(&rec))
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
