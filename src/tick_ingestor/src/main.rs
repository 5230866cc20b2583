use std::{io::BufWriter, num::NonZeroU32};

use anyhow::{Context, bail};
use clap::Parser;
use serde::Serialize;
use tick_ingestor::{
    aggregate::WindowQuality,
    cli::commands::{Cli, Commands},
    config::PipelineConfig,
    io::sink::{DataSink, JsonLinesSink},
    models::window::FetchWindow,
    pipeline::{
        IntradayBarsJob, MasterTable, RunOrchestrator, TradeMomentumJob, WindowJob,
        windows::{intraday_windows, session_windows},
    },
    providers::polygon_rest::PagedFetcher,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => PipelineConfig::load_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(symbol) = cli.symbol {
        cfg.symbol = symbol;
        cfg.validate()?;
    }
    let tz = cfg.tz()?;

    let client = cfg.client_config().context("configuring HTTP client")?;
    let fetcher = PagedFetcher::new(client).context("building HTTP client")?;
    let orchestrator = RunOrchestrator::new(cfg.inter_window_delay());

    match cli.command {
        Commands::Bars { day } => {
            let step = NonZeroU32::new(cfg.interval_minutes).context("interval_minutes must be positive")?;
            let windows = intraday_windows(day, cfg.market_open, cfg.market_close, step, tz);
            let job = IntradayBarsJob {
                source: fetcher,
                symbol: cfg.symbol.clone(),
                interval_minutes: cfg.interval_minutes,
                timezone: cfg.timezone.clone(),
                min_ticks: cfg.min_ticks_per_window,
            };
            run_and_flush(&orchestrator, &windows, &job).await
        }
        Commands::Momentum { from, to } => {
            if to < from {
                bail!("--to ({to}) is before --from ({from})");
            }
            let windows = session_windows(
                from,
                to,
                cfg.momentum_session_start,
                cfg.momentum_session_minutes,
                tz,
            );
            let job = TradeMomentumJob {
                source: fetcher,
                symbol: cfg.symbol.clone(),
                offset_minutes: cfg.lookback_minutes,
                threshold: cfg.signal_threshold,
                timezone: tz,
            };
            run_and_flush(&orchestrator, &windows, &job).await
        }
    }
}

/// Run `job` over `windows`, write the table to stdout once, summarize on stderr.
async fn run_and_flush<J>(
    orchestrator: &RunOrchestrator,
    windows: &[FetchWindow],
    job: &J,
) -> anyhow::Result<()>
where
    J: WindowJob,
    J::Row: Serialize + Sync,
{
    info!(job = job.name(), windows = windows.len(), "starting run");
    let table = orchestrator.run(windows, job).await;

    let sink = JsonLinesSink::new(BufWriter::new(std::io::stdout()));
    let written = sink.write(table.rows()).await.context("writing rows to stdout")?;

    print_summary(job.name(), windows.len(), written, &table);
    Ok(())
}

fn print_summary<R>(job: &str, windows: usize, written: usize, table: &MasterTable<R>) {
    eprintln!("{job}: {written} rows from {windows} windows");
    for skipped in table.skipped() {
        eprintln!("  skipped {}: {}", skipped.label, skipped.reason);
    }
    for low in table.low_confidence_windows() {
        if let Some(WindowQuality::LowConfidence { tick_count, min_expected }) = low.quality {
            eprintln!("  low confidence {}: {tick_count} trades (expected {min_expected})", low.label);
        }
    }
}
