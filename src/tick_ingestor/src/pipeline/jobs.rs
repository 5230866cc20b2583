//! The two per-window jobs a run can drive.

use async_trait::async_trait;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    aggregate::{aggregate_quotes, aggregate_trades, assess_window},
    lookback::join_lookback,
    models::{bar::MergedBar, joined::LookbackJoinedRecord, window::FetchWindow},
    pipeline::{PipelineError, WindowJob, merge::outer_merge, table::WindowOutput},
    providers::TickSource,
};

/// Fetch trades and quotes, aggregate each into bars, outer-merge them.
pub struct IntradayBarsJob<S> {
    pub source: S,
    pub symbol: String,
    pub interval_minutes: u32,
    pub timezone: String,
    /// Trade count below which the window is reported as low confidence.
    pub min_ticks: usize,
}

#[async_trait]
impl<S: TickSource> WindowJob for IntradayBarsJob<S> {
    type Row = MergedBar;

    fn name(&self) -> &'static str {
        "intraday_bars"
    }

    async fn run(&self, window: &FetchWindow) -> Result<WindowOutput<MergedBar>, PipelineError> {
        let trades = self.source.fetch_trades(&self.symbol, &window.filter).await;
        let quotes = self.source.fetch_quotes(&self.symbol, &window.filter).await;
        info!(
            window = %window.label,
            trades = trades.records.len(),
            trade_stop = %trades.stop,
            quotes = quotes.records.len(),
            quote_stop = %quotes.stop,
            "window fetched"
        );

        let quality = assess_window(trades.records.len(), self.min_ticks);
        if quality.is_low_confidence() {
            warn!(
                window = %window.label,
                tick_count = trades.records.len(),
                min_expected = self.min_ticks,
                "low-confidence window: too few trades"
            );
        }

        let trade_bars = aggregate_trades(&trades.records, self.interval_minutes, &self.timezone)?;
        let quote_bars = aggregate_quotes(&quotes.records, self.interval_minutes, &self.timezone)?;
        let ticks = trades.records.len() + quotes.records.len();

        Ok(WindowOutput::new(outer_merge(trade_bars, quote_bars), ticks).with_quality(quality))
    }
}

/// Fetch trades and join each to its lookback trade.
pub struct TradeMomentumJob<S> {
    pub source: S,
    pub symbol: String,
    pub offset_minutes: u32,
    pub threshold: Decimal,
    pub timezone: Tz,
}

#[async_trait]
impl<S: TickSource> WindowJob for TradeMomentumJob<S> {
    type Row = LookbackJoinedRecord;

    fn name(&self) -> &'static str {
        "trade_momentum"
    }

    async fn run(
        &self,
        window: &FetchWindow,
    ) -> Result<WindowOutput<LookbackJoinedRecord>, PipelineError> {
        let trades = self.source.fetch_trades(&self.symbol, &window.filter).await;
        info!(
            window = %window.label,
            trades = trades.records.len(),
            stop = %trades.stop,
            "window fetched"
        );

        let ticks = trades.records.len();
        let joined = join_lookback(
            &trades.records,
            self.offset_minutes,
            self.threshold,
            self.timezone,
        );
        Ok(WindowOutput::new(joined, ticks))
    }
}
