//! Run orchestration: drive a [`WindowJob`] over a sequence of fetch windows and
//! accumulate the rows into a [`MasterTable`].
//!
//! Windows are processed strictly one after another. A window whose job returns
//! an error is logged and recorded as skipped; the run always continues. A fixed
//! throttle delay separates consecutive windows.

pub mod jobs;
pub mod merge;
pub mod table;
pub mod windows;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    aggregate::AggregateError,
    models::window::FetchWindow,
    providers::sleep::{Sleeper, TokioSleeper},
};

pub use jobs::{IntradayBarsJob, TradeMomentumJob};
pub use table::{MasterTable, SkippedWindow, WindowOutput, WindowSummary};

/// Default pause between two windows.
pub const DEFAULT_INTER_WINDOW_DELAY: Duration = Duration::from_secs(12);

/// Failure of one window's job. Never aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),
}

/// Fetch and derive the rows for one window.
#[async_trait]
pub trait WindowJob: Send + Sync {
    type Row: Send;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, window: &FetchWindow) -> Result<WindowOutput<Self::Row>, PipelineError>;
}

pub struct RunOrchestrator<S = TokioSleeper> {
    throttle: Duration,
    sleeper: S,
}

impl RunOrchestrator {
    pub fn new(throttle: Duration) -> Self {
        Self::with_sleeper(throttle, TokioSleeper)
    }
}

impl<S: Sleeper> RunOrchestrator<S> {
    pub fn with_sleeper(throttle: Duration, sleeper: S) -> Self {
        Self { throttle, sleeper }
    }

    pub async fn run<J: WindowJob>(&self, windows: &[FetchWindow], job: &J) -> MasterTable<J::Row> {
        let mut table = MasterTable::new();
        let total = windows.len();

        for (index, window) in windows.iter().enumerate() {
            if index > 0 && !self.throttle.is_zero() {
                debug!(delay_secs = self.throttle.as_secs(), "throttling before next window");
                self.sleeper.sleep(self.throttle).await;
            }

            info!(job = job.name(), window = %window.label, index = index + 1, total, "processing window");
            match job.run(window).await {
                Ok(output) => {
                    info!(
                        job = job.name(),
                        window = %window.label,
                        rows = output.rows.len(),
                        ticks = output.ticks,
                        "window done"
                    );
                    table.append(window.label.clone(), output);
                }
                Err(e) => {
                    error!(job = job.name(), window = %window.label, error = %e, "window failed; skipping");
                    table.skip(window.label.clone(), e.to_string());
                }
            }
        }

        if !table.skipped().is_empty() {
            warn!(job = job.name(), skipped = table.skipped().len(), total, "some windows were skipped");
        }
        info!(job = job.name(), rows = table.len(), windows = total, "run finished");
        table
    }
}
