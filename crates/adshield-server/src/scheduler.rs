use tokio::time::{interval, Duration};

use crate::batch::BatchOptions;
use crate::digest::run_digest_batch;
use crate::spend::run_spend_digest;
use crate::state::AppState;

/// Interval loop driving the daily digest. The per-company digest-hour gate
/// makes frequent ticks safe: a company only sends in its configured local
/// hour, and the run ledger caps it at once per business day.
pub struct DigestScheduler {
    state: AppState,
    tick_secs: u64,
}

impl DigestScheduler {
    pub fn new(state: AppState, tick_secs: u64) -> Self {
        Self { state, tick_secs }
    }

    pub async fn run(&self) {
        tracing::info!(tick_secs = self.tick_secs, "Digest scheduler started");
        let mut tick = interval(Duration::from_secs(self.tick_secs));
        loop {
            tick.tick().await;
            let opts = BatchOptions::live(false, false);
            match run_digest_batch(&self.state, &opts).await {
                Ok(summary) if summary.sent > 0 => {
                    tracing::info!(sent = summary.sent, "Digest cycle delivered");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Digest cycle failed"),
            }
        }
    }
}

/// Interval loop driving the spend digest; ledger-guarded the same way.
pub struct SpendScheduler {
    state: AppState,
    tick_secs: u64,
}

impl SpendScheduler {
    pub fn new(state: AppState, tick_secs: u64) -> Self {
        Self { state, tick_secs }
    }

    pub async fn run(&self) {
        tracing::info!(tick_secs = self.tick_secs, "Spend scheduler started");
        let mut tick = interval(Duration::from_secs(self.tick_secs));
        loop {
            tick.tick().await;
            let opts = BatchOptions::live(false, false);
            match run_spend_digest(&self.state, &opts).await {
                Ok(summary) if summary.sent > 0 => {
                    tracing::info!(sent = summary.sent, "Spend cycle delivered");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Spend cycle failed"),
            }
        }
    }
}
