use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use wallet_types::{PaymentGateway, PaymentStore, PaymentTransaction, WalletStore};

use crate::ReconciliationEngine;

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interval: Duration,
    /// Records younger than this are left to the webhook path.
    pub min_age: Duration,
    pub batch_size: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            min_age: Duration::from_secs(120),
            batch_size: 50,
        }
    }
}

/// Re-verifies payments that never heard back from the gateway.
pub struct ReconciliationSweep<S, G>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    engine: Arc<ReconciliationEngine<S, G>>,
    config: SweepConfig,
}

impl<S, G> ReconciliationSweep<S, G>
where
    S: PaymentStore + WalletStore,
    G: PaymentGateway,
{
    pub fn new(engine: Arc<ReconciliationEngine<S, G>>, config: SweepConfig) -> Self {
        Self { engine, config }
    }

    #[instrument(skip(self))]
    pub async fn run(self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting reconciliation sweep"
        );
        loop {
            sleep(self.config.interval).await;
            self.run_once().await;
        }
    }

    /// One pass over stale unsettled payments and settled payments missing
    /// their credit. Returns how many were brought to a final state.
    pub async fn run_once(&self) -> usize {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(self.config.min_age).unwrap_or(chrono::Duration::zero());

        let mut due = match self.engine.unsettled(cutoff, self.config.batch_size).await {
            Ok(pending) => pending,
            Err(e) => {
                error!("Failed to list unsettled payments: {}", e);
                Vec::new()
            }
        };
        match self.engine.uncredited(cutoff, self.config.batch_size).await {
            Ok(uncredited) => due.extend(uncredited),
            Err(e) => error!("Failed to list uncredited payments: {}", e),
        }
        if due.is_empty() {
            return 0;
        }

        info!("Re-verifying {} payments", due.len());
        let mut settled = 0;
        for tx in due {
            if self.process(tx).await {
                settled += 1;
            }
        }
        settled
    }

    #[instrument(skip(self, tx), fields(reference = %tx.reference))]
    async fn process(&self, tx: PaymentTransaction) -> bool {
        let settled = match self.engine.verify(&tx.reference).await {
            Ok(updated) => updated.status.is_terminal(),
            Err(e) if e.is_retryable() => {
                warn!("Gateway unavailable, will retry next tick: {}", e);
                false
            }
            Err(e) => {
                error!("Sweep verification failed: {}", e);
                false
            }
        };

        // Rotates the record behind the rest of the backlog.
        if let Err(e) = self.engine.mark_checked(&tx.reference).await {
            warn!("Failed to record sweep attempt: {}", e);
        }
        settled
    }
}
