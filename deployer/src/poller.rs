use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    cfg::PollingConfig,
    client::{ChainClient, Receipt},
    error::DeployError,
};

/// Turns a submit-only chain API into submit-and-confirm by asking for the receipt
/// until one shows up.
#[derive(Debug, Clone)]
pub struct ConfirmationPoller {
    interval: Duration,
    max_attempts: u32,
}

impl ConfirmationPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.interval(), config.max_attempts)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the first receipt the chain reports for `tx_id`. The receipt may
    /// describe a failed transaction; checking it is the caller's job.
    pub async fn await_inclusion<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        tx_id: &str,
    ) -> Result<Receipt> {
        let chain = client.chain();
        for attempt in 1..=self.max_attempts {
            match client.fetch_receipt(tx_id).await {
                Ok(Some(receipt)) => {
                    debug!("[{chain}] {tx_id} included after {attempt} attempt(s)");
                    return Ok(receipt);
                }
                Ok(None) => debug!("[{chain}] {tx_id} not yet included ({attempt})"),
                // Not distinguishable from a missing receipt; try again.
                Err(e) => warn!("[{chain}] fetching receipt for {tx_id} failed ({attempt}): {e:#}"),
            }
            if attempt < self.max_attempts {
                sleep(self.interval).await;
            }
        }

        Err(DeployError::TimedOut {
            chain,
            tx_id: tx_id.to_owned(),
            attempts: self.max_attempts,
        }
        .into())
    }
}
