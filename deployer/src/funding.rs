use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    account::{Account, AccountBook},
    cfg::FundingConfig,
    client::{Chain, ChainClient},
};

/// What to do when one transfer of a funding round fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FundingPolicy {
    /// Stop at the first failed transfer.
    #[default]
    FailFast,
    /// Record the failure and carry on with the remaining recipients.
    BestEffort,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub role: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FundingReport {
    pub chain: Chain,
    pub amount: String,
    pub transfers: Vec<TransferOutcome>,
}

impl FundingReport {
    pub fn failures(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.transfers.iter().filter(|t| t.error.is_some())
    }
}

/// A funding round with every role already looked up, so a typo in the recipient
/// list fails before the first coin moves.
#[derive(Debug, Clone)]
pub struct FundingPlan {
    pub amount: String,
    pub sender: Option<Account>,
    pub recipients: Vec<Account>,
    pub policy: FundingPolicy,
}

impl FundingPlan {
    pub fn new(config: &FundingConfig, accounts: &AccountBook) -> Result<Self> {
        let sender = config
            .sender
            .as_deref()
            .map(|role| accounts.get(role).cloned())
            .transpose()?;
        let recipients = config
            .recipients
            .iter()
            .map(|role| accounts.get(role).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            amount: config.amount.clone(),
            sender,
            recipients,
            policy: config.policy,
        })
    }

    /// Sends `amount` to each recipient in order. Transfers are not awaited, so the
    /// report lists submitted transaction ids only.
    pub async fn execute(&self, client: &dyn ChainClient) -> Result<FundingReport> {
        let chain = client.chain();
        let mut report = FundingReport {
            chain,
            amount: self.amount.clone(),
            transfers: Vec::with_capacity(self.recipients.len()),
        };

        for recipient in &self.recipients {
            let result = client
                .transfer(&self.amount, &recipient.address, self.sender.as_ref())
                .await;
            let mut outcome = TransferOutcome {
                role: recipient.role.clone(),
                address: recipient.address.clone(),
                tx_id: None,
                error: None,
            };
            match result {
                Ok(tx_id) => {
                    info!(
                        "[{chain}] Funded {} ({}) with {}: {tx_id}",
                        recipient.role, recipient.address, self.amount
                    );
                    outcome.tx_id = Some(tx_id);
                }
                Err(e) if self.policy == FundingPolicy::BestEffort => {
                    warn!(
                        "[{chain}] Funding {} ({}) failed: {e:#}",
                        recipient.role, recipient.address
                    );
                    outcome.error = Some(format!("{e:#}"));
                }
                Err(e) => {
                    return Err(e.context(format!(
                        "[{chain}] funding {} ({}) failed",
                        recipient.role, recipient.address
                    )));
                }
            }
            report.transfers.push(outcome);
        }

        let failed = report.failures().count();
        if failed > 0 {
            warn!(
                "[{chain}] {failed} of {} transfers failed",
                report.transfers.len()
            );
        }
        Ok(report)
    }
}

/// Resolves `config` against `accounts` and runs it.
pub async fn fund(
    client: &dyn ChainClient,
    accounts: &AccountBook,
    config: Option<&FundingConfig>,
) -> Result<FundingReport> {
    let chain = client.chain();
    let config = config.ok_or_else(|| anyhow!("[{chain}] no funding configured"))?;
    FundingPlan::new(config, accounts)?.execute(client).await
}
