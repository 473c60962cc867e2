use std::{str::FromStr, sync::Arc};

use alloy::primitives::Address;
use anyhow::{Result, anyhow};
use serde::Serialize;
use tracing::info;

use crate::{
    account::{AccountBook, L2_ORACLE, L2_OWNER, TOKEN_OWNER},
    address::qtum_to_ethereum,
    cfg::{FundingConfig, TokenSpec},
    client::{Chain, ChainClient, ContractKind, Submission},
    contracts::ConstructorArg,
    error::DeployError,
    funding::{self, FundingReport},
    plan::Stage,
    poller::ConfirmationPoller,
};

/// Everything the orchestrator knows about one chain.
pub struct ChainContext {
    pub client: Arc<dyn ChainClient>,
    pub accounts: AccountBook,
    pub tokens: Vec<TokenSpec>,
    pub funding: Option<FundingConfig>,
}

impl ChainContext {
    fn chain(&self) -> Chain {
        self.client.chain()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentRecord {
    pub chain: Chain,
    pub contract: ContractKind,
    /// Token symbol, or the contract name for everything else.
    pub label: String,
    pub address: Address,
    pub tx_id: String,
    pub gas_used: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub deployments: Vec<DeploymentRecord>,
    pub funding: Vec<FundingReport>,
}

impl Report {
    /// Deployments of `kind` on `chain`, in the order they happened.
    pub fn addresses(&self, chain: Chain, kind: ContractKind) -> Vec<Address> {
        self.deployments
            .iter()
            .filter(|d| d.chain == chain && d.contract == kind)
            .map(|d| d.address)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    pub chain: Chain,
    pub role: String,
    pub address: String,
    pub balance: String,
}

pub struct Orchestrator {
    ethereum: ChainContext,
    qtum: ChainContext,
    poller: ConfirmationPoller,
}

impl Orchestrator {
    pub fn new(ethereum: ChainContext, qtum: ChainContext, poller: ConfirmationPoller) -> Self {
        Self {
            ethereum,
            qtum,
            poller,
        }
    }

    /// Runs `stages` in order. The first failed step aborts the run; whatever already
    /// landed on chain stays there.
    pub async fn run(&self, stages: &[Stage]) -> Result<Report> {
        let mut report = Report::default();
        for stage in stages {
            info!("Stage {stage}");
            match stage {
                Stage::FundEthereum => report.funding.push(self.fund(&self.ethereum).await?),
                Stage::FundQtum => report.funding.push(self.fund(&self.qtum).await?),
                Stage::EthereumTokens => report
                    .deployments
                    .extend(self.deploy_tokens(&self.ethereum).await?),
                Stage::QtumTokens => report
                    .deployments
                    .extend(self.deploy_tokens(&self.qtum).await?),
                Stage::QtumSettlement => report
                    .deployments
                    .extend(self.deploy_qtum_settlement().await?),
                Stage::EthereumSettlement => report
                    .deployments
                    .push(self.deploy_ethereum_settlement().await?),
            }
        }
        Ok(report)
    }

    pub async fn fund(&self, ctx: &ChainContext) -> Result<FundingReport> {
        info!("[{}] Funding test accounts", ctx.chain());
        funding::fund(ctx.client.as_ref(), &ctx.accounts, ctx.funding.as_ref()).await
    }

    /// Deploys every configured token of the chain, one after the other, each
    /// confirmed before the next is sent.
    pub async fn deploy_tokens(&self, ctx: &ChainContext) -> Result<Vec<DeploymentRecord>> {
        let owner = ctx.accounts.get(TOKEN_OWNER)?;
        let mut records = Vec::with_capacity(ctx.tokens.len());
        for token in &ctx.tokens {
            info!(
                "[{}] Deploying token {} ({}, {} decimals)",
                ctx.chain(),
                token.symbol,
                token.name,
                token.decimals
            );
            let submission = ctx.client.deploy_token(token, owner).await?;
            records.push(
                self.confirm(ctx, ContractKind::Token, &token.symbol, submission)
                    .await?,
            );
        }
        Ok(records)
    }

    /// Deploys the recovery helper, then the settlement contract wired to it and to
    /// the oracle. Returns both records, helper first.
    pub async fn deploy_qtum_settlement(&self) -> Result<Vec<DeploymentRecord>> {
        let ctx = &self.qtum;
        let owner = ctx.accounts.get(L2_OWNER)?;
        let oracle_account = ctx.accounts.get(L2_ORACLE)?;
        let oracle = qtum_to_ethereum(&oracle_account.address)?;
        info!(
            "[{}] Oracle {} is {oracle} in Ethereum format",
            ctx.chain(),
            oracle_account.address
        );

        let helper_label = ContractKind::RecoveryHelper.to_string();
        info!("[{}] Deploying {helper_label}", ctx.chain());
        let submission = ctx
            .client
            .deploy_contract(ContractKind::RecoveryHelper, vec![], owner)
            .await?;
        let helper = self
            .confirm(ctx, ContractKind::RecoveryHelper, &helper_label, submission)
            .await?;

        info!(
            "[{}] Deploying settlement (oracle {oracle}, {helper_label} {})",
            ctx.chain(),
            helper.address
        );
        let args = vec![
            ConstructorArg::Address(oracle),
            ConstructorArg::Address(helper.address),
        ];
        let submission = ctx
            .client
            .deploy_contract(ContractKind::Settlement, args, owner)
            .await?;
        let settlement = self
            .confirm(ctx, ContractKind::Settlement, "settlement", submission)
            .await?;

        Ok(vec![helper, settlement])
    }

    pub async fn deploy_ethereum_settlement(&self) -> Result<DeploymentRecord> {
        let ctx = &self.ethereum;
        let owner = ctx.accounts.get(L2_OWNER)?;
        let oracle_account = ctx.accounts.get(L2_ORACLE)?;
        let oracle = Address::from_str(&oracle_account.address).map_err(|e| {
            DeployError::InvalidAddress {
                address: oracle_account.address.clone(),
                reason: e.to_string(),
            }
        })?;

        info!("[{}] Deploying settlement (oracle {oracle})", ctx.chain());
        let submission = ctx
            .client
            .deploy_contract(
                ContractKind::Settlement,
                vec![ConstructorArg::Address(oracle)],
                owner,
            )
            .await?;
        self.confirm(ctx, ContractKind::Settlement, "settlement", submission)
            .await
    }

    /// Native balances of every configured account on both chains.
    pub async fn balances(&self) -> Result<Vec<AccountBalance>> {
        let mut balances = vec![];
        for ctx in [&self.ethereum, &self.qtum] {
            for account in ctx.accounts.iter() {
                let balance = ctx.client.balance(&account.address).await?;
                balances.push(AccountBalance {
                    chain: ctx.chain(),
                    role: account.role.clone(),
                    address: account.address.clone(),
                    balance,
                });
            }
        }
        Ok(balances)
    }

    /// Waits for `submission` and checks its receipt. Only a successful receipt
    /// yields a record, so a failed contract's address never reaches a later step.
    async fn confirm(
        &self,
        ctx: &ChainContext,
        contract: ContractKind,
        label: &str,
        submission: Submission,
    ) -> Result<DeploymentRecord> {
        let chain = ctx.chain();
        let predicted = submission.contract_address;
        let receipt = ctx
            .client
            .await_confirmation(submission, &self.poller)
            .await?;
        receipt.ensure_success(chain, &format!("deploy {label}"))?;

        let address = predicted.or(receipt.contract_address).ok_or_else(|| {
            anyhow!(
                "[{chain}] {label} receipt {} has no contract address",
                receipt.tx_id
            )
        })?;
        info!(
            "[{chain}] {label} deployed at {address} (tx {}, gas used {})",
            receipt.tx_id, receipt.gas_used
        );

        Ok(DeploymentRecord {
            chain,
            contract,
            label: label.to_owned(),
            address,
            tx_id: receipt.tx_id,
            gas_used: receipt.gas_used,
        })
    }
}
