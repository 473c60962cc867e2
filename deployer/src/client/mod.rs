use std::fmt;

use alloy::primitives::{Address, U256};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::{
    account::Account,
    cfg::TokenSpec,
    contracts::{Artifact, ConstructorArg},
    error::DeployError,
    poller::ConfirmationPoller,
};

pub mod ethereum;
pub mod qtum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Qtum,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Chain::Ethereum => "ETHEREUM",
                Chain::Qtum => "QTUM",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Token,
    Settlement,
    RecoveryHelper,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ContractKind::Token => "token",
                ContractKind::Settlement => "settlement",
                ContractKind::RecoveryHelper => "ECRecoverPublicKey",
            }
        )
    }
}

/// The compiled contracts a client can deploy.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    artifacts: Vec<Artifact>,
}

impl Artifacts {
    pub fn new(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        Self {
            artifacts: artifacts.into_iter().collect(),
        }
    }

    pub fn get(&self, chain: Chain, kind: ContractKind) -> Result<&Artifact, DeployError> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.kind == kind)
            .ok_or(DeployError::MissingArtifact {
                chain,
                contract: kind,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReceiptStatus {
    Success,
    /// The EVM status flag was false.
    Reverted,
    /// Qtum's `excepted` field held something other than `None`.
    Excepted(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub tx_id: String,
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub status: ReceiptStatus,
    /// The receipt exactly as the chain returned it.
    pub raw: serde_json::Value,
}

impl Receipt {
    pub fn ensure_success(&self, chain: Chain, operation: &str) -> Result<(), DeployError> {
        match &self.status {
            ReceiptStatus::Success => Ok(()),
            ReceiptStatus::Reverted => Err(DeployError::Rejected {
                chain,
                operation: operation.to_owned(),
                receipt: Box::new(self.clone()),
            }),
            ReceiptStatus::Excepted(excepted) => Err(DeployError::Excepted {
                chain,
                operation: operation.to_owned(),
                excepted: excepted.clone(),
                receipt: Box::new(self.clone()),
            }),
        }
    }
}

/// What a chain hands back on submission. Chains that wait for inclusion fill in
/// `receipt`; the others only know the transaction id and the address the contract
/// will get.
#[derive(Debug, Clone)]
pub struct Submission {
    pub tx_id: String,
    pub contract_address: Option<Address>,
    pub receipt: Option<Receipt>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain(&self) -> Chain;

    async fn deploy_contract(
        &self,
        contract: ContractKind,
        args: Vec<ConstructorArg>,
        creator: &Account,
    ) -> Result<Submission>;

    async fn deploy_token(&self, token: &TokenSpec, creator: &Account) -> Result<Submission> {
        let args = vec![
            ConstructorArg::Text(token.name.clone()),
            ConstructorArg::Text(token.symbol.clone()),
            ConstructorArg::Uint(U256::from(token.decimals)),
        ];
        self.deploy_contract(ContractKind::Token, args, creator)
            .await
    }

    /// Sends native currency without waiting for inclusion and returns the
    /// transaction id.
    async fn transfer(
        &self,
        amount: &str,
        recipient: &str,
        sender: Option<&Account>,
    ) -> Result<String>;

    /// Native balance of `address`, formatted in whole coins.
    async fn balance(&self, address: &str) -> Result<String>;

    /// `None` until the transaction is included.
    async fn fetch_receipt(&self, tx_id: &str) -> Result<Option<Receipt>>;

    async fn await_confirmation(
        &self,
        submission: Submission,
        poller: &ConfirmationPoller,
    ) -> Result<Receipt> {
        match submission.receipt {
            Some(receipt) => Ok(receipt),
            None => poller.await_inclusion(self, &submission.tx_id).await,
        }
    }
}
