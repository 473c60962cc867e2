use std::{collections::HashSet, str::FromStr};

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, TxHash, U256, utils::format_ether},
    providers::{Provider, ProviderBuilder},
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, info};

use super::{Artifacts, Chain, ChainClient, ContractKind, Receipt, ReceiptStatus, Submission};
use crate::{
    account::{Account, AccountBook},
    cfg::EthereumConfig,
    contracts::{Artifact, ConstructorArg},
};

/// Client for the EVM chain. Submissions are signed locally and wait for the
/// receipt, so every `Submission` it returns is already confirmed.
#[derive(Debug, Clone)]
pub struct EthereumClient<P> {
    provider: P,
    artifacts: Artifacts,
    signers: HashSet<Address>,
    gas_limit: u64,
    gas_price: u128,
    transfer_gas_limit: u64,
}

/// Loads the contract artifacts and builds a provider whose wallet can sign for
/// every account in `accounts` that has a private key.
pub fn connect(
    config: &EthereumConfig,
    accounts: &AccountBook,
) -> Result<EthereumClient<impl Provider + Clone + 'static>> {
    let artifacts = Artifacts::new([
        Artifact::load(ContractKind::Token, &config.contracts.token)?,
        Artifact::load(ContractKind::Settlement, &config.contracts.settlement)?,
    ]);

    let mut wallet = EthereumWallet::default();
    let mut signers = HashSet::new();
    for account in accounts.iter() {
        let Some(key) = account.private_key.as_deref() else {
            continue;
        };
        let signer = PrivateKeySigner::from_str(key)
            .with_context(|| format!("Invalid private key for Ethereum role {}", account.role))?;
        info!("Ethereum signer for {}: {}", account.role, signer.address());
        signers.insert(signer.address());
        wallet.register_signer(signer);
    }

    let provider = ProviderBuilder::new()
        .wallet(wallet)
        .on_http(config.rpc_url.clone());

    Ok(EthereumClient {
        provider,
        artifacts,
        signers,
        gas_limit: config.gas_limit,
        gas_price: config.gas_price,
        transfer_gas_limit: config.transfer_gas_limit,
    })
}

impl<P: Provider> EthereumClient<P> {
    fn signer_address(&self, account: &Account) -> Result<Address> {
        let address = parse_address(&account.address)?;
        if !self.signers.contains(&address) {
            return Err(anyhow!(
                "No private key for Ethereum role {} ({address})",
                account.role
            ));
        }
        Ok(address)
    }

    /// Fills in the sender's current nonce and the configured legacy gas settings.
    async fn prepare(
        &self,
        from: Address,
        tx: TransactionRequest,
        gas_limit: u64,
    ) -> Result<TransactionRequest> {
        // Transfers are not awaited, so the count has to include the pool.
        let nonce = self.provider.get_transaction_count(from).pending().await?;
        debug!("[{}] {from} nonce {nonce}", Chain::Ethereum);
        Ok(tx
            .with_from(from)
            .with_nonce(nonce)
            .with_gas_limit(gas_limit)
            .with_gas_price(self.gas_price))
    }
}

#[async_trait]
impl<P: Provider + 'static> ChainClient for EthereumClient<P> {
    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    async fn deploy_contract(
        &self,
        contract: ContractKind,
        args: Vec<ConstructorArg>,
        creator: &Account,
    ) -> Result<Submission> {
        let code = self
            .artifacts
            .get(Chain::Ethereum, contract)?
            .deployment_code(&args)?;
        let from = self.signer_address(creator)?;

        let tx = TransactionRequest::default()
            .with_deploy_code(code)
            .with_value(U256::ZERO);
        let tx = self.prepare(from, tx, self.gas_limit).await?;

        let pending = self.provider.send_transaction(tx).await?;
        debug!("[{}] {contract} creation sent: {}", Chain::Ethereum, pending.tx_hash());
        let receipt = into_receipt(pending.get_receipt().await?)?;

        Ok(Submission {
            tx_id: receipt.tx_id.clone(),
            contract_address: receipt.contract_address,
            receipt: Some(receipt),
        })
    }

    async fn transfer(
        &self,
        amount: &str,
        recipient: &str,
        sender: Option<&Account>,
    ) -> Result<String> {
        let sender = sender.context("Ethereum transfers need a sending account")?;
        let from = self.signer_address(sender)?;
        let value = U256::from_str(amount)
            .with_context(|| format!("Invalid wei amount {amount}"))?;

        let tx = TransactionRequest::default()
            .with_to(parse_address(recipient)?)
            .with_value(value);
        let tx = self.prepare(from, tx, self.transfer_gas_limit).await?;

        let pending = self.provider.send_transaction(tx).await?;
        Ok(pending.tx_hash().to_string())
    }

    async fn balance(&self, address: &str) -> Result<String> {
        let balance = self.provider.get_balance(parse_address(address)?).await?;
        Ok(format_ether(balance))
    }

    async fn fetch_receipt(&self, tx_id: &str) -> Result<Option<Receipt>> {
        let hash = TxHash::from_str(tx_id)
            .with_context(|| format!("Invalid transaction hash {tx_id}"))?;
        self.provider
            .get_transaction_receipt(hash)
            .await?
            .map(into_receipt)
            .transpose()
    }
}

fn parse_address(address: &str) -> Result<Address> {
    Address::from_str(address).with_context(|| format!("Invalid Ethereum address {address}"))
}

fn into_receipt(receipt: TransactionReceipt) -> Result<Receipt> {
    let status = if receipt.status() {
        ReceiptStatus::Success
    } else {
        ReceiptStatus::Reverted
    };
    Ok(Receipt {
        tx_id: receipt.transaction_hash.to_string(),
        contract_address: receipt.contract_address,
        gas_used: receipt.gas_used,
        status,
        raw: serde_json::to_value(&receipt)?,
    })
}
