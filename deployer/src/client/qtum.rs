use std::{
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use alloy::primitives::{
    Address, U256,
    utils::{format_units, parse_units},
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Number, Value, json};
use tracing::{debug, trace};
use url::Url;

use super::{Artifacts, Chain, ChainClient, ContractKind, Receipt, ReceiptStatus, Submission};
use crate::{
    account::Account,
    cfg::QtumConfig,
    contracts::{Artifact, ConstructorArg},
    secret::SecretSource,
};

/// `excepted` value of a receipt whose execution raised nothing.
pub const NO_EXCEPTION: &str = "None";

/// Decimal places of one QTUM.
const QTUM_DECIMALS: u8 = 8;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreateContractResult {
    txid: String,
    sender: String,
    /// Hex, no `0x` prefix.
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QtumReceipt {
    transaction_hash: String,
    gas_used: u64,
    #[serde(default)]
    contract_address: Option<String>,
    excepted: String,
}

#[derive(Debug, Deserialize)]
struct Unspent {
    /// Kept as the node's decimal literal.
    amount: Number,
}

/// Client for the Qtum node's bitcoind-style JSON-RPC. Submissions return as soon as
/// the node accepts them; confirmation needs `fetch_receipt`.
#[derive(Debug)]
pub struct QtumClient {
    http: reqwest::Client,
    url: Url,
    credentials: Option<(String, String)>,
    artifacts: Artifacts,
    gas_limit: u64,
    gas_price: f64,
    request_id: AtomicU64,
}

impl QtumClient {
    pub fn new(
        config: &QtumConfig,
        artifacts: Artifacts,
        secrets: &impl SecretSource,
    ) -> Result<Self> {
        let credentials = match (&config.rpc_user, &config.rpc_password_env) {
            (Some(user), Some(var)) => Some((user.clone(), secrets.require(var)?)),
            (Some(user), None) => Some((user.clone(), String::new())),
            (None, _) => None,
        };
        Ok(Self {
            http: reqwest::Client::new(),
            url: config.rpc_url.clone(),
            credentials,
            artifacts,
            gas_limit: config.gas_limit,
            gas_price: config.gas_price,
            request_id: AtomicU64::new(1),
        })
    }

    /// Loads the token, settlement and recovery helper artifacts named in `config`.
    pub fn connect(config: &QtumConfig, secrets: &impl SecretSource) -> Result<Self> {
        let artifacts = Artifacts::new([
            Artifact::load(ContractKind::Token, &config.contracts.token)?,
            Artifact::load(ContractKind::Settlement, &config.contracts.settlement)?,
            Artifact::load(
                ContractKind::RecoveryHelper,
                &config.contracts.recovery_helper,
            )?,
        ]);
        Self::new(config, artifacts, secrets)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        trace!("[{}] {method} {params}", Chain::Qtum);

        let mut request = self.http.post(self.url.clone()).json(&json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        }));
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }

        // The node reports call errors with a 500 status and a JSON body, so the
        // body is parsed regardless of the status.
        let response = request
            .send()
            .await
            .with_context(|| format!("Qtum RPC {method} request failed"))?;
        let status = response.status();
        let body = response.text().await?;
        let response: RpcResponse = serde_json::from_str(&body)
            .with_context(|| format!("Qtum RPC {method} returned {status}: {body}"))?;

        if let Some(error) = response.error {
            return Err(anyhow!(
                "Qtum RPC {method} failed: {} (code {})",
                error.message,
                error.code
            ));
        }
        Ok(serde_json::from_value(
            response.result.unwrap_or(Value::Null),
        )?)
    }
}

#[async_trait]
impl ChainClient for QtumClient {
    fn chain(&self) -> Chain {
        Chain::Qtum
    }

    async fn deploy_contract(
        &self,
        contract: ContractKind,
        args: Vec<ConstructorArg>,
        creator: &Account,
    ) -> Result<Submission> {
        let code = self
            .artifacts
            .get(Chain::Qtum, contract)?
            .deployment_code(&args)?;

        let result: CreateContractResult = self
            .call(
                "createcontract",
                json!([
                    hex::encode(code),
                    self.gas_limit,
                    self.gas_price,
                    creator.address
                ]),
            )
            .await?;
        debug!(
            "[{}] {contract} creation sent by {}: {} -> 0x{}",
            Chain::Qtum,
            result.sender,
            result.txid,
            result.address
        );

        Ok(Submission {
            contract_address: Some(parse_hex_address(&result.address)?),
            tx_id: result.txid,
            receipt: None,
        })
    }

    async fn transfer(
        &self,
        amount: &str,
        recipient: &str,
        sender: Option<&Account>,
    ) -> Result<String> {
        if let Some(sender) = sender {
            debug!(
                "[{}] transfers are paid by the node wallet, ignoring sender {}",
                Chain::Qtum,
                sender.role
            );
        }
        let amount = to_rpc_amount(parse_qtum(amount)?)?;
        self.call("sendtoaddress", json!([recipient, amount])).await
    }

    async fn balance(&self, address: &str) -> Result<String> {
        let unspent: Vec<Unspent> = self
            .call("listunspent", json!([0, 9_999_999, [address]]))
            .await?;
        sum_unspent(&unspent)
    }

    async fn fetch_receipt(&self, tx_id: &str) -> Result<Option<Receipt>> {
        let receipts: Vec<Value> = self.call("gettransactionreceipt", json!([tx_id])).await?;
        receipts.into_iter().next().map(into_receipt).transpose()
    }
}

/// Parses a decimal QTUM amount into satoshis.
fn parse_qtum(amount: &str) -> Result<U256> {
    let units = parse_units(amount, QTUM_DECIMALS)
        .with_context(|| format!("Invalid QTUM amount {amount}"))?;
    if units.is_negative() {
        return Err(anyhow!("Negative QTUM amount {amount}"));
    }
    Ok(units.get_absolute())
}

fn format_qtum(satoshis: U256) -> Result<String> {
    Ok(format_units(satoshis, QTUM_DECIMALS)?)
}

/// The amount as a JSON number literal with exactly eight decimals.
fn to_rpc_amount(satoshis: U256) -> Result<Number> {
    Ok(format_qtum(satoshis)?.parse()?)
}

fn sum_unspent(unspent: &[Unspent]) -> Result<String> {
    let mut total = U256::ZERO;
    for output in unspent {
        total += parse_qtum(&output.amount.to_string())?;
    }
    format_qtum(total)
}

fn parse_hex_address(address: &str) -> Result<Address> {
    Address::from_str(address).with_context(|| format!("Invalid contract address {address}"))
}

fn into_receipt(raw: Value) -> Result<Receipt> {
    let receipt: QtumReceipt = serde_json::from_value(raw.clone())
        .with_context(|| format!("Unexpected Qtum receipt {raw}"))?;
    let status = if receipt.excepted == NO_EXCEPTION {
        ReceiptStatus::Success
    } else {
        ReceiptStatus::Excepted(receipt.excepted)
    };
    let contract_address = receipt
        .contract_address
        .as_deref()
        .filter(|a| !a.is_empty())
        .map(parse_hex_address)
        .transpose()?;

    Ok(Receipt {
        tx_id: receipt.transaction_hash,
        contract_address,
        gas_used: receipt.gas_used,
        status,
        raw,
    })
}
