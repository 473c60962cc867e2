use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{funding::FundingPolicy, plan::Stage};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub ethereum: EthereumConfig,
    pub qtum: QtumConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub plan: PlanConfig,
}

impl Config {
    pub fn resolve_paths(&mut self, base: &Path) {
        let contracts = &mut self.ethereum.contracts;
        contracts.token.resolve(base);
        contracts.settlement.resolve(base);

        let contracts = &mut self.qtum.contracts;
        contracts.token.resolve(base);
        contracts.settlement.resolve(base);
        contracts.recovery_helper.resolve(base);
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EthereumConfig {
    pub rpc_url: Url,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// In wei.
    #[serde(default = "default_ethereum_gas_price")]
    pub gas_price: u128,
    #[serde(default = "default_transfer_gas_limit")]
    pub transfer_gas_limit: u64,
    pub contracts: EthereumContracts,
    pub accounts: BTreeMap<String, AccountConfig>,
    #[serde(default)]
    pub tokens: Vec<TokenSpec>,
    pub funding: Option<FundingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EthereumContracts {
    pub token: ArtifactPaths,
    pub settlement: ArtifactPaths,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QtumConfig {
    pub rpc_url: Url,
    pub rpc_user: Option<String>,
    /// Name of the environment variable holding the RPC password.
    pub rpc_password_env: Option<String>,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// In QTUM per gas unit.
    #[serde(default = "default_qtum_gas_price")]
    pub gas_price: f64,
    pub contracts: QtumContracts,
    pub accounts: BTreeMap<String, AccountConfig>,
    #[serde(default)]
    pub tokens: Vec<TokenSpec>,
    pub funding: Option<FundingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QtumContracts {
    pub token: ArtifactPaths,
    pub settlement: ArtifactPaths,
    pub recovery_helper: ArtifactPaths,
}

/// Locations of a compiled contract: the solc `.abi` JSON (optional for contracts
/// without constructor parameters) and the hex `.bin` bytecode.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactPaths {
    pub abi: Option<PathBuf>,
    pub bin: PathBuf,
}

impl ArtifactPaths {
    fn resolve(&mut self, base: &Path) {
        if let Some(abi) = self.abi.as_mut() {
            if abi.is_relative() {
                *abi = base.join(&*abi);
            }
        }
        if self.bin.is_relative() {
            self.bin = base.join(&self.bin);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub address: String,
    /// Name of the environment variable holding the hex private key. Accounts that
    /// never sign locally leave this out.
    pub private_key_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSpec {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FundingConfig {
    /// Decimal amount in the chain's native unit (wei on Ethereum, QTUM on Qtum).
    pub amount: String,
    /// Role paying for the transfers. Qtum pays from the node wallet and ignores it.
    pub sender: Option<String>,
    pub recipients: Vec<String>,
    #[serde(default)]
    pub policy: FundingPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_max_attempts")]
    pub max_attempts: u32,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_attempts: default_poll_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    #[serde(default = "default_stages")]
    pub stages: Vec<Stage>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
        }
    }
}

pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::EthereumTokens,
        Stage::QtumTokens,
        Stage::QtumSettlement,
    ]
}

fn default_gas_limit() -> u64 {
    2_500_000
}

fn default_transfer_gas_limit() -> u64 {
    21_000
}

fn default_ethereum_gas_price() -> u128 {
    10_000_000_000
}

fn default_qtum_gas_price() -> f64 {
    0.0000005
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_max_attempts() -> u32 {
    600
}
