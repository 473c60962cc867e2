use std::{collections::BTreeMap, fmt};

use anyhow::Result;

use crate::{cfg::AccountConfig, client::Chain, error::DeployError, secret::SecretSource};

pub const DEFAULT: &str = "default";
pub const TOKEN_OWNER: &str = "token_owner";
pub const L2_OWNER: &str = "l2_owner";
pub const L2_ORACLE: &str = "l2_oracle";

/// An identity on one chain. The same role label names the matching identity on the
/// other chain; the two keypairs are otherwise unrelated.
#[derive(Clone)]
pub struct Account {
    pub role: String,
    pub address: String,
    pub private_key: Option<String>,
}

impl Account {
    pub fn new(role: &str, address: &str) -> Self {
        Self {
            role: role.to_owned(),
            address: address.to_owned(),
            private_key: None,
        }
    }

    pub fn from_config(
        role: &str,
        config: &AccountConfig,
        secrets: &impl SecretSource,
    ) -> Result<Self> {
        let private_key = match &config.private_key_env {
            Some(var) => Some(secrets.require(var)?),
            None => None,
        };
        Ok(Self {
            role: role.to_owned(),
            address: config.address.clone(),
            private_key,
        })
    }
}

// Keeps private keys out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("role", &self.role)
            .field("address", &self.address)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The role-label to account map for one chain.
#[derive(Debug, Clone)]
pub struct AccountBook {
    chain: Chain,
    accounts: BTreeMap<String, Account>,
}

impl AccountBook {
    pub fn new(chain: Chain, accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            chain,
            accounts: accounts
                .into_iter()
                .map(|account| (account.role.clone(), account))
                .collect(),
        }
    }

    pub fn from_config(
        chain: Chain,
        config: &BTreeMap<String, AccountConfig>,
        secrets: &impl SecretSource,
    ) -> Result<Self> {
        let accounts = config
            .iter()
            .map(|(role, account)| Account::from_config(role, account, secrets))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(chain, accounts))
    }

    pub fn get(&self, role: &str) -> Result<&Account, DeployError> {
        self.accounts
            .get(role)
            .ok_or_else(|| DeployError::MissingAccount {
                chain: self.chain,
                role: role.to_owned(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}
