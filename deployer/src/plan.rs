use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One independently runnable step of a deployment. A plan is a list of stages run
/// strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    FundEthereum,
    FundQtum,
    EthereumTokens,
    QtumTokens,
    /// The recovery helper followed by the Qtum settlement contract.
    QtumSettlement,
    EthereumSettlement,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Stage::FundEthereum => "fund-ethereum",
                Stage::FundQtum => "fund-qtum",
                Stage::EthereumTokens => "ethereum-tokens",
                Stage::QtumTokens => "qtum-tokens",
                Stage::QtumSettlement => "qtum-settlement",
                Stage::EthereumSettlement => "ethereum-settlement",
            }
        )
    }
}

/// Stages from the command line win over the configured plan.
pub fn select(cli: &[Stage], configured: &[Stage]) -> Vec<Stage> {
    if cli.is_empty() {
        configured.to_vec()
    } else {
        cli.to_vec()
    }
}
