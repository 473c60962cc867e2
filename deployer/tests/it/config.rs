use std::{collections::BTreeMap, io::Write, path::Path};

use alloy::primitives::address;
use l2dex_deployer::{
    account::AccountBook,
    address::qtum_to_ethereum,
    cfg::default_stages,
    client::Chain,
    funding::{FundingPlan, FundingPolicy},
    read_config,
};
use tempfile::NamedTempFile;

fn example() -> l2dex_deployer::cfg::Config {
    read_config(&Path::new(env!("CARGO_MANIFEST_DIR")).join("deploy.example.toml")).unwrap()
}

fn secrets() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("ETH_TOKEN_OWNER_KEY".to_owned(), "0x01".to_owned()),
        ("ETH_L2_OWNER_KEY".to_owned(), "0x02".to_owned()),
    ])
}

#[test]
fn example_describes_the_reference_deployment() {
    let config = example();

    let symbols = |tokens: &[l2dex_deployer::cfg::TokenSpec]| {
        tokens.iter().map(|t| t.symbol.clone()).collect::<Vec<_>>()
    };
    assert_eq!(symbols(&config.ethereum.tokens), ["OMG", "USDT"]);
    assert_eq!(symbols(&config.qtum.tokens), ["INK", "BOT", "QBT"]);
    assert_eq!(config.plan.stages, default_stages());
    assert!(
        config
            .ethereum
            .contracts
            .token
            .bin
            .ends_with("deployer/bin/ERC20Token.bin")
    );
}

#[test]
fn example_funding_resolves_against_accounts() {
    let config = example();

    let accounts =
        AccountBook::from_config(Chain::Ethereum, &config.ethereum.accounts, &secrets()).unwrap();
    let plan = FundingPlan::new(config.ethereum.funding.as_ref().unwrap(), &accounts).unwrap();
    assert_eq!(plan.recipients.len(), 5);
    assert_eq!(plan.sender.unwrap().private_key.as_deref(), Some("0x02"));
    assert_eq!(plan.policy, FundingPolicy::FailFast);

    let accounts =
        AccountBook::from_config(Chain::Qtum, &config.qtum.accounts, &BTreeMap::new()).unwrap();
    let plan = FundingPlan::new(config.qtum.funding.as_ref().unwrap(), &accounts).unwrap();
    assert_eq!(plan.recipients.len(), 7);
    assert!(plan.sender.is_none());
}

#[test]
fn example_qtum_accounts_translate() {
    let config = example();
    let expected = [
        ("default", address!("f34e5571697a7581eb9d503e6db8b0e4ae5ae5b2")),
        ("l2_oracle", address!("a65ed93c1a20e2af0a44160de76f70d5ca13dbf9")),
        ("user_c", address!("de5de05fd839235a644bdb873ba84d5b7828a72e")),
    ];
    for (role, hex) in expected {
        assert_eq!(
            qtum_to_ethereum(&config.qtum.accounts[role].address).unwrap(),
            hex
        );
    }
    for account in config.qtum.accounts.values() {
        qtum_to_ethereum(&account.address).unwrap();
    }
}

#[test]
fn missing_key_variable_is_named() {
    let config = example();
    let err =
        AccountBook::from_config(Chain::Ethereum, &config.ethereum.accounts, &BTreeMap::new())
            .unwrap_err();
    assert!(err.to_string().contains("ETH_L2_OWNER_KEY"));
}

#[test]
fn unreadable_config_names_the_file() {
    let err = read_config(Path::new("/nonexistent/deploy.toml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/deploy.toml"));

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[ethereum]\nrpc_url = 5\n").unwrap();
    let err = read_config(file.path()).unwrap_err();
    assert!(err.to_string().starts_with("Cannot parse configuration"));
}
