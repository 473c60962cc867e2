use l2dex_deployer::{
    account::{DEFAULT, L2_ORACLE, L2_OWNER, TOKEN_OWNER},
    cfg::FundingConfig,
    client::Chain,
    funding::FundingPolicy,
    orchestrator::ChainContext,
    plan::Stage,
};

use crate::{
    Call, FakeClient, QTUM_ORACLE, call_log, calls, context, ethereum_accounts, orchestrator,
    qtum_accounts,
};

fn funding(
    amount: &str,
    sender: Option<&str>,
    recipients: &[&str],
    policy: FundingPolicy,
) -> Option<FundingConfig> {
    Some(FundingConfig {
        amount: amount.to_owned(),
        sender: sender.map(str::to_owned),
        recipients: recipients.iter().map(|r| (*r).to_owned()).collect(),
        policy,
    })
}

fn with_funding(mut ctx: ChainContext, config: Option<FundingConfig>) -> ChainContext {
    ctx.funding = config;
    ctx
}

fn transfers(log: &crate::CallLog) -> Vec<(Chain, String)> {
    calls(log)
        .into_iter()
        .filter_map(|(chain, call)| match call {
            Call::Transfer { recipient, .. } => Some((chain, recipient)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn one_transfer_per_recipient_without_confirmation() {
    let log = call_log();
    let ethereum = with_funding(
        context(FakeClient::ethereum(&log), ethereum_accounts(), vec![]),
        funding(
            "3000000000000000000",
            Some(L2_OWNER),
            &[TOKEN_OWNER, L2_ORACLE],
            FundingPolicy::FailFast,
        ),
    );
    let qtum = with_funding(
        context(FakeClient::qtum(&log, 3), qtum_accounts(), vec![]),
        funding(
            "10",
            None,
            &[DEFAULT, TOKEN_OWNER, L2_OWNER, L2_ORACLE],
            FundingPolicy::FailFast,
        ),
    );

    let report = orchestrator(ethereum, qtum)
        .run(&[Stage::FundEthereum, Stage::FundQtum])
        .await
        .unwrap();

    let log = calls(&log);
    assert_eq!(log.len(), 2 + 4);
    assert!(log.iter().all(|(_, call)| matches!(call, Call::Transfer { .. })));
    assert_eq!(
        log[0].1,
        Call::Transfer {
            amount: "3000000000000000000".to_owned(),
            recipient: "0x792db58835893e047189f4b6639eda85ac34113f".to_owned(),
            sender: Some(L2_OWNER.to_owned()),
        }
    );
    assert_eq!(
        log[5].1,
        Call::Transfer {
            amount: "10".to_owned(),
            recipient: QTUM_ORACLE.to_owned(),
            sender: None,
        }
    );

    assert_eq!(report.funding.len(), 2);
    assert_eq!(report.funding[1].chain, Chain::Qtum);
    let roles: Vec<_> = report.funding[1]
        .transfers
        .iter()
        .map(|t| t.role.as_str())
        .collect();
    assert_eq!(roles, [DEFAULT, TOKEN_OWNER, L2_OWNER, L2_ORACLE]);
    assert!(report.funding.iter().all(|f| f.failures().count() == 0));
}

#[tokio::test]
async fn fail_fast_stops_at_first_failure() {
    let log = call_log();
    let ethereum = context(FakeClient::ethereum(&log), ethereum_accounts(), vec![]);
    let qtum = with_funding(
        context(
            FakeClient::qtum(&log, 0).with_failing_recipient("qLn9vqbr2Gx3TsVR9QyTVB5mrMoh4x43Uf"),
            qtum_accounts(),
            vec![],
        ),
        funding(
            "10",
            None,
            &[DEFAULT, TOKEN_OWNER, L2_OWNER, L2_ORACLE],
            FundingPolicy::FailFast,
        ),
    );

    let err = orchestrator(ethereum, qtum)
        .run(&[Stage::FundQtum, Stage::QtumTokens])
        .await
        .unwrap_err();

    assert_eq!(
        format!("{err:#}"),
        "[QTUM] funding token_owner (qLn9vqbr2Gx3TsVR9QyTVB5mrMoh4x43Uf) failed: insufficient funds"
    );
    assert_eq!(
        transfers(&log),
        [
            (Chain::Qtum, "qUbxboqjBRp96j3La8D1RYkyqx5uQbJPoW".to_owned()),
            (Chain::Qtum, "qLn9vqbr2Gx3TsVR9QyTVB5mrMoh4x43Uf".to_owned()),
        ]
    );
}

#[tokio::test]
async fn best_effort_attempts_every_recipient() {
    let log = call_log();
    let ethereum = context(FakeClient::ethereum(&log), ethereum_accounts(), vec![]);
    let qtum = with_funding(
        context(
            FakeClient::qtum(&log, 0).with_failing_recipient("qLn9vqbr2Gx3TsVR9QyTVB5mrMoh4x43Uf"),
            qtum_accounts(),
            vec![],
        ),
        funding(
            "10",
            None,
            &[DEFAULT, TOKEN_OWNER, L2_OWNER, L2_ORACLE],
            FundingPolicy::BestEffort,
        ),
    );

    let report = orchestrator(ethereum, qtum)
        .run(&[Stage::FundQtum])
        .await
        .unwrap();

    assert_eq!(transfers(&log).len(), 4);
    let funding = &report.funding[0];
    let failed: Vec<_> = funding.failures().map(|t| t.role.as_str()).collect();
    assert_eq!(failed, [TOKEN_OWNER]);
    assert_eq!(
        funding.transfers[0].tx_id.as_deref(),
        Some("transfer-to-qUbxboqjBRp96j3La8D1RYkyqx5uQbJPoW")
    );
    assert_eq!(funding.transfers[1].error.as_deref(), Some("insufficient funds"));
}

#[tokio::test]
async fn unknown_recipient_fails_before_any_transfer() {
    let log = call_log();
    let ethereum = with_funding(
        context(FakeClient::ethereum(&log), ethereum_accounts(), vec![]),
        funding(
            "1",
            Some(L2_OWNER),
            &[TOKEN_OWNER, "user_a"],
            FundingPolicy::BestEffort,
        ),
    );
    let qtum = context(FakeClient::qtum(&log, 0), qtum_accounts(), vec![]);

    let err = orchestrator(ethereum, qtum)
        .run(&[Stage::FundEthereum])
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "[ETHEREUM] no account configured for role 'user_a'"
    );
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn stage_without_funding_config_fails() {
    let log = call_log();
    let ethereum = context(FakeClient::ethereum(&log), ethereum_accounts(), vec![]);
    let qtum = context(FakeClient::qtum(&log, 0), qtum_accounts(), vec![]);

    let err = orchestrator(ethereum, qtum)
        .run(&[Stage::FundQtum])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "[QTUM] no funding configured");
}
