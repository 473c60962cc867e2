use crate::client::{Chain, ContractKind, Receipt};

/// A fatal deployment condition. Any of these unwinds the whole run; nothing already
/// on chain is rolled back.
#[derive(thiserror::Error, Debug)]
pub enum DeployError {
    #[error("{contract} constructor takes {expected} arguments, {actual} supplied")]
    ConstructorArity {
        contract: ContractKind,
        expected: usize,
        actual: usize,
    },
    #[error("cannot use {value} as {ty} argument of the {contract} constructor: {reason}")]
    InvalidArgument {
        contract: ContractKind,
        ty: String,
        value: String,
        reason: String,
    },
    #[error("[{chain}] {operation} failed: transaction {} was not successful", receipt.tx_id)]
    Rejected {
        chain: Chain,
        operation: String,
        receipt: Box<Receipt>,
    },
    #[error("[{chain}] {operation} failed with exception '{excepted}': {}", receipt.raw)]
    Excepted {
        chain: Chain,
        operation: String,
        excepted: String,
        receipt: Box<Receipt>,
    },
    #[error("[{chain}] no receipt for transaction {tx_id} after {attempts} attempts")]
    TimedOut {
        chain: Chain,
        tx_id: String,
        attempts: u32,
    },
    #[error("[{chain}] no account configured for role '{role}'")]
    MissingAccount { chain: Chain, role: String },
    #[error("[{chain}] no {contract} contract artifact configured")]
    MissingArtifact { chain: Chain, contract: ContractKind },
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
}
