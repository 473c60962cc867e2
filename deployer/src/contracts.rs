use std::{fmt, fs, path::Path};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, Specifier},
    json_abi::{JsonAbi, Param},
    primitives::{Address, U256},
};
use anyhow::{Context, Result};
use tracing::debug;

use crate::{cfg::ArtifactPaths, client::ContractKind, error::DeployError};

/// A value handed to a contract constructor. It is converted to whatever type the
/// artifact declares for that position at encoding time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorArg {
    Text(String),
    Uint(U256),
    Address(Address),
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorArg::Text(text) => write!(f, "{text}"),
            ConstructorArg::Uint(value) => write!(f, "{value}"),
            ConstructorArg::Address(address) => write!(f, "{address}"),
        }
    }
}

impl ConstructorArg {
    fn to_value(&self, ty: &DynSolType) -> Result<DynSolValue, String> {
        match (ty, self) {
            (DynSolType::String, ConstructorArg::Text(text)) => Ok(DynSolValue::String(text.clone())),
            (DynSolType::Uint(bits), ConstructorArg::Uint(value)) => {
                if *bits < 256 && value.bit_len() > *bits {
                    return Err(format!("value does not fit in {bits} bits"));
                }
                Ok(DynSolValue::Uint(*value, *bits))
            }
            (DynSolType::Address, ConstructorArg::Address(address)) => {
                Ok(DynSolValue::Address(*address))
            }
            (ty, arg) => ty.coerce_str(&arg.to_string()).map_err(|e| e.to_string()),
        }
    }
}

/// A compiled contract: creation bytecode plus its declared constructor parameters.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ContractKind,
    pub bytecode: Vec<u8>,
    pub constructor_inputs: Vec<Param>,
}

impl Artifact {
    pub fn new(kind: ContractKind, bytecode: Vec<u8>, abi: Option<&JsonAbi>) -> Self {
        let constructor_inputs = abi
            .and_then(|abi| abi.constructor.as_ref())
            .map(|constructor| constructor.inputs.clone())
            .unwrap_or_default();
        Self {
            kind,
            bytecode,
            constructor_inputs,
        }
    }

    pub fn load(kind: ContractKind, paths: &ArtifactPaths) -> Result<Self> {
        let bytecode = read_bytecode(&paths.bin)?;
        let abi = paths.abi.as_deref().map(read_abi).transpose()?;
        let artifact = Self::new(kind, bytecode, abi.as_ref());
        debug!(
            "Loaded {kind} artifact from {} ({} bytes, constructor({}))",
            paths.bin.display(),
            artifact.bytecode.len(),
            artifact.constructor_types().join(",")
        );
        Ok(artifact)
    }

    pub fn constructor_types(&self) -> Vec<&str> {
        self.constructor_inputs.iter().map(|p| p.ty.as_str()).collect()
    }

    /// Creation code with the ABI-encoded constructor arguments appended. Checks the
    /// argument count and types against the declared constructor first, so a bad
    /// call never reaches the network.
    pub fn deployment_code(&self, args: &[ConstructorArg]) -> Result<Vec<u8>, DeployError> {
        if args.len() != self.constructor_inputs.len() {
            return Err(DeployError::ConstructorArity {
                contract: self.kind,
                expected: self.constructor_inputs.len(),
                actual: args.len(),
            });
        }

        let values = self
            .constructor_inputs
            .iter()
            .zip(args)
            .map(|(param, arg)| {
                let invalid = |reason: String| DeployError::InvalidArgument {
                    contract: self.kind,
                    ty: param.ty.clone(),
                    value: arg.to_string(),
                    reason,
                };
                let ty = param.resolve().map_err(|e| invalid(e.to_string()))?;
                arg.to_value(&ty).map_err(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut code = self.bytecode.clone();
        if !values.is_empty() {
            code.extend(DynSolValue::Tuple(values).abi_encode_params());
        }
        Ok(code)
    }
}

fn read_bytecode(path: &Path) -> Result<Vec<u8>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read bytecode {}", path.display()))?;
    let text = text.trim();
    hex::decode(text.strip_prefix("0x").unwrap_or(text))
        .with_context(|| format!("Bytecode {} is not hex", path.display()))
}

fn read_abi(path: &Path) -> Result<JsonAbi> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Cannot read ABI {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Cannot parse ABI {}", path.display()))
}
