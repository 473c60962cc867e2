//! Conversion between Qtum base58check addresses and the Ethereum hex encoding of
//! the same 20-byte key hash. Settlement contracts on both chains take the oracle
//! in Ethereum format.

use alloy::primitives::Address;

use crate::error::DeployError;

pub const QTUM_TESTNET_VERSION: u8 = 0x78;
pub const QTUM_MAINNET_VERSION: u8 = 0x3a;

const HASH_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QtumAddress {
    pub version: u8,
    pub hash160: Address,
}

impl QtumAddress {
    pub fn decode(address: &str) -> Result<Self, DeployError> {
        let invalid = |reason: String| DeployError::InvalidAddress {
            address: address.to_owned(),
            reason,
        };

        let payload = bs58::decode(address)
            .with_check(None)
            .into_vec()
            .map_err(|e| invalid(e.to_string()))?;
        let (version, hash) = payload
            .split_first()
            .ok_or_else(|| invalid("empty payload".to_owned()))?;
        if hash.len() != HASH_LEN {
            return Err(invalid(format!(
                "expected a 20 byte key hash, found {} bytes",
                hash.len()
            )));
        }

        Ok(Self {
            version: *version,
            hash160: Address::from_slice(hash),
        })
    }

    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(1 + HASH_LEN);
        payload.push(self.version);
        payload.extend_from_slice(self.hash160.as_slice());
        bs58::encode(payload).with_check().into_string()
    }
}

/// The Ethereum-format address a Qtum address was derived from.
pub fn qtum_to_ethereum(address: &str) -> Result<Address, DeployError> {
    Ok(QtumAddress::decode(address)?.hash160)
}

pub fn ethereum_to_qtum(address: Address, version: u8) -> String {
    QtumAddress {
        version,
        hash160: address,
    }
    .encode()
}
