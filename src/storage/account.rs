//! Persisted account records.
//!
//! An [`Account`] is immutable once built. Its address is always recomputed
//! from the public key, including when a record is read back from a store.

use crate::crypto::address::{address_from_public_key, validate_address_hex};
use crate::crypto::ed25519::PUBLIC_KEY_LENGTH;
use crate::error::{KeybaseError, Result};
use serde::{Deserialize, Serialize};

/// Wire shape of an account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Hex-encoded public key.
    pub public_key: String,

    pub address_hex: String,

    pub encrypted_private_key_hex: String,
}

/// An encrypted keypair, keyed by its address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AccountRecord", into = "AccountRecord")]
pub struct Account {
    public_key: [u8; PUBLIC_KEY_LENGTH],
    address_hex: String,
    encrypted_private_key_hex: String,
}

impl Account {
    /// Build an account, deriving its address from the public key.
    pub fn new(public_key: [u8; PUBLIC_KEY_LENGTH], encrypted_private_key_hex: String) -> Self {
        Self {
            address_hex: address_from_public_key(&public_key),
            public_key,
            encrypted_private_key_hex,
        }
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key)
    }

    pub fn address_hex(&self) -> &str {
        &self.address_hex
    }

    pub fn encrypted_private_key_hex(&self) -> &str {
        &self.encrypted_private_key_hex
    }

    /// Serialize to the bytes stored under the account key.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse and validate a stored account record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record: AccountRecord = serde_json::from_slice(bytes)?;
        Self::try_from(record)
    }
}

impl TryFrom<AccountRecord> for Account {
    type Error = KeybaseError;

    fn try_from(record: AccountRecord) -> Result<Self> {
        if !validate_address_hex(&record.address_hex) {
            return Err(KeybaseError::InvalidAddressError(format!(
                "Stored address '{}' is malformed",
                record.address_hex
            )));
        }

        let public_key: [u8; PUBLIC_KEY_LENGTH] = hex::decode(&record.public_key)
            .map_err(|e| KeybaseError::ParseError(format!("Invalid public key hex: {}", e)))?
            .try_into()
            .map_err(|_| {
                KeybaseError::ParseError(format!(
                    "Public key must be {} bytes",
                    PUBLIC_KEY_LENGTH
                ))
            })?;

        let account = Account::new(public_key, record.encrypted_private_key_hex);
        if !account.address_hex.eq_ignore_ascii_case(&record.address_hex) {
            return Err(KeybaseError::IndexCorruptError(format!(
                "Stored address {} does not match its public key",
                record.address_hex
            )));
        }

        Ok(account)
    }
}

impl From<Account> for AccountRecord {
    fn from(account: Account) -> Self {
        Self {
            public_key: hex::encode(account.public_key),
            address_hex: account.address_hex,
            encrypted_private_key_hex: account.encrypted_private_key_hex,
        }
    }
}
