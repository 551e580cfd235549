//! Account address derivation.
//!
//! An address is the first 20 bytes of the SHA-256 digest of a public key,
//! hex-encoded in lowercase.

use crate::error::{KeybaseError, Result};
use sha2::{Digest, Sha256};

/// Number of digest bytes kept for an address.
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a hex-encoded address.
pub const ADDRESS_HEX_LENGTH: usize = ADDRESS_LENGTH * 2;

/// Derive the address of a public key.
///
/// # Example
///
/// ```
/// use keybase::crypto::address::{address_from_public_key, ADDRESS_HEX_LENGTH};
///
/// let address = address_from_public_key(&[0u8; 32]);
/// assert_eq!(address.len(), ADDRESS_HEX_LENGTH);
/// ```
pub fn address_from_public_key(public_key: &[u8]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(&digest[..ADDRESS_LENGTH])
}

/// Check that a string is a well-formed hex address.
pub fn validate_address_hex(address_hex: &str) -> bool {
    address_hex.len() == ADDRESS_HEX_LENGTH && address_hex.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validate an address and normalise it to lowercase.
pub fn normalize_address_hex(address_hex: &str) -> Result<String> {
    if !validate_address_hex(address_hex) {
        return Err(KeybaseError::InvalidAddressError(format!(
            "Expected {} hex characters, got '{}'",
            ADDRESS_HEX_LENGTH, address_hex
        )));
    }
    Ok(address_hex.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_truncated_sha256() {
        let public_key = [0xABu8; 32];
        let digest = Sha256::digest(public_key);

        let address = address_from_public_key(&public_key);

        assert_eq!(address, hex::encode(&digest[..20]));
        assert!(validate_address_hex(&address));
    }

    #[test]
    fn test_address_is_deterministic() {
        assert_eq!(
            address_from_public_key(&[1u8; 32]),
            address_from_public_key(&[1u8; 32])
        );
        assert_ne!(
            address_from_public_key(&[1u8; 32]),
            address_from_public_key(&[2u8; 32])
        );
    }

    #[test]
    fn test_validate_address_hex() {
        assert!(validate_address_hex(&"a".repeat(40)));
        assert!(validate_address_hex(&"F".repeat(40)));
        assert!(!validate_address_hex(&"a".repeat(39)));
        assert!(!validate_address_hex(&"a".repeat(64)));
        assert!(!validate_address_hex(&"z".repeat(40)));
        assert!(!validate_address_hex(""));
    }

    #[test]
    fn test_normalize_address_hex() {
        let upper = "AB".repeat(20);
        assert_eq!(normalize_address_hex(&upper).unwrap(), "ab".repeat(20));

        match normalize_address_hex("xyz") {
            Err(KeybaseError::InvalidAddressError(msg)) => assert!(msg.contains("40")),
            _ => panic!("Expected InvalidAddressError"),
        }
    }
}
