//! Error types for the keybase library.
//!
//! Every fallible operation returns a [`KeybaseError`] as a value. Nothing in
//! the library is fatal to the process; callers branch on the variant to
//! decide whether to retry, prompt for another passphrase, or abort.

use thiserror::Error;

/// The main error type for keybase operations.
#[derive(Error, Debug)]
pub enum KeybaseError {
    /// A passphrase of zero length was supplied
    #[error("Passphrase must not be empty")]
    EmptyPassphraseError,

    /// Private key failed the structural check
    #[error("Invalid private key: {0}")]
    InvalidPrivateKeyError(String),

    /// Address is not 40 hex characters
    #[error("Invalid address: {0}")]
    InvalidAddressError(String),

    /// No account record exists at the address
    #[error("Account not found: {0}")]
    AccountNotFoundError(String),

    /// Decrypted key does not match the account it was stored under
    #[error("Wrong passphrase")]
    WrongPassphraseError,

    /// Account has no entry in the unlocked table
    #[error("Account is not unlocked: {0}")]
    NotUnlockedError(String),

    /// Account index and account records disagree
    #[error("Account index corrupt: {0}")]
    IndexCorruptError(String),

    /// Signing or verification failed
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// Cipher setup or operation failed
    #[error("Encryption/decryption error: {0}")]
    EncryptionError(String),

    /// Passphrase key derivation failed
    #[error("Key derivation error: {0}")]
    KeyDerivationError(String),

    /// Storage I/O error
    #[error("Storage I/O error: {0}")]
    StorageError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Malformed hex, base64 or armored input
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// A specialized Result type for keybase operations.
pub type Result<T> = std::result::Result<T, KeybaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KeybaseError::AccountNotFoundError("abcd".to_string());
        assert_eq!(err.to_string(), "Account not found: abcd");
        assert_eq!(
            KeybaseError::WrongPassphraseError.to_string(),
            "Wrong passphrase"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KeybaseError>();
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let err: KeybaseError = json_err.into();
        assert!(matches!(err, KeybaseError::JsonError(_)));
    }
}
