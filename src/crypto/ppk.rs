//! Portable private key (PPK) armoring.
//!
//! A PPK is a JSON document carrying a private key encrypted under a
//! separate transport passphrase, for moving keys between keybases. The key
//! is stretched with scrypt and sealed with AES-256-GCM, using the first 12
//! bytes of the stretched key as the nonce.

use crate::error::{KeybaseError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// The only supported key derivation function name.
pub const PPK_KDF: &str = "scrypt";

/// Default scrypt cost, as log2(N).
pub const DEFAULT_SCRYPT_LOG_N: u8 = 15;

/// Highest accepted scrypt cost. Costs above this need gigabytes of memory.
pub const MAX_SCRYPT_LOG_N: u8 = 20;

const SALT_LENGTH: usize = 16;
const NONCE_LENGTH: usize = 12;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Armored form of an exported private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmoredKey {
    pub kdf: String,
    /// Hex-encoded scrypt salt.
    pub salt: String,
    /// scrypt cost as a decimal log2(N).
    pub secparam: String,
    pub hint: String,
    /// Base64-encoded AES-GCM ciphertext with tag.
    pub ciphertext: String,
}

/// Whether `log_n` is an accepted scrypt cost.
pub fn is_valid_scrypt_log_n(log_n: u8) -> bool {
    (1..=MAX_SCRYPT_LOG_N).contains(&log_n)
}

fn stretch(passphrase: &str, salt: &[u8], log_n: u8) -> Result<Zeroizing<[u8; 32]>> {
    let params = scrypt::Params::new(log_n, SCRYPT_R, SCRYPT_P, 32)
        .map_err(|e| KeybaseError::KeyDerivationError(format!("Invalid scrypt params: {}", e)))?;

    let mut key = Zeroizing::new([0u8; 32]);
    scrypt::scrypt(passphrase.as_bytes(), salt, &params, &mut key[..])
        .map_err(|e| KeybaseError::KeyDerivationError(format!("scrypt error: {}", e)))?;
    Ok(key)
}

/// Armor a private key with the default scrypt cost.
pub fn armor_private_key(private_key: &[u8], passphrase: &str, hint: &str) -> Result<String> {
    armor_private_key_with_cost(private_key, passphrase, hint, DEFAULT_SCRYPT_LOG_N)
}

/// Armor a private key with an explicit scrypt cost.
pub fn armor_private_key_with_cost(
    private_key: &[u8],
    passphrase: &str,
    hint: &str,
    log_n: u8,
) -> Result<String> {
    if passphrase.is_empty() {
        return Err(KeybaseError::EmptyPassphraseError);
    }
    if !is_valid_scrypt_log_n(log_n) {
        return Err(KeybaseError::KeyDerivationError(format!(
            "scrypt cost {} outside 1..={}",
            log_n, MAX_SCRYPT_LOG_N
        )));
    }

    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);

    let key = stretch(passphrase, &salt, log_n)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| KeybaseError::EncryptionError(format!("Invalid key length: {}", e)))?;

    let plaintext = Zeroizing::new(hex::encode(private_key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&key[..NONCE_LENGTH]), plaintext.as_bytes())
        .map_err(|e| KeybaseError::EncryptionError(format!("Encryption failed: {}", e)))?;

    let armored = ArmoredKey {
        kdf: PPK_KDF.to_string(),
        salt: hex::encode_upper(salt),
        secparam: log_n.to_string(),
        hint: hint.to_string(),
        ciphertext: general_purpose::STANDARD.encode(ciphertext),
    };

    Ok(serde_json::to_string(&armored)?)
}

/// Recover the private key from an armored PPK document.
///
/// A wrong passphrase fails tag verification and yields `WrongPassphraseError`.
pub fn unarmor_private_key(armored_json: &str, passphrase: &str) -> Result<Zeroizing<Vec<u8>>> {
    if passphrase.is_empty() {
        return Err(KeybaseError::EmptyPassphraseError);
    }

    let armored: ArmoredKey = serde_json::from_str(armored_json)?;
    if !armored.kdf.eq_ignore_ascii_case(PPK_KDF) {
        return Err(KeybaseError::ParseError(format!(
            "Unsupported kdf '{}'",
            armored.kdf
        )));
    }

    let salt = hex::decode(&armored.salt)
        .map_err(|e| KeybaseError::ParseError(format!("Invalid salt hex: {}", e)))?;
    let log_n = match armored.secparam.trim().parse::<u8>() {
        Ok(log_n) if is_valid_scrypt_log_n(log_n) => log_n,
        _ => {
            return Err(KeybaseError::ParseError(format!(
                "Invalid secparam '{}', expected 1..={}",
                armored.secparam, MAX_SCRYPT_LOG_N
            )))
        }
    };
    let ciphertext = general_purpose::STANDARD
        .decode(&armored.ciphertext)
        .map_err(|e| KeybaseError::ParseError(format!("Invalid ciphertext base64: {}", e)))?;

    let key = stretch(passphrase, &salt, log_n)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| KeybaseError::EncryptionError(format!("Invalid key length: {}", e)))?;

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&key[..NONCE_LENGTH]), ciphertext.as_ref())
            .map_err(|_| KeybaseError::WrongPassphraseError)?,
    );

    let private_key = hex::decode(plaintext.as_slice())
        .map_err(|e| KeybaseError::ParseError(format!("Invalid private key hex: {}", e)))?;
    Ok(Zeroizing::new(private_key))
}
