//! Private key encryption at rest using AES-256-CTR.
//!
//! The record format carries no nonce: every record is encrypted with the
//! same implicit initial counter block (the 128-bit big-endian integer 1)
//! under a key derived from the passphrase alone. Records are decryptable
//! only if this construction is reproduced exactly.

use crate::crypto::password::derive_key;
use crate::error::{KeybaseError, Result};
use aes::cipher::{KeyIvInit, StreamCipher};
use zeroize::Zeroizing;

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// Initial counter block of every encrypted record.
pub const INITIAL_COUNTER_BLOCK: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];

fn apply_keystream(key: &[u8], data: &mut [u8]) -> Result<()> {
    let mut cipher = Aes256Ctr::new_from_slices(key, &INITIAL_COUNTER_BLOCK)
        .map_err(|e| KeybaseError::EncryptionError(format!("Invalid key length: {}", e)))?;
    cipher.apply_keystream(data);
    Ok(())
}

/// Encrypt bytes under a 32-byte symmetric key.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = plaintext.to_vec();
    apply_keystream(key, &mut buffer)?;
    Ok(buffer)
}

/// Decrypt bytes under a 32-byte symmetric key.
///
/// The cipher is unauthenticated: a wrong key yields garbage, not an error.
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    apply_keystream(key, &mut buffer)?;
    Ok(buffer)
}

/// Encrypt a private key with a passphrase, returning hex ciphertext.
///
/// # Example
///
/// ```
/// use keybase::crypto::encryption::{decrypt_private_key, encrypt_private_key};
///
/// let key = [42u8; 64];
/// let encrypted = encrypt_private_key(&key, "correct-horse").unwrap();
/// let decrypted = decrypt_private_key(&encrypted, "correct-horse").unwrap();
/// assert_eq!(key.as_slice(), decrypted.as_slice());
/// ```
pub fn encrypt_private_key(private_key: &[u8], passphrase: &str) -> Result<String> {
    let key = derive_key(passphrase)?;
    let ciphertext = encrypt(key.as_slice(), private_key)?;
    Ok(hex::encode(ciphertext))
}

/// Decrypt hex ciphertext produced by [`encrypt_private_key`].
pub fn decrypt_private_key(
    encrypted_hex: &str,
    passphrase: &str,
) -> Result<Zeroizing<Vec<u8>>> {
    let ciphertext = hex::decode(encrypted_hex)
        .map_err(|e| KeybaseError::ParseError(format!("Invalid ciphertext hex: {}", e)))?;
    let key = derive_key(passphrase)?;
    decrypt(key.as_slice(), &ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [7u8; 32];
        let plaintext = b"this is a test private key";

        let ciphertext = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &ciphertext).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
        assert_ne!(plaintext.as_slice(), ciphertext.as_slice());
    }

    #[test]
    fn test_ciphertext_length_equals_plaintext() {
        let ciphertext = encrypt(&[1u8; 32], &[0u8; 64]).unwrap();
        assert_eq!(ciphertext.len(), 64);
    }

    #[test]
    fn test_encryption_is_deterministic() {
        // No nonce: the same key and plaintext always give the same ciphertext.
        let a = encrypt_private_key(&[9u8; 64], "password").unwrap();
        let b = encrypt_private_key(&[9u8; 64], "password").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encrypt_private_key_known_answer() {
        let encrypted = encrypt_private_key(&[9u8; 64], "password").unwrap();
        assert_eq!(
            encrypted,
            "569954e34c86b0b61bcc992360c36e24aafd3c58c4d0156e6a120fb57908717b\
             99fdf8fbfdb9b9742ded1b82910371a909ab337744f9c7b776730c21373c7d71"
        );

        let decrypted = decrypt_private_key(&encrypted, "password").unwrap();
        assert_eq!(decrypted.as_slice(), [9u8; 64].as_slice());
    }

    #[test]
    fn test_fixed_keystream_per_key() {
        let key = [3u8; 32];
        let a = [0x11u8; 48];
        let b = [0x5Au8; 48];

        let ca = encrypt(&key, &a).unwrap();
        let cb = encrypt(&key, &b).unwrap();

        let xor_cipher: Vec<u8> = ca.iter().zip(&cb).map(|(x, y)| x ^ y).collect();
        let xor_plain: Vec<u8> = a.iter().zip(&b).map(|(x, y)| x ^ y).collect();
        assert_eq!(xor_cipher, xor_plain);
    }

    #[test]
    fn test_counter_starts_at_one() {
        let key = [5u8; 32];
        let mut from_zero = [0u8; 32];
        let mut cipher = Aes256Ctr::new_from_slices(&key, &[0u8; 16]).unwrap();
        cipher.apply_keystream(&mut from_zero);

        let keystream = encrypt(&key, &[0u8; 16]).unwrap();

        // Block 1 of a zero-started counter is block 0 of ours.
        assert_eq!(keystream.as_slice(), &from_zero[16..]);
    }

    #[test]
    fn test_decrypt_wrong_passphrase_gives_garbage() {
        let private_key = [9u8; 64];
        let encrypted = encrypt_private_key(&private_key, "correct").unwrap();
        let decrypted = decrypt_private_key(&encrypted, "wrong").unwrap();

        assert_ne!(decrypted.as_slice(), private_key.as_slice());
    }

    #[test]
    fn test_decrypt_invalid_hex() {
        match decrypt_private_key("zz-not-hex", "password") {
            Err(KeybaseError::ParseError(msg)) => assert!(msg.contains("hex")),
            _ => panic!("Expected ParseError"),
        }
    }

    #[test]
    fn test_invalid_key_length() {
        match encrypt(&[0u8; 16], b"data") {
            Err(KeybaseError::EncryptionError(msg)) => assert!(msg.contains("Invalid key length")),
            _ => panic!("Expected EncryptionError"),
        }
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(matches!(
            encrypt_private_key(&[0u8; 64], ""),
            Err(KeybaseError::EmptyPassphraseError)
        ));
    }
}
