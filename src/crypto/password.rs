//! Passphrase key derivation.
//!
//! Account records are encrypted under PBKDF2-HMAC-SHA256 with a single
//! iteration, salted with the SHA-256 digest of the passphrase itself. The
//! salt is deterministic, so any record can be decrypted knowing only the
//! passphrase. Changing either parameter makes existing records unreadable.

use crate::crypto::ed25519::SEED_LENGTH;
use crate::error::{KeybaseError, Result};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// The length of the derived key.
pub const KEY_LENGTH: usize = 32;

/// PBKDF2 rounds used for account records.
pub const PBKDF2_ITERATIONS: u32 = 1;

/// Salt for a passphrase: its own SHA-256 digest.
pub fn passphrase_salt(passphrase: &str) -> [u8; 32] {
    Sha256::digest(passphrase.as_bytes()).into()
}

/// Derive the symmetric key for a passphrase.
///
/// # Example
///
/// ```
/// use keybase::crypto::password::{derive_key, KEY_LENGTH};
///
/// let key = derive_key("correct-horse").unwrap();
/// assert_eq!(key.len(), KEY_LENGTH);
/// ```
pub fn derive_key(passphrase: &str) -> Result<Zeroizing<[u8; KEY_LENGTH]>> {
    if passphrase.is_empty() {
        return Err(KeybaseError::EmptyPassphraseError);
    }

    let salt = passphrase_salt(passphrase);
    derive_key_with_salt(passphrase, &salt, PBKDF2_ITERATIONS)
}

/// Derive a symmetric key with an explicit salt and round count.
pub fn derive_key_with_salt(
    passphrase: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LENGTH]>> {
    if iterations == 0 {
        return Err(KeybaseError::KeyDerivationError(
            "Iteration count must be positive".to_string(),
        ));
    }

    let mut output = Zeroizing::new([0u8; KEY_LENGTH]);
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, &mut output[..]);
    Ok(output)
}

/// Produce 32 bytes of seed entropy for a new account.
///
/// A PRNG seeded from the passphrase mixed with OS entropy draws the raw
/// bytes, then a SHA-256 pass produces the seed.
///
/// The seed is not reproducible from the passphrase: two calls with the same
/// passphrase yield different accounts. The passphrase only protects the
/// stored record; it is not a recovery phrase.
pub fn seed_from_passphrase(passphrase: &str) -> Result<Zeroizing<[u8; SEED_LENGTH]>> {
    if passphrase.is_empty() {
        return Err(KeybaseError::EmptyPassphraseError);
    }

    let mut entropy = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(&mut entropy[..]);

    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());
    hasher.update(entropy.as_slice());
    let mut rng = StdRng::from_seed(hasher.finalize().into());

    let mut drawn = Zeroizing::new([0u8; SEED_LENGTH]);
    rng.fill_bytes(&mut drawn[..]);

    Ok(Zeroizing::new(Sha256::digest(drawn.as_slice()).into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_produces_correct_length() {
        let key = derive_key("test-password").unwrap();
        assert_eq!(key.len(), KEY_LENGTH);
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let key1 = derive_key("test-password").unwrap();
        let key2 = derive_key("test-password").unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn test_derive_key_different_passwords() {
        let key1 = derive_key("password1").unwrap();
        let key2 = derive_key("password2").unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn test_derive_key_uses_passphrase_digest_as_salt() {
        let salt = passphrase_salt("correct-horse");
        let explicit = derive_key_with_salt("correct-horse", &salt, 1).unwrap();
        let implicit = derive_key("correct-horse").unwrap();
        assert_eq!(*explicit, *implicit);
    }

    #[test]
    fn test_derive_key_known_answer() {
        let key = derive_key("password").unwrap();
        assert_eq!(
            hex::encode(key.as_slice()),
            "3475350712462ee2a51816eba19d820b14943156ee004dc56eb1ecbb2fa2f7c7"
        );
    }

    #[test]
    fn test_derive_key_round_count_matters() {
        let salt = passphrase_salt("pw");
        let one = derive_key_with_salt("pw", &salt, 1).unwrap();
        let two = derive_key_with_salt("pw", &salt, 2).unwrap();
        assert_ne!(*one, *two);
    }

    #[test]
    fn test_derive_key_empty_password() {
        match derive_key("") {
            Err(KeybaseError::EmptyPassphraseError) => {}
            _ => panic!("Expected EmptyPassphraseError"),
        }
    }

    #[test]
    fn test_derive_key_zero_iterations() {
        let result = derive_key_with_salt("pw", &[0u8; 32], 0);
        assert!(matches!(result, Err(KeybaseError::KeyDerivationError(_))));
    }

    #[test]
    fn test_seed_from_passphrase() {
        let seed1 = seed_from_passphrase("passphrase").unwrap();
        let seed2 = seed_from_passphrase("passphrase").unwrap();

        assert_eq!(seed1.len(), SEED_LENGTH);
        assert_ne!(*seed1, *seed2);
        assert!(matches!(
            seed_from_passphrase(""),
            Err(KeybaseError::EmptyPassphraseError)
        ));
    }
}
