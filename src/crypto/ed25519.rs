//! Ed25519 key operations.
//!
//! Private keys are handled in their 64-byte expanded form, the 32-byte seed
//! followed by the 32-byte public key. This is the form accounts are encrypted
//! and exported in.

use crate::error::{KeybaseError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroizing;

/// Length of the seed a keypair is generated from.
pub const SEED_LENGTH: usize = 32;

/// Length of an expanded private key (seed || public key).
pub const PRIVATE_KEY_LENGTH: usize = 64;

/// Length of a public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of a signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// An Ed25519 keypair consisting of a secret key and public key.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub secret: SigningKey,
    pub public: VerifyingKey,
}

impl Keypair {
    /// Create a new keypair from a signing key.
    pub fn from_secret(secret: SigningKey) -> Self {
        let public = secret.verifying_key();
        Self { secret, public }
    }

    /// Get the public key as bytes.
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.public.to_bytes()
    }

    /// Get the expanded 64-byte private key.
    pub fn private_key_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LENGTH]> {
        Zeroizing::new(self.secret.to_keypair_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.secret.sign(message)
    }
}

/// Generate a keypair deterministically from a 32-byte seed.
///
/// The same seed always yields the same keypair.
///
/// # Example
///
/// ```
/// use keybase::crypto::ed25519::generate_keypair;
///
/// let a = generate_keypair(&[7u8; 32]).unwrap();
/// let b = generate_keypair(&[7u8; 32]).unwrap();
/// assert_eq!(a.public_bytes(), b.public_bytes());
/// ```
pub fn generate_keypair(seed: &[u8]) -> Result<Keypair> {
    let seed: &[u8; SEED_LENGTH] = seed.try_into().map_err(|_| {
        KeybaseError::CryptoError(format!(
            "Expected {} bytes of seed, got {}",
            SEED_LENGTH,
            seed.len()
        ))
    })?;
    Ok(Keypair::from_secret(SigningKey::from_bytes(seed)))
}

/// Rebuild a keypair from an expanded private key.
///
/// Fails with `InvalidPrivateKeyError` when the length is wrong or the
/// trailing public key does not belong to the leading seed.
pub fn keypair_from_private_key(private_key: &[u8]) -> Result<Keypair> {
    let bytes: &[u8; PRIVATE_KEY_LENGTH] = private_key.try_into().map_err(|_| {
        KeybaseError::InvalidPrivateKeyError(format!(
            "Expected {} bytes, got {}",
            PRIVATE_KEY_LENGTH,
            private_key.len()
        ))
    })?;

    let secret = SigningKey::from_keypair_bytes(bytes).map_err(|_| {
        KeybaseError::InvalidPrivateKeyError("Public key half does not match seed".to_string())
    })?;

    Ok(Keypair::from_secret(secret))
}

/// Structural check of an expanded private key.
pub fn validate_private_key(private_key: &[u8]) -> bool {
    keypair_from_private_key(private_key).is_ok()
}

/// Extract the public key of a valid expanded private key.
pub fn public_key_from_private_key(private_key: &[u8]) -> Result<[u8; PUBLIC_KEY_LENGTH]> {
    keypair_from_private_key(private_key).map(|keypair| keypair.public_bytes())
}

/// Sign a payload with an expanded private key.
pub fn sign(private_key: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let keypair = keypair_from_private_key(private_key)?;
    Ok(keypair.sign(payload).to_bytes().to_vec())
}

/// Verify a signature against a public key.
///
/// Malformed public keys or signatures verify as `false`.
pub fn verify(public_key: &[u8], payload: &[u8], signature: &[u8]) -> bool {
    let Ok(public_key) = <&[u8; PUBLIC_KEY_LENGTH]>::try_from(public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };

    verifying_key.verify(payload, &signature).is_ok()
}
