//! Cryptographic operations module.
//!
//! - Ed25519 keypairs, signing and verification
//! - Address derivation from public keys
//! - PBKDF2 passphrase key derivation
//! - AES-256-CTR encryption of private keys at rest
//! - Armored portable private keys (scrypt + AES-GCM)
//!
//! # Example
//!
//! ```rust
//! use keybase::crypto::address::address_from_public_key;
//! use keybase::crypto::ed25519::generate_keypair;
//! use keybase::crypto::encryption::{decrypt_private_key, encrypt_private_key};
//!
//! # fn example() -> keybase::error::Result<()> {
//! let keypair = generate_keypair(&[1u8; 32])?;
//! let address = address_from_public_key(&keypair.public_bytes());
//! assert_eq!(address.len(), 40);
//!
//! let encrypted = encrypt_private_key(keypair.private_key_bytes().as_slice(), "passphrase")?;
//! let decrypted = decrypt_private_key(&encrypted, "passphrase")?;
//! assert_eq!(keypair.private_key_bytes().as_slice(), decrypted.as_slice());
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod ed25519;
pub mod encryption;
pub mod password;
pub mod ppk;
