//! Keybase: a local encrypted vault for Ed25519 blockchain accounts.
//!
//! This library lets callers:
//!
//! - Generate or import Ed25519 keypairs
//! - Store private keys encrypted under a passphrase through a pluggable
//!   key-value store
//! - Unlock accounts for a bounded period and sign with them
//! - Move keys between vaults as armored portable private keys
//!
//! # Architecture
//!
//! [`keybase::Keybase`] is the only stateful component. It reads and writes
//! [`storage::Account`] records through a [`storage::KvStore`] and keeps
//! decrypted keys in a per-instance table with timed re-locking. All
//! operations return [`error::Result`].
//!
//! # Example
//!
//! ```rust
//! use keybase::keybase::Keybase;
//! use keybase::storage::MemoryStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> keybase::error::Result<()> {
//! let keybase = Keybase::new(Arc::new(MemoryStore::new()));
//! let account = keybase.create_account("correct-horse").await?;
//!
//! keybase
//!     .unlock_account(account.address_hex(), "correct-horse", Duration::from_secs(60))
//!     .await?;
//! let signature = keybase
//!     .sign_with_unlocked_account(account.address_hex(), b"payload")
//!     .await?;
//! assert!(Keybase::verify_signature(account.public_key(), b"payload", &signature));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod keybase;
pub mod storage;

// Re-export commonly used types
pub use config::KeybaseConfig;
pub use error::{KeybaseError, Result};
pub use keybase::{Keybase, UnlockedAccount};
pub use storage::{Account, KvStore};
