//! Key-value store contract and account records.
//!
//! The keybase persists everything through [`KvStore`]. Stores provide
//! last-write-wins semantics per key and nothing more: no ordering, no
//! transactions.

pub mod account;
pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use account::{Account, AccountRecord};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Prefix of the key an account record is stored under.
pub const ACCOUNT_KEY_PREFIX: &str = "account_";

/// Key of the ordered address index.
pub const ACCOUNT_INDEX_KEY: &str = "account_index";

/// Store key for the account at an address.
pub fn account_key(address_hex: &str) -> String {
    format!("{}{}", ACCOUNT_KEY_PREFIX, address_hex)
}

/// Pluggable key-value store.
///
/// Values are opaque bytes. Each call may suspend if the backend does I/O.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Insert or overwrite a value.
    async fn add(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Fetch a value, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove a value. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_key() {
        let address = "ab".repeat(20);
        assert_eq!(account_key(&address), format!("account_{}", address));
    }
}
