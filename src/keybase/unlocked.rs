//! Decrypted accounts and the table of currently unlocked ones.

use std::collections::HashMap;
use std::fmt;

use tokio::task::JoinHandle;
use zeroize::Zeroizing;

use crate::crypto::ed25519;
use crate::error::Result;
use crate::storage::Account;

/// An account together with its plaintext private key.
///
/// Never serialized and never written to a store. The key is zeroized on drop.
pub struct UnlockedAccount {
    account: Account,
    private_key: Zeroizing<Vec<u8>>,
}

impl UnlockedAccount {
    pub(crate) fn new(account: Account, private_key: Zeroizing<Vec<u8>>) -> Self {
        Self {
            account,
            private_key,
        }
    }

    pub fn address_hex(&self) -> &str {
        self.account.address_hex()
    }

    pub fn public_key(&self) -> &[u8] {
        self.account.public_key()
    }

    /// The expanded 64-byte private key.
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Sign a payload with the plaintext key.
    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        ed25519::sign(&self.private_key, payload)
    }
}

impl fmt::Debug for UnlockedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedAccount")
            .field("account", &self.account)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

struct UnlockedEntry {
    account: UnlockedAccount,
    generation: u64,
    auto_lock: Option<JoinHandle<()>>,
}

impl Drop for UnlockedEntry {
    fn drop(&mut self) {
        if let Some(handle) = self.auto_lock.take() {
            handle.abort();
        }
    }
}

/// Unlocked accounts keyed by address.
///
/// Every insertion gets a fresh generation number. An auto-lock timer only
/// removes the entry whose generation it was armed for, so a stale timer
/// can never re-lock a newer unlock of the same address.
#[derive(Default)]
pub(crate) struct UnlockedTable {
    entries: HashMap<String, UnlockedEntry>,
    next_generation: u64,
}

impl UnlockedTable {
    /// Insert or replace the entry for an address, returning its generation.
    ///
    /// A replaced entry's timer is aborted.
    pub(crate) fn insert(&mut self, account: UnlockedAccount) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        let address = account.address_hex().to_string();

        self.entries.insert(
            address,
            UnlockedEntry {
                account,
                generation,
                auto_lock: None,
            },
        );

        generation
    }

    /// Attach an auto-lock timer to the entry of the given generation.
    ///
    /// The timer is aborted immediately if that entry is already gone.
    pub(crate) fn arm(&mut self, address: &str, generation: u64, handle: JoinHandle<()>) {
        match self.entries.get_mut(address) {
            Some(entry) if entry.generation == generation => entry.auto_lock = Some(handle),
            _ => handle.abort(),
        }
    }

    pub(crate) fn get(&self, address: &str) -> Option<&UnlockedAccount> {
        self.entries.get(address).map(|entry| &entry.account)
    }

    pub(crate) fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    /// Remove an entry, aborting its timer. Returns whether it existed.
    pub(crate) fn remove(&mut self, address: &str) -> bool {
        self.entries.remove(address).is_some()
    }

    /// Timer-side removal: only if the entry is still the given generation.
    pub(crate) fn expire(&mut self, address: &str, generation: u64) -> bool {
        let current = matches!(
            self.entries.get(address),
            Some(entry) if entry.generation == generation
        );
        if !current {
            return false;
        }

        if let Some(mut entry) = self.entries.remove(address) {
            // The calling task is this timer; detach instead of aborting it.
            drop(entry.auto_lock.take());
        }
        true
    }

    pub(crate) fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.entries.keys().cloned().collect();
        addresses.sort();
        addresses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ed25519::generate_keypair;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn unlocked(seed: u8) -> UnlockedAccount {
        let keypair = generate_keypair(&[seed; 32]).unwrap();
        let account = Account::new(keypair.public_bytes(), String::new());
        UnlockedAccount::new(account, Zeroizing::new(keypair.private_key_bytes().to_vec()))
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let account = unlocked(1);
        let debug = format!("{:?}", account);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&hex::encode(account.private_key())));
    }

    #[test]
    fn test_unlocked_account_signs() {
        let account = unlocked(2);
        let signature = account.sign(b"payload").unwrap();
        assert!(ed25519::verify(account.public_key(), b"payload", &signature));
    }

    #[test]
    fn test_generations_increase() {
        let mut table = UnlockedTable::default();
        let first = table.insert(unlocked(3));
        let second = table.insert(unlocked(3));

        assert!(second > first);
        assert_eq!(table.addresses().len(), 1);
    }

    #[test]
    fn test_expire_ignores_stale_generation() {
        let mut table = UnlockedTable::default();
        let account = unlocked(4);
        let address = account.address_hex().to_string();

        let stale = table.insert(account);
        let fresh = table.insert(unlocked(4));

        assert!(!table.expire(&address, stale));
        assert!(table.contains(&address));
        assert!(table.expire(&address, fresh));
        assert!(!table.contains(&address));
    }

    #[test]
    fn test_remove() {
        let mut table = UnlockedTable::default();
        let account = unlocked(5);
        let address = account.address_hex().to_string();

        table.insert(account);
        assert!(table.get(&address).is_some());
        assert!(table.remove(&address));
        assert!(!table.remove(&address));
    }

    #[tokio::test]
    async fn test_remove_aborts_timer() {
        let mut table = UnlockedTable::default();
        let account = unlocked(6);
        let address = account.address_hex().to_string();
        let generation = table.insert(account);

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _tx = tx;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        table.arm(&address, generation, handle);

        table.remove(&address);
        let dropped = tokio::time::timeout(Duration::from_secs(5), rx).await;
        assert!(matches!(dropped, Ok(Err(_))));
    }

    #[tokio::test]
    async fn test_arm_stale_generation_aborts() {
        let mut table = UnlockedTable::default();
        let account = unlocked(7);
        let address = account.address_hex().to_string();
        let stale = table.insert(account);
        table.insert(unlocked(7));

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _tx = tx;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        table.arm(&address, stale, handle);

        let dropped = tokio::time::timeout(Duration::from_secs(5), rx).await;
        assert!(matches!(dropped, Ok(Err(_))));
    }
}
