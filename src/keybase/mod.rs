//! The keybase: encrypted account lifecycle and the lock/unlock state machine.
//!
//! Accounts are persisted encrypted through a [`KvStore`]. Unlocking decrypts
//! an account into an in-memory table owned by this instance; nothing
//! decrypted is ever written back.
//!
//! # Store consistency
//!
//! The store has no transactions, so record and index writes are ordered:
//!
//! - import writes the account record first, then appends to the index;
//! - delete removes the index entry first, then the record.
//!
//! A crash between the two steps can only leave an unindexed record behind,
//! never an index entry without a record. Re-importing the key re-indexes
//! such a record. An index entry with no record is reported as
//! `IndexCorruptError`.

mod unlocked;

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::KeybaseConfig;
use crate::crypto::address::{address_from_public_key, normalize_address_hex};
use crate::crypto::ed25519::{self, generate_keypair, keypair_from_private_key};
use crate::crypto::encryption::{decrypt_private_key, encrypt_private_key};
use crate::crypto::password::seed_from_passphrase;
use crate::crypto::ppk::{armor_private_key_with_cost, unarmor_private_key, DEFAULT_SCRYPT_LOG_N};
use crate::error::{KeybaseError, Result};
use crate::storage::{account_key, Account, FileStore, KvStore, ACCOUNT_INDEX_KEY};

pub use unlocked::UnlockedAccount;
use unlocked::UnlockedTable;

/// Manages encrypted accounts and their unlock state.
///
/// Unlock state belongs to the instance: two keybases over the same store
/// do not share it, and dropping a keybase locks everything it unlocked.
pub struct Keybase {
    store: Arc<dyn KvStore>,
    unlocked: Arc<Mutex<UnlockedTable>>,
    index_lock: Mutex<()>,
    ppk_scrypt_log_n: u8,
}

impl Keybase {
    /// Create a keybase over a store.
    ///
    /// # Example
    ///
    /// ```rust
    /// use keybase::keybase::Keybase;
    /// use keybase::storage::MemoryStore;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> keybase::error::Result<()> {
    /// let keybase = Keybase::new(Arc::new(MemoryStore::new()));
    /// let account = keybase.create_account("correct-horse").await?;
    /// assert_eq!(keybase.list_accounts().await?.len(), 1);
    /// # let _ = account;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            unlocked: Arc::new(Mutex::new(UnlockedTable::default())),
            index_lock: Mutex::new(()),
            ppk_scrypt_log_n: DEFAULT_SCRYPT_LOG_N,
        }
    }

    /// Open a file-backed keybase as described by a config.
    pub fn from_config(config: &KeybaseConfig) -> Result<Self> {
        let store = FileStore::open(&config.store_path)?;
        Ok(Self::new(Arc::new(store)).with_ppk_cost(config.ppk_scrypt_log_n))
    }

    /// Set the scrypt cost (log2 N) used by [`Keybase::export_ppk`].
    pub fn with_ppk_cost(mut self, log_n: u8) -> Self {
        self.ppk_scrypt_log_n = log_n;
        self
    }

    /// Generate a new account encrypted under `passphrase`.
    pub async fn create_account(&self, passphrase: &str) -> Result<Account> {
        if passphrase.is_empty() {
            return Err(KeybaseError::EmptyPassphraseError);
        }

        let seed = seed_from_passphrase(passphrase)?;
        let keypair = generate_keypair(seed.as_slice())?;
        let account = self
            .import_account(keypair.private_key_bytes().as_slice(), passphrase)
            .await?;

        info!(address = account.address_hex(), "Created account");
        Ok(account)
    }

    /// Encrypt and persist an existing 64-byte private key.
    ///
    /// Importing the same key again overwrites the record at its address
    /// without duplicating the index entry.
    pub async fn import_account(&self, private_key: &[u8], passphrase: &str) -> Result<Account> {
        if passphrase.is_empty() {
            return Err(KeybaseError::EmptyPassphraseError);
        }
        let keypair = keypair_from_private_key(private_key)?;

        let encrypted = encrypt_private_key(private_key, passphrase)?;
        let account = Account::new(keypair.public_bytes(), encrypted);
        self.persist_account(&account).await?;

        info!(address = account.address_hex(), "Imported account");
        Ok(account)
    }

    /// All indexed accounts, in index order.
    ///
    /// Fails on the first address whose record cannot be read.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let index = self.read_index().await?;
        let mut accounts = Vec::with_capacity(index.len());

        for address in index {
            match self.fetch_account(&address).await? {
                Some(account) => accounts.push(account),
                None => {
                    warn!(address = %address, "Indexed account has no record");
                    return Err(KeybaseError::IndexCorruptError(format!(
                        "Indexed address {} has no account record",
                        address
                    )));
                }
            }
        }

        Ok(accounts)
    }

    /// Look up the account at an address.
    pub async fn get_account(&self, address_hex: &str) -> Result<Account> {
        let address = normalize_address_hex(address_hex)?;
        let account = self.fetch_account(&address).await?;
        account.ok_or(KeybaseError::AccountNotFoundError(address))
    }

    /// Decrypt an account without adding it to the unlocked table.
    ///
    /// The decrypted key is checked against the stored address, so a wrong
    /// passphrase is reported as `WrongPassphraseError` rather than
    /// returning a garbage key.
    pub async fn get_unlocked_account(
        &self,
        address_hex: &str,
        passphrase: &str,
    ) -> Result<UnlockedAccount> {
        if passphrase.is_empty() {
            return Err(KeybaseError::EmptyPassphraseError);
        }

        let account = self.get_account(address_hex).await?;
        let private_key = decrypt_private_key(account.encrypted_private_key_hex(), passphrase)?;

        let keypair =
            keypair_from_private_key(&private_key).map_err(|_| KeybaseError::WrongPassphraseError)?;
        if address_from_public_key(&keypair.public_bytes()) != account.address_hex() {
            return Err(KeybaseError::WrongPassphraseError);
        }

        Ok(UnlockedAccount::new(account, private_key))
    }

    /// Delete an account. Requires the correct passphrase.
    pub async fn delete_account(&self, address_hex: &str, passphrase: &str) -> Result<()> {
        let unlocked = self.get_unlocked_account(address_hex, passphrase).await?;
        let address = unlocked.address_hex().to_string();
        drop(unlocked);

        self.remove_account(&address).await?;

        info!(address = %address, "Deleted account");
        Ok(())
    }

    /// Re-encrypt an account under a new passphrase.
    ///
    /// The old record is removed before the key is re-imported. If the
    /// re-import fails the account stays deleted.
    pub async fn update_account_passphrase(
        &self,
        address_hex: &str,
        old_passphrase: &str,
        new_passphrase: &str,
    ) -> Result<()> {
        if new_passphrase.is_empty() {
            return Err(KeybaseError::EmptyPassphraseError);
        }

        let unlocked = self.get_unlocked_account(address_hex, old_passphrase).await?;
        let address = unlocked.address_hex().to_string();

        self.remove_account(&address).await?;

        if let Err(e) = self
            .import_account(unlocked.private_key(), new_passphrase)
            .await
        {
            warn!(address = %address, error = %e, "Re-import failed; account left deleted");
            return Err(e);
        }

        info!(address = %address, "Updated account passphrase");
        Ok(())
    }

    /// Decrypt and hand the raw private key to the caller.
    pub async fn export_account(&self, address_hex: &str, passphrase: &str) -> Result<Vec<u8>> {
        let unlocked = self.get_unlocked_account(address_hex, passphrase).await?;
        Ok(unlocked.private_key().to_vec())
    }

    /// Export an account as an armored PPK under a transport passphrase.
    pub async fn export_ppk(
        &self,
        address_hex: &str,
        passphrase: &str,
        ppk_passphrase: &str,
        hint: &str,
    ) -> Result<String> {
        let unlocked = self.get_unlocked_account(address_hex, passphrase).await?;
        armor_private_key_with_cost(
            unlocked.private_key(),
            ppk_passphrase,
            hint,
            self.ppk_scrypt_log_n,
        )
    }

    /// Import an armored PPK, encrypting the key under `passphrase`.
    pub async fn import_ppk(
        &self,
        ppk_json: &str,
        ppk_passphrase: &str,
        passphrase: &str,
    ) -> Result<Account> {
        if passphrase.is_empty() {
            return Err(KeybaseError::EmptyPassphraseError);
        }

        let private_key = unarmor_private_key(ppk_json, ppk_passphrase)?;
        self.import_account(&private_key, passphrase).await
    }

    /// Decrypt, sign and discard. Does not touch the unlocked table.
    pub async fn sign(&self, address_hex: &str, passphrase: &str, payload: &[u8]) -> Result<Vec<u8>> {
        let unlocked = self.get_unlocked_account(address_hex, passphrase).await?;
        unlocked.sign(payload)
    }

    /// Sign with an account that is currently unlocked.
    pub async fn sign_with_unlocked_account(
        &self,
        address_hex: &str,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        let address = normalize_address_hex(address_hex)?;
        let table = self.unlocked.lock().await;

        let unlocked = table
            .get(&address)
            .ok_or_else(|| KeybaseError::NotUnlockedError(address.clone()))?;
        unlocked.sign(payload)
    }

    /// Verify a signature against a raw public key.
    pub fn verify_signature(public_key: &[u8], payload: &[u8], signature: &[u8]) -> bool {
        ed25519::verify(public_key, payload, signature)
    }

    /// Unlock an account for signing.
    ///
    /// A zero `unlock_period` keeps it unlocked until [`Keybase::lock_account`].
    /// Otherwise it re-locks once the period elapses. Unlocking an address
    /// that is already unlocked replaces the previous entry and its timer.
    pub async fn unlock_account(
        &self,
        address_hex: &str,
        passphrase: &str,
        unlock_period: Duration,
    ) -> Result<()> {
        // Held across the record read and the insert; removals take it too.
        let _guard = self.index_lock.lock().await;

        let unlocked = self.get_unlocked_account(address_hex, passphrase).await?;
        let address = unlocked.address_hex().to_string();

        let mut table = self.unlocked.lock().await;
        let generation = table.insert(unlocked);

        if !unlock_period.is_zero() {
            let handle = tokio::spawn(auto_lock(
                Arc::downgrade(&self.unlocked),
                address.clone(),
                generation,
                unlock_period,
            ));
            table.arm(&address, generation, handle);
        }

        info!(
            address = %address,
            unlock_period_ms = u64::try_from(unlock_period.as_millis()).unwrap_or(u64::MAX),
            "Unlocked account"
        );
        Ok(())
    }

    /// Lock an unlocked account, cancelling its auto-lock timer.
    pub async fn lock_account(&self, address_hex: &str) -> Result<()> {
        let address = normalize_address_hex(address_hex)?;

        if !self.unlocked.lock().await.remove(&address) {
            return Err(KeybaseError::NotUnlockedError(address));
        }

        info!(address = %address, "Locked account");
        Ok(())
    }

    /// Whether an address is currently unlocked.
    pub async fn is_unlocked(&self, address_hex: &str) -> bool {
        match normalize_address_hex(address_hex) {
            Ok(address) => self.unlocked.lock().await.contains(&address),
            Err(_) => false,
        }
    }

    /// Addresses currently unlocked, sorted.
    pub async fn unlocked_addresses(&self) -> Vec<String> {
        self.unlocked.lock().await.addresses()
    }

    async fn fetch_account(&self, address: &str) -> Result<Option<Account>> {
        debug!(address = %address, "Reading account record");
        match self.store.get(&account_key(address)).await? {
            Some(bytes) => Account::from_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn read_index(&self) -> Result<Vec<String>> {
        match self.store.get(ACCOUNT_INDEX_KEY).await? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                KeybaseError::IndexCorruptError(format!("Account index is unreadable: {}", e))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn write_index(&self, index: &[String]) -> Result<()> {
        debug!(entries = index.len(), "Writing account index");
        self.store
            .add(ACCOUNT_INDEX_KEY, serde_json::to_vec(index)?)
            .await
    }

    /// Record first, then index.
    async fn persist_account(&self, account: &Account) -> Result<()> {
        let _guard = self.index_lock.lock().await;

        let address = account.address_hex();
        self.store.add(&account_key(address), account.to_bytes()?).await?;

        let mut index = self.read_index().await?;
        if !index.iter().any(|entry| entry == address) {
            index.push(address.to_string());
            self.write_index(&index).await?;
        }

        Ok(())
    }

    /// Index first, then record. Also drops any unlocked entry.
    async fn remove_account(&self, address: &str) -> Result<()> {
        let _guard = self.index_lock.lock().await;

        self.unlocked.lock().await.remove(address);

        let mut index = self.read_index().await?;
        let before = index.len();
        index.retain(|entry| entry != address);
        if index.len() != before {
            self.write_index(&index).await?;
        }

        self.store.remove(&account_key(address)).await
    }
}

async fn auto_lock(
    table: Weak<Mutex<UnlockedTable>>,
    address: String,
    generation: u64,
    period: Duration,
) {
    tokio::time::sleep(period).await;

    let Some(table) = table.upgrade() else {
        return;
    };

    if table.lock().await.expire(&address, generation) {
        info!(address = %address, "Auto-locked account");
    } else {
        warn!(address = %address, generation, "Stale auto-lock timer ignored");
    }
}
