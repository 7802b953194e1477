//! Vault bootstrap and the folder key lifecycle
//!
//! A vault is a tree of folders. Each folder owns a random symmetric key
//! and a random naming keypair; its listing is sealed under the key and
//! published under the keypair's address. The root folder's keys are the
//! vault keys, wrapped to the owner's root identity so an untrusted party
//! can hold them. Sub-folder keys travel wrapped inside their parent's
//! listing.

use cid::Cid;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{
    clear_bytes, RootPublicKey, RootSecretKey, Secret, SecretKey, WrappedKey,
};
use crate::error::CryptoError;
use crate::metadata::{now_millis, Document, FolderEntry, FolderMetadata};
use crate::naming::{ipfs_path, parse_ipfs_path, NamingAddress, NamingKeypair, NamingRecord, RecordOptions};
use crate::store::{raw_cid, ContentStore, StoreError};

#[derive(thiserror::Error, Debug)]
pub enum VaultError<E> {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("store error: {0}")]
    Store(#[from] StoreError<E>),
    #[error("nothing published at {0}")]
    NotPublished(NamingAddress),
    #[error("content does not match its id: {0}")]
    ContentMismatch(Cid),
}

/// A folder's symmetric key and naming keypair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderKeys {
    key: Secret,
    naming: NamingKeypair,
}

impl FolderKeys {
    pub fn generate() -> Self {
        Self {
            key: Secret::generate(),
            naming: NamingKeypair::generate(),
        }
    }

    pub fn key(&self) -> &Secret {
        &self.key
    }

    pub fn naming(&self) -> &NamingKeypair {
        &self.naming
    }

    pub fn address(&self) -> &NamingAddress {
        self.naming.address()
    }

    /// Wrap both keys for one principal
    pub fn wrap_for(&self, recipient: &RootPublicKey) -> Result<WrappedFolderKeys, CryptoError> {
        let folder_key = WrappedKey::wrap(self.key.bytes(), recipient)?;
        let mut naming_bytes = self.naming.secret().to_bytes();
        let naming_key = WrappedKey::wrap(&naming_bytes, recipient);
        clear_bytes(&mut naming_bytes);
        Ok(WrappedFolderKeys {
            address: *self.address(),
            folder_key,
            naming_key: naming_key?,
        })
    }

    /// A listing entry for this folder, readable by `recipient`
    pub fn entry(
        &self,
        name: &str,
        recipient: &RootPublicKey,
        now: i64,
    ) -> Result<FolderEntry, CryptoError> {
        let wrapped = self.wrap_for(recipient)?;
        Ok(FolderEntry {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            naming_address: wrapped.address,
            folder_key: wrapped.folder_key,
            naming_key: wrapped.naming_key,
            created_at: now,
            modified_at: now,
        })
    }

    /// Recover the keys of a sub-folder from its parent's listing
    pub fn from_entry(entry: &FolderEntry, root: &RootSecretKey) -> Result<Self, CryptoError> {
        WrappedFolderKeys {
            address: entry.naming_address,
            folder_key: entry.folder_key.clone(),
            naming_key: entry.naming_key.clone(),
        }
        .recover(root)
    }

    /// Replace both keys after a principal loses access
    ///
    /// The old keys are cleared. Returns the fresh keys and one wrapped copy
    /// per remaining principal, in order.
    pub fn rotate(
        mut self,
        remaining: &[RootPublicKey],
    ) -> Result<(FolderKeys, Vec<WrappedFolderKeys>), CryptoError> {
        let fresh = FolderKeys::generate();
        tracing::debug!(
            old = %self.address(),
            new = %fresh.address(),
            principals = remaining.len(),
            "rotated folder keys"
        );
        self.clear();
        let wrapped = remaining
            .iter()
            .map(|principal| fresh.wrap_for(principal))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((fresh, wrapped))
    }

    pub fn clear(&mut self) {
        self.key.clear();
        self.naming.clear();
    }
}

/// Folder keys wrapped for one principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedFolderKeys {
    pub address: NamingAddress,
    pub folder_key: WrappedKey,
    pub naming_key: WrappedKey,
}

impl WrappedFolderKeys {
    /// Unwrap both keys
    ///
    /// # Errors
    ///
    /// [`CryptoError::DecryptionFailed`] if either key does not unwrap, or
    /// the naming key does not belong to `address`.
    pub fn recover(&self, root: &RootSecretKey) -> Result<FolderKeys, CryptoError> {
        let key = Secret::from_slice(&self.folder_key.unwrap(root)?)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        let naming = SecretKey::from_slice(&self.naming_key.unwrap(root)?)
            .map(NamingKeypair::from)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        if *naming.address() != self.address {
            tracing::debug!(expected = %self.address, "unwrapped naming key for another address");
            return Err(CryptoError::DecryptionFailed);
        }
        Ok(FolderKeys { key, naming })
    }
}

/// Root folder key and root naming keypair of a vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultKeys {
    root: FolderKeys,
}

impl VaultKeys {
    pub fn generate() -> Self {
        Self {
            root: FolderKeys::generate(),
        }
    }

    pub fn root(&self) -> &FolderKeys {
        &self.root
    }

    pub fn folder_key(&self) -> &Secret {
        self.root.key()
    }

    pub fn naming(&self) -> &NamingKeypair {
        self.root.naming()
    }

    /// The root name, a pure function of the root naming public key
    pub fn address(&self) -> &NamingAddress {
        self.root.address()
    }

    pub fn wrap_for(&self, owner: &RootPublicKey) -> Result<EncryptedVaultKeys, CryptoError> {
        Ok(EncryptedVaultKeys {
            root: self.root.wrap_for(owner)?,
            created_at: now_millis(),
        })
    }

    pub fn clear(&mut self) {
        self.root.clear();
    }
}

/// Vault keys at rest, safe to hand to an untrusted store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedVaultKeys {
    pub root: WrappedFolderKeys,
    pub created_at: i64,
}

impl EncryptedVaultKeys {
    pub fn address(&self) -> &NamingAddress {
        &self.root.address
    }

    pub fn recover(&self, root: &RootSecretKey) -> Result<VaultKeys, CryptoError> {
        Ok(VaultKeys {
            root: self.root.recover(root)?,
        })
    }

    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string_pretty(self).map_err(|_| CryptoError::EncryptionFailed)
    }

    pub fn from_json(json: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(json).map_err(|e| {
            tracing::debug!(error = %e, "malformed vault keys");
            CryptoError::InvalidMetadataFormat
        })
    }
}

/// Seal `listing`, store it and publish a record pointing at it
pub async fn publish_listing<S: ContentStore>(
    store: &S,
    keys: &FolderKeys,
    listing: &FolderMetadata,
    sequence: u64,
    options: &RecordOptions,
) -> Result<Cid, VaultError<S::Error>> {
    let sealed = listing.seal(keys.key())?;
    let cid = store.put(sealed).await?;
    let record = keys.naming().sign_record(ipfs_path(&cid), sequence, options)?;
    store.publish(keys.address(), record.marshal()).await?;
    tracing::debug!(address = %keys.address(), %cid, sequence, "published listing");
    Ok(cid)
}

/// Resolve, verify, fetch and unseal the listing published for `keys`
///
/// Returns the listing and the sequence number of the record it was
/// reached through.
pub async fn resolve_listing<S: ContentStore>(
    store: &S,
    keys: &FolderKeys,
    last_seen: Option<u64>,
    options: &RecordOptions,
) -> Result<(FolderMetadata, u64), VaultError<S::Error>> {
    let address = keys.address();
    let bytes = store
        .resolve(address)
        .await?
        .ok_or(VaultError::NotPublished(*address))?;
    let record = NamingRecord::unmarshal_with_limit(&bytes, options.max_size)?;
    record.verify(address, last_seen)?;

    let cid = record
        .value_str()
        .and_then(parse_ipfs_path)
        .ok_or(CryptoError::InvalidMetadataFormat)?;
    let sealed = store.get(&cid).await?;
    if raw_cid(&sealed) != cid {
        return Err(VaultError::ContentMismatch(cid));
    }
    let listing = FolderMetadata::unseal(&sealed, keys.key())?;
    Ok((listing, record.sequence()))
}

/// An open vault bound to a content store
#[derive(Debug)]
pub struct Vault<S: ContentStore> {
    store: S,
    keys: VaultKeys,
    options: RecordOptions,
    sequence: u64,
}

impl<S: ContentStore> Vault<S> {
    /// Create a vault for `owner` and publish its empty root listing
    ///
    /// Returns the open vault and its keys wrapped for the owner.
    pub async fn create(
        store: S,
        owner: &RootPublicKey,
        options: RecordOptions,
    ) -> Result<(Self, EncryptedVaultKeys), VaultError<S::Error>> {
        let keys = VaultKeys::generate();
        let wrapped = keys.wrap_for(owner)?;
        let mut vault = Self {
            store,
            keys,
            options,
            sequence: 0,
        };
        vault.publish_root(&FolderMetadata::new()).await?;
        tracing::info!(address = %vault.address(), "created vault");
        Ok((vault, wrapped))
    }

    /// Recover the vault keys and load the current root listing
    pub async fn open(
        store: S,
        wrapped: &EncryptedVaultKeys,
        root: &RootSecretKey,
        options: RecordOptions,
    ) -> Result<(Self, FolderMetadata), VaultError<S::Error>> {
        let keys = wrapped.recover(root)?;
        let (listing, sequence) = resolve_listing(&store, keys.root(), None, &options).await?;
        tracing::debug!(address = %keys.address(), sequence, "opened vault");
        Ok((
            Self {
                store,
                keys,
                options,
                sequence,
            },
            listing,
        ))
    }

    pub fn address(&self) -> &NamingAddress {
        self.keys.address()
    }

    pub fn keys(&self) -> &VaultKeys {
        &self.keys
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sequence number of the last root record published or accepted
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Publish `listing` as the new root under the next sequence number
    pub async fn publish_root(&mut self, listing: &FolderMetadata) -> Result<Cid, VaultError<S::Error>> {
        let next = self.sequence + 1;
        let cid = publish_listing(&self.store, self.keys.root(), listing, next, &self.options).await?;
        self.sequence = next;
        Ok(cid)
    }

    /// Load the root listing if a newer one has been published
    ///
    /// A record at the sequence number already held is ignored; anything
    /// older is rejected.
    pub async fn refresh(&mut self) -> Result<Option<FolderMetadata>, VaultError<S::Error>> {
        let address = self.keys.address();
        let bytes = self
            .store
            .resolve(address)
            .await?
            .ok_or(VaultError::NotPublished(*address))?;
        let current = NamingRecord::unmarshal_with_limit(&bytes, self.options.max_size)?;
        if current.sequence() == self.sequence {
            return Ok(None);
        }
        let (listing, sequence) =
            resolve_listing(&self.store, self.keys.root(), Some(self.sequence), &self.options).await?;
        self.sequence = sequence;
        Ok(Some(listing))
    }

    /// Create a sub-folder readable by `owner`
    ///
    /// Publishes the new folder's empty listing and adds its entry to
    /// `parent`; the caller republishes the parent.
    pub async fn create_folder(
        &self,
        parent: &mut FolderMetadata,
        name: &str,
        owner: &RootPublicKey,
    ) -> Result<FolderKeys, VaultError<S::Error>> {
        let keys = FolderKeys::generate();
        let entry = keys.entry(name, owner, now_millis())?;
        publish_listing(&self.store, &keys, &FolderMetadata::new(), 1, &self.options).await?;
        parent.add_folder(entry)?;
        Ok(keys)
    }

    /// Unwrap a sub-folder's keys and load its listing
    pub async fn open_folder(
        &self,
        entry: &FolderEntry,
        root: &RootSecretKey,
    ) -> Result<(FolderKeys, FolderMetadata, u64), VaultError<S::Error>> {
        let keys = FolderKeys::from_entry(entry, root)?;
        let (listing, sequence) = resolve_listing(&self.store, &keys, None, &self.options).await?;
        Ok((keys, listing, sequence))
    }

    /// Clear the vault keys
    pub fn close(mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_vault_keys_wrap_recover() {
        let owner = RootSecretKey::generate();
        let keys = VaultKeys::generate();
        let wrapped = keys.wrap_for(&owner.public()).unwrap();
        assert_eq!(wrapped.address(), keys.address());

        let json = wrapped.to_json().unwrap();
        let recovered = EncryptedVaultKeys::from_json(&json)
            .unwrap()
            .recover(&owner)
            .unwrap();
        assert_eq!(recovered, keys);

        assert_eq!(
            wrapped.recover(&RootSecretKey::generate()).unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn test_swapped_naming_key_rejected() {
        let owner = RootSecretKey::generate();
        let mut wrapped = VaultKeys::generate().wrap_for(&owner.public()).unwrap();
        let other = VaultKeys::generate().wrap_for(&owner.public()).unwrap();
        wrapped.root.naming_key = other.root.naming_key;
        assert_eq!(wrapped.recover(&owner).unwrap_err(), CryptoError::DecryptionFailed);
    }

    #[test]
    fn test_rotate_rewraps_for_remaining() {
        let alice = RootSecretKey::generate();
        let bob = RootSecretKey::generate();
        let keys = FolderKeys::generate();
        let old_address = *keys.address();

        let (fresh, wrapped) = keys.rotate(&[alice.public(), bob.public()]).unwrap();
        assert_ne!(*fresh.address(), old_address);
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[0].recover(&alice).unwrap(), fresh);
        assert_eq!(wrapped[1].recover(&bob).unwrap(), fresh);
        assert!(wrapped[0].recover(&bob).is_err());
    }

    #[tokio::test]
    async fn test_create_open_publish() {
        let owner = RootSecretKey::generate();
        let store = MemoryStore::new();
        let options = RecordOptions::default();

        let (mut vault, wrapped) = Vault::create(store.clone(), &owner.public(), options)
            .await
            .unwrap();
        assert_eq!(vault.sequence(), 1);
        assert_eq!(store.sequence(vault.address()), Some(1));

        let mut listing = FolderMetadata::new();
        let docs = vault
            .create_folder(&mut listing, "docs", &owner.public())
            .await
            .unwrap();
        vault.publish_root(&listing).await.unwrap();
        assert_eq!(vault.sequence(), 2);

        let (reader, loaded) = Vault::open(store.clone(), &wrapped, &owner, options)
            .await
            .unwrap();
        assert_eq!(reader.sequence(), 2);
        assert_eq!(loaded, listing);

        let entry = loaded.folders()[0].clone();
        let (keys, sub, sequence) = reader.open_folder(&entry, &owner).await.unwrap();
        assert_eq!(keys, docs);
        assert!(sub.is_empty());
        assert_eq!(sequence, 1);
    }

    #[tokio::test]
    async fn test_refresh_sees_only_newer_roots() {
        let owner = RootSecretKey::generate();
        let store = MemoryStore::new();
        let options = RecordOptions::default();
        let (mut writer, wrapped) = Vault::create(store.clone(), &owner.public(), options)
            .await
            .unwrap();
        let (mut reader, _) = Vault::open(store.clone(), &wrapped, &owner, options)
            .await
            .unwrap();

        assert!(reader.refresh().await.unwrap().is_none());

        let mut listing = FolderMetadata::new();
        writer
            .create_folder(&mut listing, "photos", &owner.public())
            .await
            .unwrap();
        writer.publish_root(&listing).await.unwrap();

        assert_eq!(reader.refresh().await.unwrap(), Some(listing));
        assert_eq!(reader.sequence(), 2);
    }

    #[tokio::test]
    async fn test_substituted_content_rejected() {
        let owner = RootSecretKey::generate();
        let store = MemoryStore::new();
        let options = RecordOptions::default();
        let (mut vault, wrapped) = Vault::create(store.clone(), &owner.public(), options)
            .await
            .unwrap();
        // an older listing sealed under the same key, served under the new id
        let old = FolderMetadata::new().seal(vault.keys().folder_key()).unwrap();
        let mut listing = FolderMetadata::new();
        vault
            .create_folder(&mut listing, "docs", &owner.public())
            .await
            .unwrap();
        let cid = vault.publish_root(&listing).await.unwrap();
        store.corrupt(&cid, old);

        assert!(matches!(
            Vault::open(store, &wrapped, &owner, options).await,
            Err(VaultError::ContentMismatch(c)) if c == cid
        ));
    }

    #[tokio::test]
    async fn test_open_unpublished_vault() {
        let owner = RootSecretKey::generate();
        let wrapped = VaultKeys::generate().wrap_for(&owner.public()).unwrap();
        assert!(matches!(
            Vault::open(MemoryStore::new(), &wrapped, &owner, RecordOptions::default()).await,
            Err(VaultError::NotPublished(_))
        ));
    }
}
