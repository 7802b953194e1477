//! Shared helpers for the integration tests
#![allow(dead_code)]

use common::crypto::{RootSecretKey, Secret, WrappedKey};
use common::metadata::{EncryptionMode, FileMetadata, FilePointer, MaybeMime};
use common::naming::RecordOptions;
use common::signer::LocalSigner;
use common::store::{ContentStore, MemoryStore};
use common::vault::{EncryptedVaultKeys, Vault};

/// Route core traces to the test harness output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("common=debug")
        .try_init();
}

/// A wallet with a fixed key, so derived identities are reproducible
pub fn wallet(seed: u8) -> LocalSigner {
    let mut bytes = [0u8; 32];
    bytes[31] = seed.max(1);
    let key = RootSecretKey::from_slice(&bytes).expect("small scalars are valid keys");
    LocalSigner::from(&key)
}

/// A fresh vault on an in-memory store, owned by a random root identity
pub async fn setup_vault() -> (MemoryStore, RootSecretKey, Vault<MemoryStore>, EncryptedVaultKeys) {
    let options = RecordOptions::default();
    let store = MemoryStore::new().with_max_size(options.max_size);
    let owner = RootSecretKey::generate();
    let (vault, wrapped) = Vault::create(store.clone(), &owner.public(), options)
        .await
        .unwrap();
    (store, owner, vault, wrapped)
}

/// Encrypt `content` under a fresh file key, store it and describe it
pub async fn store_file<S: ContentStore>(
    store: &S,
    owner: &RootSecretKey,
    name: &str,
    content: &[u8],
    mode: EncryptionMode,
    now: i64,
) -> (FileMetadata, Secret) {
    let file_key = Secret::generate();
    let iv = mode.generate_iv();
    let ciphertext = mode.encrypt(content, &file_key, &iv).unwrap();
    let cid = store.put(ciphertext).await.unwrap();

    let pointer = FilePointer {
        name: name.to_string(),
        cid: cid.to_string(),
        file_key: WrappedKey::wrap(file_key.bytes(), &owner.public()).unwrap(),
        file_iv: hex::encode(&iv),
        size: content.len() as u64,
        mime_type: MaybeMime::default(),
        encryption_mode: mode,
        created_at: now,
        modified_at: now,
        versions: vec![],
    };
    (FileMetadata::V1(pointer), file_key)
}
