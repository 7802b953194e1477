//! Device identities, approval and the published registry

mod common;

use ::common::crypto::kdf::derive_registry_key;
use ::common::crypto::RootSecretKey;
use ::common::device::{accept_approval, ApprovalRequest, DeviceIdentity};
use ::common::metadata::{now_millis, AuthStatus, DeviceRegistry, Document};
use ::common::naming::{derive_registry_naming_keypair, ipfs_path, parse_ipfs_path, NamingRecord, RecordOptions};
use ::common::store::{ContentStore, MemoryStore};

async fn publish_registry(
    store: &MemoryStore,
    root: &RootSecretKey,
    registry: &DeviceRegistry,
    sequence: u64,
) {
    let key = derive_registry_key(root).unwrap();
    let naming = derive_registry_naming_keypair(root).unwrap();
    let cid = store.put(registry.seal(&key).unwrap()).await.unwrap();
    let record = naming
        .sign_record(ipfs_path(&cid), sequence, &RecordOptions::default())
        .unwrap();
    store.publish(naming.address(), record.marshal()).await.unwrap();
}

async fn load_registry(store: &MemoryStore, root: &RootSecretKey) -> (DeviceRegistry, u64) {
    let naming = derive_registry_naming_keypair(root).unwrap();
    let bytes = store.resolve(naming.address()).await.unwrap().unwrap();
    let record = NamingRecord::unmarshal(&bytes).unwrap();
    record.verify(naming.address(), None).unwrap();
    let cid = parse_ipfs_path(record.value_str().unwrap()).unwrap();
    let sealed = store.get(&cid).await.unwrap();
    let key = derive_registry_key(root).unwrap();
    (DeviceRegistry::unseal(&sealed, &key).unwrap(), record.sequence())
}

#[tokio::test]
async fn test_new_device_approval_and_registry() {
    common::init_tracing();
    let store = MemoryStore::new();
    let root = RootSecretKey::generate();

    // the first device registers itself as authorized
    let laptop = DeviceIdentity::generate();
    let mut registry = DeviceRegistry::new();
    registry.register(laptop.entry("laptop", "linux", "0.1.0", now_millis()));
    registry.authorize(laptop.id());
    publish_registry(&store, &root, &registry, 1).await;

    // a new device asks for the root identity
    let phone = DeviceIdentity::generate();
    let (request, mut ephemeral) = phone.request_approval();
    let request_json = serde_json::to_string(&request).unwrap();

    // the laptop approves it and records it in the registry
    let received: ApprovalRequest = serde_json::from_str(&request_json).unwrap();
    let answer = received.approve(&root).unwrap();
    let (mut registry, sequence) = load_registry(&store, &root).await;
    registry.register(phone.entry("phone", "ios", "0.1.0", now_millis()));
    registry.authorize(phone.id());
    publish_registry(&store, &root, &registry, sequence + 1).await;

    // the phone recovers the root identity and reads the registry itself
    let phone_root = accept_approval(&answer, &ephemeral).unwrap();
    ephemeral.clear();
    assert_eq!(phone_root.public(), root.public());
    let (seen, sequence) = load_registry(&store, &phone_root).await;
    assert_eq!(sequence, 2);
    assert_eq!(seen.authorized().count(), 2);
    assert_eq!(seen.get(phone.id()).unwrap().status, AuthStatus::Authorized);
}

#[tokio::test]
async fn test_registry_unreadable_without_root() {
    let store = MemoryStore::new();
    let root = RootSecretKey::generate();
    let mut registry = DeviceRegistry::new();
    registry.register(DeviceIdentity::generate().entry("desktop", "macos", "0.1.0", 0));
    publish_registry(&store, &root, &registry, 1).await;

    let other = RootSecretKey::generate();
    let ours = derive_registry_naming_keypair(&root).unwrap();
    assert_ne!(derive_registry_naming_keypair(&other).unwrap().address(), ours.address());

    let bytes = store.resolve(ours.address()).await.unwrap().unwrap();
    let record = NamingRecord::unmarshal(&bytes).unwrap();
    let cid = parse_ipfs_path(record.value_str().unwrap()).unwrap();
    let sealed = store.get(&cid).await.unwrap();
    assert!(DeviceRegistry::unseal(&sealed, &derive_registry_key(&other).unwrap()).is_err());
}
