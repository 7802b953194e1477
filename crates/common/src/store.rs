use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use cid::Cid;
use multihash::Multihash;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::naming::{NamingAddress, NamingRecord, MAX_RECORD_SIZE};

/// Multicodec for raw bytes
pub const RAW_CODEC: u64 = 0x55;
/// Multihash code for sha2-256
pub const SHA2_256_CODE: u64 = 0x12;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError<T> {
    #[error("unhandled content store error: {0}")]
    Provider(#[from] T),
    #[error("content not found: {0}")]
    NotFound(Cid),
    /// A published record failed verification, e.g. its sequence number
    ///  did not advance past the one already held for the address
    #[error("record rejected: {0}")]
    Rejected(CryptoError),
}

/// The storage and relay collaborator
///
/// Everything handed to a store is already sealed or signed: it only ever
///  sees ciphertext, content ids and marshaled naming records.
#[async_trait]
pub trait ContentStore: Send + Sync + Debug + Clone + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store bytes, returning their content identifier
    async fn put(&self, data: Vec<u8>) -> Result<Cid, StoreError<Self::Error>>;

    /// Fetch bytes by content identifier
    ///
    /// # Returns
    /// * `Err(StoreError::NotFound)` - Nothing is stored under `cid`
    async fn get(&self, cid: &Cid) -> Result<Vec<u8>, StoreError<Self::Error>>;

    /// Publish a marshaled naming record under `address`
    ///
    /// Should fail with `StoreError::Rejected` when the record does not
    ///  verify against `address` or does not advance its sequence number.
    async fn publish(
        &self,
        address: &NamingAddress,
        record: Vec<u8>,
    ) -> Result<(), StoreError<Self::Error>>;

    /// Resolve the latest marshaled record for `address`, if any
    async fn resolve(
        &self,
        address: &NamingAddress,
    ) -> Result<Option<Vec<u8>>, StoreError<Self::Error>>;
}

/// CIDv1 (raw, sha2-256) of `data`
pub fn raw_cid(data: &[u8]) -> Cid {
    let digest = Sha256::digest(data);
    // a 32-byte digest always fits the 64-byte multihash
    let hash = Multihash::<64>::wrap(SHA2_256_CODE, &digest)
        .expect("sha2-256 digest fits in a 64-byte multihash");
    Cid::new_v1(RAW_CODEC, hash)
}

/// In-memory content store, for tests and offline use
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
    /// Largest marshaled record `publish` accepts
    max_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            inner: Arc::default(),
            max_size: MAX_RECORD_SIZE,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    blobs: HashMap<Cid, Vec<u8>>,
    /// address -> (sequence, marshaled record)
    records: HashMap<NamingAddress, (u64, Vec<u8>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept published records up to `max_size` bytes, usually
    ///  `RecordOptions::max_size` from the loaded config
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn blob_count(&self) -> usize {
        self.inner.read().blobs.len()
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.inner.read().blobs.contains_key(cid)
    }

    /// Sequence number currently held for `address`
    pub fn sequence(&self, address: &NamingAddress) -> Option<u64> {
        self.inner.read().records.get(address).map(|(seq, _)| *seq)
    }

    /// Overwrite stored bytes without checks, to simulate a hostile store
    pub fn corrupt(&self, cid: &Cid, data: Vec<u8>) {
        self.inner.write().blobs.insert(*cid, data);
    }

    /// Overwrite a record without checks, to simulate a hostile relay
    pub fn force_record(&self, address: &NamingAddress, sequence: u64, record: Vec<u8>) {
        self.inner
            .write()
            .records
            .insert(*address, (sequence, record));
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    type Error = std::convert::Infallible;

    async fn put(&self, data: Vec<u8>) -> Result<Cid, StoreError<Self::Error>> {
        let cid = raw_cid(&data);
        tracing::trace!(%cid, size = data.len(), "stored blob");
        self.inner.write().blobs.insert(cid, data);
        Ok(cid)
    }

    async fn get(&self, cid: &Cid) -> Result<Vec<u8>, StoreError<Self::Error>> {
        self.inner
            .read()
            .blobs
            .get(cid)
            .cloned()
            .ok_or(StoreError::NotFound(*cid))
    }

    async fn publish(
        &self,
        address: &NamingAddress,
        record: Vec<u8>,
    ) -> Result<(), StoreError<Self::Error>> {
        let parsed =
            NamingRecord::unmarshal_with_limit(&record, self.max_size).map_err(StoreError::Rejected)?;

        let mut inner = self.inner.write();
        let last_seen = inner.records.get(address).map(|(seq, _)| *seq);
        parsed
            .verify(address, last_seen)
            .map_err(StoreError::Rejected)?;

        tracing::debug!(%address, sequence = parsed.sequence(), "published record");
        inner
            .records
            .insert(*address, (parsed.sequence(), record));
        Ok(())
    }

    async fn resolve(
        &self,
        address: &NamingAddress,
    ) -> Result<Option<Vec<u8>>, StoreError<Self::Error>> {
        Ok(self
            .inner
            .read()
            .records
            .get(address)
            .map(|(_, record)| record.clone()))
    }
}
