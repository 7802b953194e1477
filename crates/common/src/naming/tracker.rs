//! Per-address sequence bookkeeping on the consumer side

use std::collections::HashMap;

use super::{NamingAddress, NamingRecord};
use crate::error::CryptoError;

/// Last accepted sequence number per address
///
/// Verification itself is stateless; a consumer that resolves the same
/// addresses repeatedly keeps one of these to enforce monotonicity across
/// calls. Concurrent publishers must still be serialized by the store.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    seen: HashMap<NamingAddress, u64>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self, address: &NamingAddress) -> Option<u64> {
        self.seen.get(address).copied()
    }

    /// Sequence number a publisher should use next for `address`
    pub fn next_sequence(&self, address: &NamingAddress) -> u64 {
        self.last_seen(address).map_or(1, |last| last.saturating_add(1))
    }

    /// Record `sequence` as seen, never moving backwards
    pub fn observe(&mut self, address: NamingAddress, sequence: u64) {
        let entry = self.seen.entry(address).or_insert(sequence);
        *entry = (*entry).max(sequence);
    }

    /// Verify `record` against the last sequence seen for `address` and
    /// remember it on success
    pub fn verify_and_observe(
        &mut self,
        record: &NamingRecord,
        address: &NamingAddress,
    ) -> Result<(), CryptoError> {
        record.verify(address, self.last_seen(address))?;
        self.observe(*address, record.sequence());
        Ok(())
    }

    pub fn forget(&mut self, address: &NamingAddress) {
        self.seen.remove(address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretKey;
    use crate::naming::RecordOptions;

    #[test]
    fn test_replay_rejected_after_observe() {
        let key = SecretKey::generate();
        let address = NamingAddress::from_public_key(&key.public());
        let options = RecordOptions::default();
        let mut tracker = SequenceTracker::new();

        assert_eq!(tracker.next_sequence(&address), 1);
        let first = NamingRecord::create(&key, "/ipfs/a", 1, &options).unwrap();
        tracker.verify_and_observe(&first, &address).unwrap();
        assert_eq!(tracker.last_seen(&address), Some(1));
        assert_eq!(tracker.next_sequence(&address), 2);

        assert_eq!(
            tracker.verify_and_observe(&first, &address).unwrap_err(),
            CryptoError::VerificationFailed
        );

        let second = NamingRecord::create(&key, "/ipfs/b", 2, &options).unwrap();
        tracker.verify_and_observe(&second, &address).unwrap();
        assert_eq!(tracker.last_seen(&address), Some(2));
    }

    #[test]
    fn test_observe_is_monotonic() {
        let address = NamingAddress::from_public_key(&SecretKey::generate().public());
        let mut tracker = SequenceTracker::new();
        tracker.observe(address, 7);
        tracker.observe(address, 3);
        assert_eq!(tracker.last_seen(&address), Some(7));
        tracker.forget(&address);
        assert_eq!(tracker.last_seen(&address), None);
    }
}
