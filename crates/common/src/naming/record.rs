//! Signed, sequence-numbered naming records
//!
//! A record moves through `unsigned -> signed -> marshaled` on the producer
//! side and `unmarshal -> verify -> accepted | rejected` on any consumer.
//!
//! # Wire Format
//!
//! The marshaled form is a protobuf entry. The current signature form signs
//! `"ipns-signature:" || data`, where `data` is the DAG-CBOR map
//!
//! ```text
//! { Value, Validity, ValidityType, Sequence, TTL }
//! ```
//!
//! The legacy form signs `value || validity || "EOL"`. New records carry only
//! the current form. Verifiers prefer it and fall back to the legacy one only
//! for entries written by older software that lack it.

use std::collections::BTreeMap;
use std::time::Duration;

use ipld_core::ipld::Ipld;
use prost::Message;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use super::address::{decode_public_key, encode_public_key, NamingAddress};
use super::proto::{RecordEntry, VALIDITY_EOL};
use crate::crypto::{PublicKey, SecretKey};
use crate::error::CryptoError;

/// Domain-separation prefix of the current signature form
pub const SIGNATURE_V2_PREFIX: &[u8] = b"ipns-signature:";
/// Default ceiling on the marshaled size of a record
pub const MAX_RECORD_SIZE: usize = 10 * 1024;
/// Default validity window of a new record
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);
/// Default resolver cache hint
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

const LEGACY_SUFFIX: &[u8] = b"EOL";

/// How new records are produced and how large a consumer lets them be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOptions {
    pub lifetime: Duration,
    pub ttl: Duration,
    pub max_size: usize,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_LIFETIME,
            ttl: DEFAULT_TTL,
            max_size: MAX_RECORD_SIZE,
        }
    }
}

fn reject(reason: &'static str) -> CryptoError {
    tracing::debug!(reason, "naming record rejected");
    CryptoError::VerificationFailed
}

fn format_validity(at: OffsetDateTime) -> Result<String, CryptoError> {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
    );
    at.to_offset(UtcOffset::UTC)
        .format(&format)
        .map_err(|_| CryptoError::SigningFailed)
}

fn parse_validity(validity: &[u8]) -> Option<OffsetDateTime> {
    let text = std::str::from_utf8(validity).ok()?;
    OffsetDateTime::parse(text, &Rfc3339).ok()
}

fn legacy_message(value: &[u8], validity: &[u8]) -> Vec<u8> {
    [value, validity, LEGACY_SUFFIX].concat()
}

fn signed_message(data: &[u8]) -> Vec<u8> {
    [SIGNATURE_V2_PREFIX, data].concat()
}

fn encode_data(value: &[u8], validity: &[u8], sequence: u64, ttl: u64) -> Result<Vec<u8>, CryptoError> {
    let map = BTreeMap::from([
        ("Value".to_string(), Ipld::Bytes(value.to_vec())),
        ("Validity".to_string(), Ipld::Bytes(validity.to_vec())),
        ("ValidityType".to_string(), Ipld::Integer(VALIDITY_EOL.into())),
        ("Sequence".to_string(), Ipld::Integer(sequence.into())),
        ("TTL".to_string(), Ipld::Integer(ttl.into())),
    ]);
    serde_ipld_dagcbor::to_vec(&Ipld::Map(map)).map_err(|_| CryptoError::SigningFailed)
}

/// Record fields assembled at the producer, not yet signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedRecord {
    value: Vec<u8>,
    expires: OffsetDateTime,
    sequence: u64,
    ttl: u64,
}

impl UnsignedRecord {
    /// Assemble a record valid for `options.lifetime` from now
    pub fn new(
        value: impl Into<Vec<u8>>,
        sequence: u64,
        options: &RecordOptions,
    ) -> Result<Self, CryptoError> {
        Self::new_at(value, sequence, options, OffsetDateTime::now_utc())
    }

    /// Assemble a record valid for `options.lifetime` from `now`
    pub fn new_at(
        value: impl Into<Vec<u8>>,
        sequence: u64,
        options: &RecordOptions,
        now: OffsetDateTime,
    ) -> Result<Self, CryptoError> {
        let lifetime =
            time::Duration::try_from(options.lifetime).map_err(|_| CryptoError::SigningFailed)?;
        let expires = now
            .checked_add(lifetime)
            .ok_or(CryptoError::SigningFailed)?;
        Ok(Self {
            value: value.into(),
            expires,
            sequence,
            ttl: u64::try_from(options.ttl.as_nanos()).unwrap_or(u64::MAX),
        })
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Sign the record over its full signed data
    pub fn sign(self, key: &SecretKey) -> Result<NamingRecord, CryptoError> {
        let validity = format_validity(self.expires)?.into_bytes();
        let data = encode_data(&self.value, &validity, self.sequence, self.ttl)?;
        let signature_v2 = key.sign(&signed_message(&data)).to_vec();

        tracing::debug!(
            address = %NamingAddress::from_public_key(&key.public()),
            sequence = self.sequence,
            "signed naming record"
        );

        Ok(NamingRecord {
            entry: RecordEntry {
                value: Some(self.value),
                signature_v1: None,
                validity_type: Some(VALIDITY_EOL),
                validity: Some(validity),
                sequence: Some(self.sequence),
                ttl: Some(self.ttl),
                pub_key: Some(encode_public_key(&key.public())),
                signature_v2: Some(signature_v2),
                data: Some(data),
            },
        })
    }
}

/// A signed naming record
///
/// Produced by [`UnsignedRecord::sign`] or [`NamingRecord::unmarshal`].
/// An unmarshaled record is untrusted until [`NamingRecord::verify`]
/// returns `Ok`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamingRecord {
    entry: RecordEntry,
}

impl NamingRecord {
    /// Assemble and sign in one step
    pub fn create(
        key: &SecretKey,
        value: impl Into<Vec<u8>>,
        sequence: u64,
        options: &RecordOptions,
    ) -> Result<Self, CryptoError> {
        UnsignedRecord::new(value, sequence, options)?.sign(key)
    }

    /// Fixed binary encoding ready for publishing
    pub fn marshal(&self) -> Vec<u8> {
        self.entry.encode_to_vec()
    }

    /// Decode a record no larger than [`MAX_RECORD_SIZE`]
    pub fn unmarshal(bytes: &[u8]) -> Result<Self, CryptoError> {
        Self::unmarshal_with_limit(bytes, MAX_RECORD_SIZE)
    }

    /// Decode a record no larger than `max_size`
    ///
    /// # Errors
    ///
    /// [`CryptoError::VerificationFailed`] for oversized or undecodable
    /// bytes, or when the value, validity or sequence is missing.
    pub fn unmarshal_with_limit(bytes: &[u8], max_size: usize) -> Result<Self, CryptoError> {
        if bytes.len() > max_size {
            return Err(reject("record too large"));
        }
        let entry = RecordEntry::decode(bytes).map_err(|_| reject("undecodable record"))?;
        if entry.value.is_none() || entry.validity.is_none() || entry.sequence.is_none() {
            return Err(reject("missing required field"));
        }
        Ok(Self { entry })
    }

    /// The target this record resolves to
    pub fn value(&self) -> &[u8] {
        self.entry.value.as_deref().unwrap_or_default()
    }

    /// The target as text, when it is valid UTF-8
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value()).ok()
    }

    pub fn sequence(&self) -> u64 {
        self.entry.sequence.unwrap_or_default()
    }

    /// End of the validity window, if it parses
    pub fn validity(&self) -> Option<OffsetDateTime> {
        parse_validity(self.entry.validity.as_deref().unwrap_or_default())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_nanos(self.entry.ttl.unwrap_or_default())
    }

    /// The embedded public key, if present and well-formed
    pub fn public_key(&self) -> Option<PublicKey> {
        self.entry
            .pub_key
            .as_deref()
            .and_then(|bytes| decode_public_key(bytes).ok())
    }

    pub fn has_legacy_signature(&self) -> bool {
        self.entry.signature_v1.is_some()
    }

    pub fn has_signature_v2(&self) -> bool {
        self.entry.signature_v2.is_some()
    }

    /// Verify against the expected address at the current time
    pub fn verify(&self, expected: &NamingAddress, last_seen: Option<u64>) -> Result<(), CryptoError> {
        self.verify_at(expected, last_seen, OffsetDateTime::now_utc())
    }

    /// Verify against the expected address at `now`
    ///
    /// The record is accepted only if the key matches `expected`, a
    /// signature checks out, the signed data agrees with the outer fields,
    /// the validity window has not passed, and the sequence number is
    /// strictly greater than `last_seen`.
    ///
    /// # Errors
    ///
    /// Every failure is [`CryptoError::VerificationFailed`].
    pub fn verify_at(
        &self,
        expected: &NamingAddress,
        last_seen: Option<u64>,
        now: OffsetDateTime,
    ) -> Result<(), CryptoError> {
        let public_key = match &self.entry.pub_key {
            Some(bytes) => decode_public_key(bytes).map_err(|_| reject("malformed embedded key"))?,
            None => expected
                .public_key()
                .map_err(|_| reject("address does not inline a key"))?,
        };
        if NamingAddress::from_public_key(&public_key) != *expected {
            return Err(reject("address mismatch"));
        }

        let value = self.value();
        let validity = self.entry.validity.as_deref().unwrap_or_default();

        match (&self.entry.signature_v2, &self.entry.data) {
            (Some(signature), Some(data)) => {
                public_key
                    .verify(&signed_message(data), signature)
                    .map_err(|_| reject("bad signature"))?;
                self.check_signed_data(data)?;
            }
            (Some(_), None) => return Err(reject("signature without data")),
            // Legacy entries only. The V1 signature covers value and validity,
            // so sequence and TTL are unauthenticated on this path.
            (None, _) => {
                let signature = self
                    .entry
                    .signature_v1
                    .as_ref()
                    .ok_or_else(|| reject("unsigned record"))?;
                public_key
                    .verify(&legacy_message(value, validity), signature)
                    .map_err(|_| reject("bad legacy signature"))?;
            }
        }

        if self.entry.validity_type.unwrap_or(VALIDITY_EOL) != VALIDITY_EOL {
            return Err(reject("unsupported validity type"));
        }
        let expires = parse_validity(validity).ok_or_else(|| reject("unparseable validity"))?;
        if now > expires {
            return Err(reject("expired"));
        }
        if let Some(last) = last_seen {
            if self.sequence() <= last {
                return Err(reject("stale sequence"));
            }
        }

        tracing::trace!(address = %expected, sequence = self.sequence(), "naming record verified");
        Ok(())
    }

    fn check_signed_data(&self, data: &[u8]) -> Result<(), CryptoError> {
        let Ipld::Map(map) =
            serde_ipld_dagcbor::from_slice::<Ipld>(data).map_err(|_| reject("undecodable data"))?
        else {
            return Err(reject("data is not a map"));
        };
        let bytes = |key: &str| match map.get(key) {
            Some(Ipld::Bytes(bytes)) => Some(bytes.as_slice()),
            _ => None,
        };
        let integer = |key: &str| match map.get(key) {
            Some(Ipld::Integer(int)) => Some(*int),
            _ => None,
        };

        let entry = &self.entry;
        let matches = bytes("Value") == entry.value.as_deref()
            && bytes("Validity") == entry.validity.as_deref()
            && integer("ValidityType") == entry.validity_type.map(i128::from)
            && integer("Sequence") == entry.sequence.map(i128::from)
            && integer("TTL") == entry.ttl.map(i128::from);
        if !matches {
            return Err(reject("signed data disagrees with record fields"));
        }
        Ok(())
    }
}
