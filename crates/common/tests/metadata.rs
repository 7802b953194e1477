//! Strict decoding of encrypted documents

use serde_json::json;

use common::crypto::{RootSecretKey, Secret, WrappedKey};
use common::error::CryptoError;
use common::metadata::{Document, EncryptedDocument, FileMetadata, FolderMetadata};

fn pointer_json(wrapped: &WrappedKey) -> serde_json::Value {
    json!({
        "version": "v1",
        "name": "notes.txt",
        "cid": "bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy",
        "fileKey": wrapped,
        "fileIv": "000102030405060708090a0b",
        "size": 42,
        "createdAt": 1_700_000_000_000i64,
        "modifiedAt": 1_700_000_000_000i64,
    })
}

fn encrypt_raw(value: &serde_json::Value, key: &Secret) -> Vec<u8> {
    key.seal(&serde_json::to_vec(value).unwrap()).unwrap()
}

#[test]
fn test_optional_fields_take_documented_defaults() {
    let key = Secret::generate();
    let root = RootSecretKey::generate();
    let wrapped = WrappedKey::wrap(Secret::generate().bytes(), &root.public()).unwrap();

    let sealed = encrypt_raw(&pointer_json(&wrapped), &key);
    let pointer = FileMetadata::unseal(&sealed, &key).unwrap();
    let p = pointer.pointer();
    assert_eq!(p.encryption_mode, Default::default());
    assert!(p.versions.is_empty());
    assert_eq!(p.mime_type.to_string(), "application/octet-stream");
}

#[test]
fn test_missing_field_or_unknown_version_rejected() {
    let key = Secret::generate();
    let root = RootSecretKey::generate();
    let wrapped = WrappedKey::wrap(Secret::generate().bytes(), &root.public()).unwrap();

    let mut missing = pointer_json(&wrapped);
    missing.as_object_mut().unwrap().remove("cid");
    let mut unknown = pointer_json(&wrapped);
    unknown["version"] = json!("v9");
    let mut mistyped = pointer_json(&wrapped);
    mistyped["size"] = json!("forty-two");
    let mut bad_iv = pointer_json(&wrapped);
    bad_iv["encryptionMode"] = json!("CTR");

    for doc in [missing, unknown, mistyped, bad_iv] {
        let sealed = encrypt_raw(&doc, &key);
        assert_eq!(
            FileMetadata::unseal(&sealed, &key).unwrap_err(),
            CryptoError::InvalidMetadataFormat
        );
    }
}

#[test]
fn test_envelope_round_trip_and_tamper() {
    let key = Secret::generate();
    let listing = FolderMetadata::new();
    let envelope = listing.encrypt_chunked(&key, 3).unwrap();
    let json = envelope.to_json().unwrap();

    let parsed = EncryptedDocument::from_json(&json).unwrap();
    assert_eq!(FolderMetadata::decrypt(&parsed, &key).unwrap(), listing);
    assert_eq!(
        FolderMetadata::decrypt(&parsed, &Secret::generate()).unwrap_err(),
        CryptoError::DecryptionFailed
    );

    let mut tampered = parsed.clone();
    tampered.iv = "00".repeat(12);
    assert_eq!(
        FolderMetadata::decrypt(&tampered, &key).unwrap_err(),
        CryptoError::DecryptionFailed
    );
}

#[test]
fn test_document_kinds_do_not_cross_decode() {
    let key = Secret::generate();
    let sealed = FolderMetadata::new().seal(&key).unwrap();
    assert_eq!(
        FileMetadata::unseal(&sealed, &key).unwrap_err(),
        CryptoError::InvalidMetadataFormat
    );
}
