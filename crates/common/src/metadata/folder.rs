use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::file::validate_content;
use super::{check_name, invalid, Document, EncryptionMode, FileMetadata, FilePointer, FileVersion, MaybeMime};
use crate::crypto::{RootSecretKey, WrappedKey};
use crate::error::CryptoError;
use crate::naming::{derive_file_naming_keypair, NamingAddress, NamingKeypair};

/// A sub-folder: its key and naming key wrapped for the reader, plus the
/// address its own listing is published under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
    pub naming_address: NamingAddress,
    pub folder_key: WrappedKey,
    pub naming_key: WrappedKey,
    pub created_at: i64,
    pub modified_at: i64,
}

/// A file stored inline in a v1 listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub cid: String,
    pub file_key: WrappedKey,
    pub file_iv: String,
    pub size: u64,
    #[serde(default)]
    pub mime_type: MaybeMime,
    #[serde(default)]
    pub encryption_mode: EncryptionMode,
    pub created_at: i64,
    pub modified_at: i64,
    #[serde(default)]
    pub versions: Vec<FileVersion>,
}

/// A file in a v2 listing: only where its own pointer document lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePointerEntry {
    pub id: String,
    pub name: String,
    pub naming_address: NamingAddress,
    pub created_at: i64,
    pub modified_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FolderChild {
    Folder(FolderEntry),
    File(FileEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FolderChildV2 {
    Folder(FolderEntry),
    File(FilePointerEntry),
}

impl FolderChild {
    fn id_and_name(&self) -> (&str, &str) {
        match self {
            FolderChild::Folder(f) => (f.id.as_str(), f.name.as_str()),
            FolderChild::File(f) => (f.id.as_str(), f.name.as_str()),
        }
    }
}

impl FolderChildV2 {
    fn id_and_name(&self) -> (&str, &str) {
        match self {
            FolderChildV2::Folder(f) => (f.id.as_str(), f.name.as_str()),
            FolderChildV2::File(f) => (f.id.as_str(), f.name.as_str()),
        }
    }
}

/// Versioned folder listing, encrypted under the folder's own key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum FolderMetadata {
    #[serde(rename = "v1")]
    V1 { children: Vec<FolderChild> },
    #[serde(rename = "v2")]
    V2 { children: Vec<FolderChildV2> },
}

impl Default for FolderMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderMetadata {
    /// An empty listing in the current version
    pub fn new() -> Self {
        FolderMetadata::V2 { children: vec![] }
    }

    pub fn len(&self) -> usize {
        match self {
            FolderMetadata::V1 { children } => children.len(),
            FolderMetadata::V2 { children } => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ids_and_names(&self) -> Vec<(&str, &str)> {
        match self {
            FolderMetadata::V1 { children } => children.iter().map(FolderChild::id_and_name).collect(),
            FolderMetadata::V2 { children } => children.iter().map(FolderChildV2::id_and_name).collect(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.ids_and_names().into_iter().map(|(_, name)| name).collect()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids_and_names().iter().any(|(child, _)| *child == id)
    }

    /// Sub-folders, in either version
    pub fn folders(&self) -> Vec<&FolderEntry> {
        match self {
            FolderMetadata::V1 { children } => children
                .iter()
                .filter_map(|c| match c {
                    FolderChild::Folder(f) => Some(f),
                    FolderChild::File(_) => None,
                })
                .collect(),
            FolderMetadata::V2 { children } => children
                .iter()
                .filter_map(|c| match c {
                    FolderChildV2::Folder(f) => Some(f),
                    FolderChildV2::File(_) => None,
                })
                .collect(),
        }
    }

    pub fn add_folder(&mut self, entry: FolderEntry) -> Result<(), CryptoError> {
        if self.contains_id(&entry.id) {
            return Err(invalid("duplicate child id"));
        }
        match self {
            FolderMetadata::V1 { children } => children.push(FolderChild::Folder(entry)),
            FolderMetadata::V2 { children } => children.push(FolderChildV2::Folder(entry)),
        }
        Ok(())
    }

    /// Add a file pointer; only v2 listings hold pointers
    pub fn add_file_pointer(&mut self, entry: FilePointerEntry) -> Result<(), CryptoError> {
        if self.contains_id(&entry.id) {
            return Err(invalid("duplicate child id"));
        }
        match self {
            FolderMetadata::V1 { .. } => Err(invalid("file pointer in v1 listing")),
            FolderMetadata::V2 { children } => {
                children.push(FolderChildV2::File(entry));
                Ok(())
            }
        }
    }

    /// Remove a child by id, returning whether it was present
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.len();
        match self {
            FolderMetadata::V1 { children } => children.retain(|c| c.id_and_name().0 != id),
            FolderMetadata::V2 { children } => children.retain(|c| c.id_and_name().0 != id),
        }
        self.len() != before
    }

    /// Convert a v1 listing to v2
    ///
    /// Every inline file moves into its own pointer document, to be
    /// published under the naming keypair derived from the root identity and
    /// the file id. A v2 listing is returned unchanged with no pointers.
    pub fn migrate_to_v2(
        self,
        root: &RootSecretKey,
    ) -> Result<(FolderMetadata, Vec<(NamingKeypair, FileMetadata)>), CryptoError> {
        let children = match self {
            FolderMetadata::V2 { .. } => return Ok((self, vec![])),
            FolderMetadata::V1 { children } => children,
        };

        let mut migrated = Vec::with_capacity(children.len());
        let mut pointers = Vec::new();
        for child in children {
            match child {
                FolderChild::Folder(folder) => migrated.push(FolderChildV2::Folder(folder)),
                FolderChild::File(file) => {
                    let keypair = derive_file_naming_keypair(root, &file.id)?;
                    migrated.push(FolderChildV2::File(FilePointerEntry {
                        id: file.id,
                        name: file.name.clone(),
                        naming_address: *keypair.address(),
                        created_at: file.created_at,
                        modified_at: file.modified_at,
                    }));
                    let pointer = FilePointer {
                        name: file.name,
                        cid: file.cid,
                        file_key: file.file_key,
                        file_iv: file.file_iv,
                        size: file.size,
                        mime_type: file.mime_type,
                        encryption_mode: file.encryption_mode,
                        created_at: file.created_at,
                        modified_at: file.modified_at,
                        versions: file.versions,
                    };
                    pointers.push((keypair, FileMetadata::V1(pointer)));
                }
            }
        }
        Ok((FolderMetadata::V2 { children: migrated }, pointers))
    }
}

impl Document for FolderMetadata {
    fn validate(&self) -> Result<(), CryptoError> {
        let mut seen = HashSet::new();
        for (id, name) in self.ids_and_names() {
            if id.is_empty() || !seen.insert(id) {
                return Err(invalid("missing or duplicate child id"));
            }
            check_name(name)?;
        }
        if let FolderMetadata::V1 { children } = self {
            for child in children {
                if let FolderChild::File(f) = child {
                    validate_content(&f.name, &f.cid, &f.file_iv, f.encryption_mode, &f.versions)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encoding::to_hex;
    use crate::crypto::{generate_iv, Secret};

    const CID: &str = "bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy";

    fn folder_entry(owner: &RootSecretKey, name: &str) -> FolderEntry {
        let naming = NamingKeypair::generate();
        FolderEntry {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            naming_address: *naming.address(),
            folder_key: WrappedKey::wrap(Secret::generate().bytes(), &owner.public()).unwrap(),
            naming_key: WrappedKey::wrap(&naming.secret().to_bytes(), &owner.public()).unwrap(),
            created_at: 1,
            modified_at: 1,
        }
    }

    fn file_entry(owner: &RootSecretKey, name: &str) -> FileEntry {
        FileEntry {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            cid: CID.to_string(),
            file_key: WrappedKey::wrap(Secret::generate().bytes(), &owner.public()).unwrap(),
            file_iv: to_hex(&generate_iv()),
            size: 42,
            mime_type: "text/plain".parse().unwrap(),
            encryption_mode: EncryptionMode::Gcm,
            created_at: 1,
            modified_at: 2,
            versions: vec![],
        }
    }

    #[test]
    fn test_v2_encrypt_decrypt() {
        let owner = RootSecretKey::generate();
        let key = Secret::generate();
        let mut listing = FolderMetadata::new();
        listing.add_folder(folder_entry(&owner, "photos")).unwrap();
        listing
            .add_file_pointer(FilePointerEntry {
                id: uuid::Uuid::new_v4().to_string(),
                name: "notes.txt".to_string(),
                naming_address: *NamingKeypair::generate().address(),
                created_at: 1,
                modified_at: 1,
            })
            .unwrap();

        let encrypted = listing.encrypt(&key).unwrap();
        let decrypted = FolderMetadata::decrypt(&encrypted, &key).unwrap();
        assert_eq!(decrypted, listing);
        assert_eq!(decrypted.names(), vec!["photos", "notes.txt"]);
        assert_eq!(decrypted.folders().len(), 1);
    }

    #[test]
    fn test_v1_json_shape() {
        let owner = RootSecretKey::generate();
        let listing = FolderMetadata::V1 {
            children: vec![FolderChild::File(file_entry(&owner, "a.txt"))],
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["version"], "v1");
        assert_eq!(json["children"][0]["type"], "file");
        assert_eq!(json["children"][0]["encryptionMode"], "GCM");
        assert_eq!(FolderMetadata::from_json(&serde_json::to_vec(&json).unwrap()).unwrap(), listing);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let owner = RootSecretKey::generate();
        let entry = folder_entry(&owner, "docs");
        let mut listing = FolderMetadata::new();
        listing.add_folder(entry.clone()).unwrap();
        assert!(listing.add_folder(entry.clone()).is_err());

        let forged = FolderMetadata::V2 {
            children: vec![FolderChildV2::Folder(entry.clone()), FolderChildV2::Folder(entry)],
        };
        let bytes = serde_json::to_vec(&forged).unwrap();
        assert_eq!(
            FolderMetadata::from_json(&bytes).unwrap_err(),
            CryptoError::InvalidMetadataFormat
        );
    }

    #[test]
    fn test_unknown_child_type_rejected() {
        let owner = RootSecretKey::generate();
        let listing = FolderMetadata::V2 {
            children: vec![FolderChildV2::Folder(folder_entry(&owner, "x"))],
        };
        let mut json = serde_json::to_value(&listing).unwrap();
        json["children"][0]["type"] = serde_json::json!("symlink");
        assert!(FolderMetadata::from_json(&serde_json::to_vec(&json).unwrap()).is_err());

        let mut json = serde_json::to_value(&listing).unwrap();
        json["children"][0]["namingAddress"] = serde_json::json!(12);
        assert!(FolderMetadata::from_json(&serde_json::to_vec(&json).unwrap()).is_err());
    }

    #[test]
    fn test_remove_child() {
        let owner = RootSecretKey::generate();
        let entry = folder_entry(&owner, "docs");
        let id = entry.id.clone();
        let mut listing = FolderMetadata::new();
        listing.add_folder(entry).unwrap();
        assert!(listing.remove(&id));
        assert!(!listing.remove(&id));
        assert!(listing.is_empty());
    }

    #[test]
    fn test_migrate_v1_to_v2() {
        let root = RootSecretKey::generate();
        let file = file_entry(&root, "report.pdf");
        let folder = folder_entry(&root, "archive");
        let listing = FolderMetadata::V1 {
            children: vec![FolderChild::File(file.clone()), FolderChild::Folder(folder.clone())],
        };

        let (migrated, pointers) = listing.migrate_to_v2(&root).unwrap();
        migrated.validate().unwrap();
        assert_eq!(migrated.len(), 2);
        assert_eq!(pointers.len(), 1);

        let (keypair, pointer) = &pointers[0];
        assert_eq!(keypair, &derive_file_naming_keypair(&root, &file.id).unwrap());
        assert_eq!(pointer.pointer().cid, file.cid);
        assert_eq!(pointer.pointer().file_key, file.file_key);

        match &migrated {
            FolderMetadata::V2 { children } => {
                assert_eq!(
                    children[0],
                    FolderChildV2::File(FilePointerEntry {
                        id: file.id.clone(),
                        name: file.name.clone(),
                        naming_address: *keypair.address(),
                        created_at: file.created_at,
                        modified_at: file.modified_at,
                    })
                );
                assert_eq!(children[1], FolderChildV2::Folder(folder));
            }
            FolderMetadata::V1 { .. } => panic!("expected v2"),
        }
    }
}
