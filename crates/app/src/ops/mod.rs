pub mod init;
pub mod key;
pub mod name;
pub mod record;
pub mod seal;
pub mod unseal;
pub mod vault;
pub mod version;

pub use init::Init;
pub use key::Key;
pub use name::Name;
pub use record::Record;
pub use seal::Seal;
pub use unseal::Unseal;
pub use vault::Vault;
pub use version::Version;
