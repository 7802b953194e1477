use std::{fs, path::PathBuf};

use common::config::{ConfigError, CoreConfig};
use common::device::DeviceIdentity;
use common::vault::EncryptedVaultKeys;

pub const APP_NAME: &str = "sealvault";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEVICE_FILE_NAME: &str = "device.pem";
pub const VAULT_FILE_NAME: &str = "vault.json";

/// Local state of one device
///
/// Holds configuration, the device identity and the vault keys in wrapped
/// form. The root secret is never stored here.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.sealvault)
    pub dir: PathBuf,
    /// Path to the device identity PEM file
    pub device_path: PathBuf,
    /// Path to the wrapped vault keys
    pub vault_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: CoreConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.sealvault)
    pub fn state_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    fn at(dir: PathBuf, config: CoreConfig) -> Self {
        Self {
            device_path: dir.join(DEVICE_FILE_NAME),
            vault_path: dir.join(VAULT_FILE_NAME),
            config_path: dir.join(CONFIG_FILE_NAME),
            dir,
            config,
        }
    }

    /// Initialize a new state directory with a fresh device identity
    pub fn init(custom_path: Option<PathBuf>, config: CoreConfig) -> Result<Self, StateError> {
        let dir = Self::state_dir(custom_path)?;
        if dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }
        config.validate()?;
        fs::create_dir_all(&dir)?;

        let state = Self::at(dir, config);
        DeviceIdentity::generate().save(&state.device_path)?;
        fs::write(&state.config_path, state.config.to_toml()?)?;
        tracing::info!(dir = %state.dir.display(), "initialized state directory");
        Ok(state)
    }

    /// Load existing state
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let dir = Self::state_dir(custom_path)?;
        if !dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        if !dir.join(DEVICE_FILE_NAME).exists() {
            return Err(StateError::MissingFile(DEVICE_FILE_NAME.to_string()));
        }
        let config = CoreConfig::load(&config_path)?;
        Ok(Self::at(dir, config))
    }

    pub fn load_device(&self) -> Result<DeviceIdentity, StateError> {
        DeviceIdentity::load(&self.device_path).map_err(|e| StateError::InvalidKey(e.to_string()))
    }

    pub fn has_vault(&self) -> bool {
        self.vault_path.exists()
    }

    pub fn load_vault(&self) -> Result<EncryptedVaultKeys, StateError> {
        if !self.has_vault() {
            return Err(StateError::NoVault);
        }
        let json = fs::read_to_string(&self.vault_path)?;
        EncryptedVaultKeys::from_json(&json).map_err(|e| StateError::InvalidVault(e.to_string()))
    }

    pub fn save_vault(&self, keys: &EncryptedVaultKeys) -> Result<(), StateError> {
        let json = keys
            .to_json()
            .map_err(|e| StateError::InvalidVault(e.to_string()))?;
        fs::write(&self.vault_path, json)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("sealvault directory not initialized. Run 'sealvault init' first")]
    NotInitialized,

    #[error("sealvault directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid device key: {0}")]
    InvalidKey(String),

    #[error("no vault yet. Run 'sealvault vault create' first")]
    NoVault,

    #[error("invalid vault file: {0}")]
    InvalidVault(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
