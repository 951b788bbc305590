//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup (binaries read the environment) and then
//! passed into core services. Services never read process-wide environment variables during
//! request handling.

use crate::constants::DEFAULT_DATA_DIR;
use crate::settings::{Settings, Theme};
use crate::{ServiceError, ServiceResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which document store backs the services.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreKind {
    /// Volatile, process-local store. Data is lost on exit.
    Memory,
    /// JSON documents in a sharded directory tree under the data directory.
    #[default]
    Files,
}

impl FromStr for StoreKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "files" => Ok(StoreKind::Files),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown store kind '{other}' (expected memory or files)"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    store_kind: StoreKind,
    settings: Settings,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidInput` if the files store is selected with an empty data
    /// directory path.
    pub fn new(data_dir: PathBuf, store_kind: StoreKind, settings: Settings) -> ServiceResult<Self> {
        if store_kind == StoreKind::Files && data_dir.as_os_str().is_empty() {
            return Err(ServiceError::InvalidInput(
                "data directory cannot be empty for the files store".into(),
            ));
        }

        Ok(Self {
            data_dir,
            store_kind,
            settings,
        })
    }

    /// Configuration for a throwaway in-memory backend.
    pub fn in_memory() -> Self {
        Self {
            data_dir: PathBuf::new(),
            store_kind: StoreKind::Memory,
            settings: Settings::default(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store_kind
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }
}

/// Resolve the data directory from an optional override value.
///
/// Empty or whitespace-only values fall back to [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Parse the store kind from an optional string value, defaulting to the files store.
pub fn store_kind_from_env_value(value: Option<String>) -> ServiceResult<StoreKind> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<StoreKind>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

/// Parse the theme from an optional string value, defaulting to [`Theme::Light`].
pub fn theme_from_env_value(value: Option<String>) -> ServiceResult<Theme> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value
        .map(|v| v.parse::<Theme>().map_err(ServiceError::InvalidInput))
        .transpose()?;

    Ok(parsed.unwrap_or_default())
}

/// Build a [`CoreConfig`] from raw environment values.
///
/// Binaries call this once at startup with `SAUDE_DATA_DIR`, `SAUDE_STORE` and `SAUDE_THEME`.
pub fn core_config_from_env_values(
    data_dir: Option<String>,
    store_kind: Option<String>,
    theme: Option<String>,
) -> ServiceResult<CoreConfig> {
    CoreConfig::new(
        data_dir_from_env_value(data_dir),
        store_kind_from_env_value(store_kind)?,
        Settings::new(theme_from_env_value(theme)?),
    )
}
