//! Configuration loading and root folder resolution
//!
//! The root folder holds the SQLite database and any service-local data.
//! Resolution priority, highest first:
//! 1. Environment variable (`CPV_ROOT_FOLDER`)
//! 2. TOML config file (`~/.config/cpv/config.toml`)
//! 3. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Service configuration file contents.
///
/// Every field is optional; the service applies its own defaults and lets
/// environment variables override anything set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    pub strict_exif_required: Option<bool>,
    pub ai_generation_threshold: Option<f64>,
    pub hash_distance_threshold: Option<u32>,
    pub location_radius_km: Option<f64>,
    pub adapter_timeout_secs: Option<u64>,
    pub sightengine_api_user: Option<String>,
    pub sightengine_api_secret: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub vision_mode: Option<String>,
    pub geocoding_enabled: Option<bool>,
}

impl TomlConfig {
    /// Parse a config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }
}

/// Resolve the CPV root folder following the priority order above.
pub fn resolve_root_folder() -> PathBuf {
    // Priority 1: Environment variable
    if let Ok(path) = std::env::var("CPV_ROOT_FOLDER") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 2: TOML config file
    if let Some(config_path) = default_config_path() {
        if config_path.exists() {
            match TomlConfig::load(&config_path) {
                Ok(config) => {
                    if let Some(root) = config.root_folder {
                        return PathBuf::from(root);
                    }
                }
                Err(e) => warn!("Ignoring config file {}: {}", config_path.display(), e),
            }
        }
    }

    // Priority 3: OS-dependent compiled default
    default_root_folder()
}

/// Default configuration file path for the platform.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cpv").join("config.toml"))
}

/// OS-dependent default root folder path.
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cpv"))
        .unwrap_or_else(|| PathBuf::from("./cpv_data"))
}

/// Create the root folder directory if missing.
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root).map_err(|e| {
        Error::Config(format!(
            "Failed to create root folder {}: {}",
            root.display(),
            e
        ))
    })
}

/// Path of the shared SQLite database inside the root folder.
pub fn database_path(root: &Path) -> PathBuf {
    root.join("cpv.db")
}

/// Load the service TOML config, best-effort.
///
/// A missing or unparseable file yields the defaults; the service must be
/// able to start with nothing configured.
pub fn load_toml_config() -> TomlConfig {
    let Some(path) = default_config_path() else {
        return TomlConfig::default();
    };
    if !path.exists() {
        return TomlConfig::default();
    }
    match TomlConfig::load(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn database_path_lives_in_root() {
        let path = database_path(Path::new("/var/lib/cpv"));
        assert_eq!(path, PathBuf::from("/var/lib/cpv/cpv.db"));
    }

    #[test]
    fn toml_config_parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "root_folder = \"/tmp/cpv-test\"\nlocation_radius_km = 25.0\n",
        )
        .unwrap();

        let config = TomlConfig::load(&path).unwrap();
        assert_eq!(config.root_folder.as_deref(), Some("/tmp/cpv-test"));
        assert_eq!(config.location_radius_km, Some(25.0));
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn toml_config_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not { toml").unwrap();

        assert!(TomlConfig::load(&path).is_err());
    }

    #[test]
    #[serial]
    fn env_var_wins_root_folder_resolution() {
        std::env::set_var("CPV_ROOT_FOLDER", "/tmp/cpv-env-root");
        let root = resolve_root_folder();
        std::env::remove_var("CPV_ROOT_FOLDER");

        assert_eq!(root, PathBuf::from("/tmp/cpv-env-root"));
    }
}
