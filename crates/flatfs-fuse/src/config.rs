//! Mount configuration, loaded from TOML.
//!
//! ```toml
//! [store]
//! capacity = 256
//! max_file_size = 65536
//!
//! [mount]
//! fs_name = "scratch"
//! allow_other = true
//! attr_ttl_secs = 5
//! ```
//!
//! Every key is optional. A missing file at the default location is not an
//! error; a missing file named explicitly is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use flatfs_kernel::{ConfigError, StoreLimits};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_ATTR_TTL, DEFAULT_FS_NAME};

/// Complete configuration of one `flatfs` process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record store limits.
    pub store: StoreLimits,
    /// FUSE mount options.
    pub mount: MountConfig,
}

/// FUSE mount options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub fs_name: String,
    /// Unmount when the process exits.
    pub auto_unmount: bool,
    /// Let users other than the mounting one access the filesystem.
    pub allow_other: bool,
    pub attr_ttl_secs: u64,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            fs_name: DEFAULT_FS_NAME.to_string(),
            auto_unmount: true,
            allow_other: false,
            attr_ttl_secs: DEFAULT_ATTR_TTL.as_secs(),
        }
    }
}

impl MountConfig {
    /// Attribute and entry cache lifetime.
    pub fn attr_ttl(&self) -> Duration {
        Duration::from_secs(self.attr_ttl_secs)
    }
}

impl Config {
    /// Default config file path (~/.config/flatfs/config.toml).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parse and validate TOML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::parse(&text)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load `explicit` if given, else the default file if it exists, else
    /// built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        if self.mount.fs_name.is_empty() {
            return Err(ConfigError::Invalid("mount.fs_name must not be empty".into()));
        }
        Ok(())
    }
}
