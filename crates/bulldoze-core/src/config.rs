//! Optional plugin settings
//!
//! Read from `SC4BulldozeExtensions.toml` next to the plugin DLL:
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [keys]
//! mode_cycle = "B"
//! diagonal_modifier = "alt"
//! flora_modifier = "control"
//! network_modifier = "shift"
//! ```
//!
//! Every key is optional. A missing file gives the defaults, an unreadable
//! or invalid one is logged and also gives the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::tool::KeyBindings;

pub const CONFIG_FILE_NAME: &str = "SC4BulldozeExtensions.toml";
pub const LOG_FILE_NAME: &str = "SC4BulldozeExtensions.log";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// `tracing` filter directive, e.g. `info` or `bulldoze_core=trace`
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeysSection {
    pub mode_cycle: String,
    pub diagonal_modifier: String,
    pub flora_modifier: String,
    pub network_modifier: String,
}

impl Default for KeysSection {
    fn default() -> Self {
        Self {
            mode_cycle: "B".to_string(),
            diagonal_modifier: "alt".to_string(),
            flora_modifier: "control".to_string(),
            network_modifier: "shift".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginConfig {
    pub log: LogSection,
    pub keys: KeysSection,
}

impl PluginConfig {
    /// Parse and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: PluginConfig = toml::from_str(content)?;
        config.key_bindings()?;
        Ok(config)
    }

    /// Load `path`, falling back to the defaults on any error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) if e.is_not_found() => {
                debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Failed to load config {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn key_bindings(&self) -> Result<KeyBindings> {
        KeyBindings::from_names(
            &self.keys.mode_cycle,
            &self.keys.diagonal_modifier,
            &self.keys.flora_modifier,
            &self.keys.network_modifier,
        )
    }
}

/// Files the plugin reads and writes, all in the plugin's directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPaths {
    pub config: PathBuf,
    pub log: PathBuf,
}

impl PluginPaths {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            config: dir.join(CONFIG_FILE_NAME),
            log: dir.join(LOG_FILE_NAME),
        }
    }

    /// Paths next to the plugin binary at `module_path`
    pub fn for_module<P: AsRef<Path>>(module_path: P) -> Result<Self> {
        let module_path = module_path.as_ref();
        let dir = module_path.parent().ok_or_else(|| {
            Error::Config(format!(
                "plugin path has no parent directory: {}",
                module_path.display()
            ))
        })?;
        Ok(Self::in_dir(dir))
    }
}
