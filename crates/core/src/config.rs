//! User settings from `<config_dir>/vidgrade/config.toml`.
//!
//! Every field is optional; command line flags take precedence over the file.

use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    paths::{get_config_path, get_root_data_dir},
    provider::Provider,
};

pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&get_config_path())
    }

    /// A missing file gives defaults; an unreadable one is logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config is invalid, using defaults");
                Self::default()
            }
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider.unwrap_or_default()
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
            .filter(|t| (0.0..=2.0).contains(t))
            .unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(get_root_data_dir)
    }
}
