use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_SHOW_NAME: &str = "dotnetrocks";
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Settings for a [`crate::HomeViewModel`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewModelConfig {
    /// Base URL of the shows API
    pub api_base_url: String,
    /// Show catalogue to browse
    pub show_name: String,
    /// Width of the show number window requested per page
    pub page_size: u32,
    /// Directory downloaded media is cached in
    pub cache_dir: Option<PathBuf>,
}

impl Default for ViewModelConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            show_name: DEFAULT_SHOW_NAME.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            cache_dir: None,
        }
    }
}

impl ViewModelConfig {
    /// Load a config from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        Ok(())
    }

    /// The configured cache directory, or the platform cache directory
    pub fn resolved_cache_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }

        let proj_dirs = directories::ProjectDirs::from("com", "dotnetrocks", "dnrplay")
            .ok_or(ConfigError::CacheDirectoryNotFound)?;
        Ok(proj_dirs.cache_dir().join("media"))
    }
}
