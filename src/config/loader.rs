//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{ServerConfig, SiteConfig};
use crate::config::validation::{validate_site, ValidationError};
use crate::error::SiteError;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ConfigError> for SiteError {
    fn from(e: ConfigError) -> Self {
        SiteError::ConfigInvalid(e.to_string())
    }
}

/// A validated site configuration and the directory it is anchored to.
#[derive(Debug, Clone)]
pub struct LoadedSite {
    pub config: SiteConfig,
    /// Directory relative paths (`root`, `htpasswd`) resolve against.
    pub base_dir: PathBuf,
}

/// Load and validate server settings from a TOML file.
pub fn load_server_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and validate `static.json`.
///
/// A missing file is not an error: the site is served from the default root
/// with every feature disabled.
pub fn load_site(path: &Path) -> Result<LoadedSite, ConfigError> {
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = match fs::read_to_string(path) {
        Ok(content) => parse_site(path, &content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Site config not found, using defaults");
            SiteConfig::default()
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    Ok(LoadedSite { config, base_dir })
}

/// Parse and validate site configuration text.
pub fn parse_site(path: &Path, content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = serde_json::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    validate_site(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
