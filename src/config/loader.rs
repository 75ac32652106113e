// src/config/loader.rs

use std::path::Path;

use tracing::debug;

use crate::config::model::{RawConfigFile, SettingsLayer};
use crate::config::script;
use crate::errors::{Result, TpcError};
use crate::fs::FileSystem;

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// Flat TOML table of setting keys.
    Toml,
    /// Configure-script (see [`crate::config::script`]).
    Script,
}

impl ConfigFormat {
    /// Pick the format from the file extension: `.toml` is TOML, anything
    /// else is treated as a configure-script.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Script,
        }
    }
}

/// Load a config file from `path` and return the layer it configures.
///
/// This only reads and interprets the file; merging with CLI overrides and
/// defaulting happen in [`crate::config::resolve`].
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<SettingsLayer> {
    let path = path.as_ref();
    let contents = fs.read_to_string(path)?;
    let format = ConfigFormat::from_path(path);
    debug!(path = %path.display(), ?format, "loading config file");

    parse_config(&contents, format)
        .map_err(|e| match e {
            TpcError::ConfigError(msg) => {
                TpcError::ConfigError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
}

/// Parse config file contents in the given format.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<SettingsLayer> {
    match format {
        ConfigFormat::Toml => {
            let raw: RawConfigFile = toml::from_str(contents)
                .map_err(|e| TpcError::ConfigError(e.to_string().trim_end().to_string()))?;
            raw.into_layer()
        }
        ConfigFormat::Script => script::interpret(contents),
    }
}
