// src/config/mod.rs

//! Configuration for tpc.
//!
//! Responsibilities:
//! - Define setting keys, layers and the resolved `Settings` (`model.rs`).
//! - Load a config file, TOML or configure-script (`loader.rs`, `script.rs`).
//! - Merge layers and apply defaults (`resolve.rs`).
//! - Per-action required-field checks (`validate.rs`).

pub mod loader;
pub mod model;
pub mod resolve;
pub mod script;
pub mod validate;

pub use loader::{ConfigFormat, load_from_path, parse_config};
pub use model::{
    ProvisioningMode, RawConfigFile, SettingKey, SettingValue, Settings, SettingsLayer,
};
pub use resolve::{
    DEFAULT_TMUX_SESSION_NAME, Defaults, LAUNCH_SCRIPT_FILENAME, finalize_defaults, resolve,
    resolve_settings,
};
