// src/config/resolve.rs

//! Merging configuration layers and filling in defaults.
//!
//! Precedence is explicit override > config file > built-in default. The
//! override layer is captured before the config file is read, and file
//! values only ever fill keys the overrides left unset.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, warn};

use crate::config::model::{SettingKey, SettingValue, Settings, SettingsLayer};
use crate::errors::{Result, TpcError};
use crate::fs::FileSystem;

/// Multiplexer session name used when none is configured.
pub const DEFAULT_TMUX_SESSION_NAME: &str = "tpc";

/// File name of the launch script in the remote user's home directory.
pub const LAUNCH_SCRIPT_FILENAME: &str = "tpc_launch_script.sh";

/// Environment-derived inputs to [`finalize_defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    /// Name of the invoking OS user; default for `tpu_user`.
    pub os_user: Option<String>,
}

impl Defaults {
    /// Read defaults from the process environment (`USER`, then `LOGNAME`).
    pub fn from_env() -> Self {
        let os_user = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .ok()
            .filter(|u| !u.is_empty());
        Self { os_user }
    }

    pub fn with_user(user: impl Into<String>) -> Self {
        Self {
            os_user: Some(user.into()),
        }
    }
}

/// Merge the override layer with an optional config-file layer.
///
/// Keys present in `overrides` are never replaced.
pub fn resolve(overrides: SettingsLayer, file: Option<SettingsLayer>) -> Result<SettingsLayer> {
    let mut merged = overrides;
    if let Some(file) = file {
        for (key, value) in file.iter() {
            if !merged.set_if_absent(key, value.clone())? {
                debug!(key = %key, "config file value shadowed by command-line override");
            }
        }
    }
    Ok(merged)
}

/// Apply defaults to a merged layer and produce the final [`Settings`].
///
/// - `reserved` / `spot` default to false and may not both be true.
/// - `show_command` defaults to true.
/// - `launch_script_path`, when set, is read and replaces `launch_script`.
/// - `tpu_user` defaults to the OS user.
/// - `tmux_session_name` defaults to [`DEFAULT_TMUX_SESSION_NAME`].
/// - `launch_script_remote_path` defaults to
///   `/home/<tpu_user>/`[`LAUNCH_SCRIPT_FILENAME`].
pub fn finalize_defaults(
    layer: SettingsLayer,
    defaults: &Defaults,
    fs: &dyn FileSystem,
) -> Result<Settings> {
    let reserved = layer.flag(SettingKey::Reserved).unwrap_or(false);
    let spot = layer.flag(SettingKey::Spot).unwrap_or(false);
    if reserved && spot {
        return Err(TpcError::ConfigError(
            "Cannot specify both reserved and spot".to_string(),
        ));
    }
    let show_command = layer.flag(SettingKey::ShowCommand).unwrap_or(true);

    let mut text: BTreeMap<SettingKey, String> = layer
        .iter()
        .filter_map(|(key, value)| match value {
            SettingValue::Text(s) => Some((key, s.clone())),
            SettingValue::Bool(_) => None,
        })
        .collect();

    if let Some(path) = text.get(&SettingKey::LaunchScriptPath).cloned() {
        let script = fs
            .read_to_string(Path::new(&path))
            .with_context(|| format!("reading launch script from {path}"))?;
        if text.contains_key(&SettingKey::LaunchScript) {
            debug!(path = %path, "launch_script_path replaces inline launch_script");
        }
        text.insert(SettingKey::LaunchScript, script);
    }

    if !text.contains_key(&SettingKey::TpuUser) {
        match &defaults.os_user {
            Some(user) => {
                text.insert(SettingKey::TpuUser, user.clone());
            }
            None => warn!("no tpu_user configured and USER is not set"),
        }
    }

    text.entry(SettingKey::TmuxSessionName)
        .or_insert_with(|| DEFAULT_TMUX_SESSION_NAME.to_string());

    if !text.contains_key(&SettingKey::LaunchScriptRemotePath) {
        if let Some(user) = text.get(&SettingKey::TpuUser) {
            let remote = format!("/home/{user}/{LAUNCH_SCRIPT_FILENAME}");
            text.insert(SettingKey::LaunchScriptRemotePath, remote);
        }
    }

    Ok(Settings {
        text,
        reserved,
        spot,
        show_command,
    })
}

/// [`resolve`] followed by [`finalize_defaults`].
pub fn resolve_settings(
    overrides: SettingsLayer,
    file: Option<SettingsLayer>,
    defaults: &Defaults,
    fs: &dyn FileSystem,
) -> Result<Settings> {
    let merged = resolve(overrides, file)?;
    finalize_defaults(merged, defaults, fs)
}
