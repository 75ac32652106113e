// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::{Result, TpcError};

/// Every configuration field `tpc` understands.
///
/// The set is closed: config files, configure-scripts and CLI flags can only
/// name one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingKey {
    Project,
    Zone,
    Name,
    AcceleratorType,
    RuntimeVersion,
    Reserved,
    Spot,
    UploadPath,
    Command,
    LaunchScriptPath,
    LaunchScript,
    LaunchScriptRemotePath,
    TpuUser,
    TmuxSessionName,
    ShowCommand,
}

impl SettingKey {
    pub const ALL: [SettingKey; 15] = [
        SettingKey::Project,
        SettingKey::Zone,
        SettingKey::Name,
        SettingKey::AcceleratorType,
        SettingKey::RuntimeVersion,
        SettingKey::Reserved,
        SettingKey::Spot,
        SettingKey::UploadPath,
        SettingKey::Command,
        SettingKey::LaunchScriptPath,
        SettingKey::LaunchScript,
        SettingKey::LaunchScriptRemotePath,
        SettingKey::TpuUser,
        SettingKey::TmuxSessionName,
        SettingKey::ShowCommand,
    ];

    /// The key as written in config files and configure-scripts.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::Project => "project",
            SettingKey::Zone => "zone",
            SettingKey::Name => "name",
            SettingKey::AcceleratorType => "accelerator_type",
            SettingKey::RuntimeVersion => "runtime_version",
            SettingKey::Reserved => "reserved",
            SettingKey::Spot => "spot",
            SettingKey::UploadPath => "upload_path",
            SettingKey::Command => "command",
            SettingKey::LaunchScriptPath => "launch_script_path",
            SettingKey::LaunchScript => "launch_script",
            SettingKey::LaunchScriptRemotePath => "launch_script_remote_path",
            SettingKey::TpuUser => "tpu_user",
            SettingKey::TmuxSessionName => "tmux_session_name",
            SettingKey::ShowCommand => "show_command",
        }
    }

    pub fn is_bool(self) -> bool {
        matches!(
            self,
            SettingKey::Reserved | SettingKey::Spot | SettingKey::ShowCommand
        )
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = TpcError;

    fn from_str(s: &str) -> Result<Self> {
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| TpcError::ConfigError(format!("Invalid config key: {s}")))
    }
}

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Text(String),
    Bool(bool),
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::Text(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        SettingValue::Text(s)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

/// One source of configuration values (CLI overrides, a config file, ...).
///
/// Layers are plain maps; precedence is applied explicitly when they are
/// merged by [`crate::config::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsLayer {
    values: BTreeMap<SettingKey, SettingValue>,
}

impl SettingsLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any previous value.
    ///
    /// Fails when the value type does not match the key (e.g. a string for
    /// `reserved`).
    pub fn set(&mut self, key: SettingKey, value: impl Into<SettingValue>) -> Result<()> {
        let value = value.into();
        check_value_type(key, &value)?;
        self.values.insert(key, value);
        Ok(())
    }

    /// Set `key` only if this layer does not hold a value for it yet.
    ///
    /// Returns whether the value was stored.
    pub fn set_if_absent(
        &mut self,
        key: SettingKey,
        value: impl Into<SettingValue>,
    ) -> Result<bool> {
        let value = value.into();
        check_value_type(key, &value)?;
        if self.values.contains_key(&key) {
            return Ok(false);
        }
        self.values.insert(key, value);
        Ok(true)
    }

    pub fn get(&self, key: SettingKey) -> Option<&SettingValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: SettingKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SettingKey, &SettingValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn text(&self, key: SettingKey) -> Option<&str> {
        match self.values.get(&key) {
            Some(SettingValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn flag(&self, key: SettingKey) -> Option<bool> {
        match self.values.get(&key) {
            Some(SettingValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

fn check_value_type(key: SettingKey, value: &SettingValue) -> Result<()> {
    match (key.is_bool(), value) {
        (true, SettingValue::Bool(_)) | (false, SettingValue::Text(_)) => Ok(()),
        (true, SettingValue::Text(s)) => Err(TpcError::ConfigError(format!(
            "config key '{key}' expects a boolean, got string {s:?}"
        ))),
        (false, SettingValue::Bool(b)) => Err(TpcError::ConfigError(format!(
            "config key '{key}' expects a string, got boolean {b}"
        ))),
    }
}

/// How a pod is requested when queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningMode {
    OnDemand,
    Reserved,
    Spot,
}

/// Fully resolved, read-only settings for one invocation.
///
/// Built only by [`crate::config::finalize_defaults`]; text fields that no
/// source provided stay `None` and are checked per action through
/// [`Settings::require`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub(crate) text: BTreeMap<SettingKey, String>,
    pub(crate) reserved: bool,
    pub(crate) spot: bool,
    pub(crate) show_command: bool,
}

impl Settings {
    /// Value of a text field, `None` when unset.
    pub fn text(&self, key: SettingKey) -> Option<&str> {
        self.text.get(&key).map(String::as_str)
    }

    pub fn reserved(&self) -> bool {
        self.reserved
    }

    pub fn spot(&self) -> bool {
        self.spot
    }

    pub fn show_command(&self) -> bool {
        self.show_command
    }

    pub fn provisioning_mode(&self) -> ProvisioningMode {
        if self.reserved {
            ProvisioningMode::Reserved
        } else if self.spot {
            ProvisioningMode::Spot
        } else {
            ProvisioningMode::OnDemand
        }
    }
}

/// On-disk TOML config document.
///
/// ```toml
/// project = "my-gcp-project"
/// zone = "europe-west4-b"
/// name = "my-tpu-pod"
/// upload_path = "/data:/remote/data"
/// reserved = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    pub project: Option<String>,
    pub zone: Option<String>,
    pub name: Option<String>,
    pub accelerator_type: Option<String>,
    pub runtime_version: Option<String>,
    pub reserved: Option<bool>,
    pub spot: Option<bool>,
    pub upload_path: Option<String>,
    pub command: Option<String>,
    pub launch_script_path: Option<String>,
    pub launch_script: Option<String>,
    pub launch_script_remote_path: Option<String>,
    pub tpu_user: Option<String>,
    pub tmux_session_name: Option<String>,
    pub show_command: Option<bool>,
}

impl RawConfigFile {
    /// Convert into a layer holding only the keys the file actually set.
    pub fn into_layer(self) -> Result<SettingsLayer> {
        let mut layer = SettingsLayer::new();
        let text = [
            (SettingKey::Project, self.project),
            (SettingKey::Zone, self.zone),
            (SettingKey::Name, self.name),
            (SettingKey::AcceleratorType, self.accelerator_type),
            (SettingKey::RuntimeVersion, self.runtime_version),
            (SettingKey::UploadPath, self.upload_path),
            (SettingKey::Command, self.command),
            (SettingKey::LaunchScriptPath, self.launch_script_path),
            (SettingKey::LaunchScript, self.launch_script),
            (SettingKey::LaunchScriptRemotePath, self.launch_script_remote_path),
            (SettingKey::TpuUser, self.tpu_user),
            (SettingKey::TmuxSessionName, self.tmux_session_name),
        ];
        for (key, value) in text {
            if let Some(value) = value {
                layer.set(key, value)?;
            }
        }

        let flags = [
            (SettingKey::Reserved, self.reserved),
            (SettingKey::Spot, self.spot),
            (SettingKey::ShowCommand, self.show_command),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                layer.set(key, value)?;
            }
        }

        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_their_names() {
        for key in SettingKey::ALL {
            assert_eq!(key.as_str().parse::<SettingKey>().unwrap(), key);
        }
    }

    #[test]
    fn unknown_key_names_the_offender() {
        let err = "acelerator_type".parse::<SettingKey>().unwrap_err();
        match err {
            TpcError::ConfigError(msg) => assert!(msg.contains("acelerator_type")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn set_rejects_mismatched_value_types() {
        let mut layer = SettingsLayer::new();
        assert!(layer.set(SettingKey::Reserved, "yes").is_err());
        assert!(layer.set(SettingKey::Zone, true).is_err());
        assert!(layer.is_empty());
    }

    #[test]
    fn set_if_absent_keeps_first_value() {
        let mut layer = SettingsLayer::new();
        assert!(layer.set_if_absent(SettingKey::Zone, "us-central2-b").unwrap());
        assert!(!layer.set_if_absent(SettingKey::Zone, "europe-west4-a").unwrap());
        assert_eq!(layer.text(SettingKey::Zone), Some("us-central2-b"));
    }

    #[test]
    fn raw_file_only_sets_present_keys() {
        let raw: RawConfigFile = toml::from_str(
            r#"
project = "proj"
spot = true
"#,
        )
        .unwrap();
        let layer = raw.into_layer().unwrap();
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.text(SettingKey::Project), Some("proj"));
        assert_eq!(layer.flag(SettingKey::Spot), Some(true));
        assert!(!layer.contains(SettingKey::Reserved));
    }
}
