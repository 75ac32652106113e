// src/config/validate.rs

//! Per-action required-field checks.
//!
//! Settings are not validated globally: each operation names the fields it
//! needs and fails fast on the first one that is unset or empty, before any
//! external command runs.

use crate::config::model::{SettingKey, Settings};
use crate::errors::{Result, TpcError};

impl Settings {
    /// Value of a required text field.
    pub fn require_text(&self, key: SettingKey) -> Result<&str> {
        match self.text(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(TpcError::MissingField(key)),
        }
    }

    /// Values of several required text fields, checked in the given order.
    ///
    /// ```ignore
    /// let [zone, project] = settings.require([SettingKey::Zone, SettingKey::Project])?;
    /// ```
    pub fn require<const N: usize>(&self, keys: [SettingKey; N]) -> Result<[&str; N]> {
        let mut values = [""; N];
        for (slot, key) in values.iter_mut().zip(keys) {
            *slot = self.require_text(key)?;
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Defaults, SettingsLayer, resolve_settings};
    use crate::fs::RealFileSystem;

    fn settings(pairs: &[(SettingKey, &str)]) -> Settings {
        let mut layer = SettingsLayer::new();
        for (k, v) in pairs {
            layer.set(*k, *v).unwrap();
        }
        resolve_settings(layer, None, &Defaults::default(), &RealFileSystem).unwrap()
    }

    #[test]
    fn require_returns_values_in_order() {
        let s = settings(&[(SettingKey::Zone, "z"), (SettingKey::Project, "p")]);
        let [project, zone] = s.require([SettingKey::Project, SettingKey::Zone]).unwrap();
        assert_eq!(project, "p");
        assert_eq!(zone, "z");
    }

    #[test]
    fn first_missing_field_is_reported() {
        let s = settings(&[(SettingKey::Zone, "z")]);
        let err = s
            .require([SettingKey::Zone, SettingKey::Name, SettingKey::Project])
            .unwrap_err();
        assert!(matches!(err, TpcError::MissingField(SettingKey::Name)));
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let s = settings(&[(SettingKey::Name, "")]);
        assert!(matches!(
            s.require_text(SettingKey::Name),
            Err(TpcError::MissingField(SettingKey::Name))
        ));
    }
}
