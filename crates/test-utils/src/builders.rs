use tpc::config::{
    Defaults, SettingKey, SettingValue, Settings, SettingsLayer, finalize_defaults,
};
use tpc::errors::Result;
use tpc::fs::RealFileSystem;

/// OS user assumed by settings built in tests.
pub const TEST_USER: &str = "tester";

/// Builder for resolved `Settings` to simplify test setup.
///
/// Goes through the real defaulting pass, so defaults (`tpu_user`, session
/// name, remote script path) match what the CLI would produce.
pub struct SettingsBuilder {
    layer: SettingsLayer,
    defaults: Defaults,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            layer: SettingsLayer::new(),
            defaults: Defaults::with_user(TEST_USER),
        }
    }

    /// Project, zone and pod name filled in.
    pub fn pod() -> Self {
        Self::new()
            .with(SettingKey::Project, "test-project")
            .with(SettingKey::Zone, "us-central2-b")
            .with(SettingKey::Name, "test-pod")
    }

    pub fn with(mut self, key: SettingKey, value: impl Into<SettingValue>) -> Self {
        self.layer
            .set(key, value)
            .expect("value type does not match key");
        self
    }

    pub fn with_os_user(mut self, user: Option<&str>) -> Self {
        self.defaults = Defaults {
            os_user: user.map(str::to_string),
        };
        self
    }

    pub fn try_build(self) -> Result<Settings> {
        finalize_defaults(self.layer, &self.defaults, &RealFileSystem)
    }

    pub fn build(self) -> Settings {
        self.try_build().expect("Failed to build settings from builder")
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
