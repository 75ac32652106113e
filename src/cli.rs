// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every configuration key is also a flag (`--accelerator-type`, or the
//! underscore spelling `--accelerator_type`). Flags are overrides: a config
//! file can never replace a value given here.

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

use crate::config::{SettingKey, SettingsLayer};
use crate::errors::Result;

/// Command-line arguments for `tpc`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tpc",
    version,
    about = "TPU pod commander: create, upload to, launch on and inspect TPU pods.",
    long_about = None
)]
pub struct CliArgs {
    /// Action to execute.
    #[arg(value_enum)]
    pub action: Action,

    /// Config file to load: `*.toml`, or a configure-script calling
    /// `configure_tpc(...)`.
    #[arg(value_name = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TPC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// What `tpc` should do.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Resolve configuration and print it; runs nothing.
    Debug,
    /// List pods in the zone.
    List,
    /// Create the pod.
    Create,
    /// Request the pod as a queued resource.
    Queue,
    /// List queued resources.
    #[value(name = "ls_queue", alias = "ls-queue")]
    LsQueue,
    /// Delete the queued resource.
    #[value(name = "del_queue", alias = "del-queue")]
    DelQueue,
    /// Describe the pod.
    Describe,
    /// Print the external IP of every worker.
    Ips,
    /// Upload `upload_path` pairs to every worker.
    Upload,
    /// Run `command` on every worker.
    Run,
    /// Replace the launch script and start it in a detached tmux session.
    Launch,
    /// Show the tmux session's recent output.
    Check,
    /// Kill the tmux session.
    Stop,
    /// Reboot every worker.
    Reboot,
    /// `upload`, then `launch`.
    #[value(name = "upload+launch")]
    UploadLaunch,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}

/// Configuration overrides given as flags.
#[derive(Debug, Clone, Default, Args)]
pub struct OverrideArgs {
    /// GCP project.
    #[arg(long, value_name = "PROJECT")]
    pub project: Option<String>,

    /// GCP zone of the pod.
    #[arg(long, value_name = "ZONE")]
    pub zone: Option<String>,

    /// Pod name.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Accelerator type, e.g. `v4-16`.
    #[arg(long, alias = "accelerator_type", value_name = "TYPE")]
    pub accelerator_type: Option<String>,

    /// TPU runtime version.
    #[arg(long, alias = "runtime_version", value_name = "VERSION")]
    pub runtime_version: Option<String>,

    /// Queue the pod on reserved capacity.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub reserved: Option<bool>,

    /// Queue the pod as spot capacity.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub spot: Option<bool>,

    /// Comma-separated `local:remote` pairs to upload.
    #[arg(long, alias = "upload_path", value_name = "PAIRS")]
    pub upload_path: Option<String>,

    /// Command for `run`.
    #[arg(long, value_name = "CMD")]
    pub command: Option<String>,

    /// Local file holding the launch script; replaces `--launch-script`.
    #[arg(long, alias = "launch_script_path", value_name = "PATH")]
    pub launch_script_path: Option<String>,

    /// Launch script text.
    #[arg(long, alias = "launch_script", value_name = "SCRIPT")]
    pub launch_script: Option<String>,

    /// Where the launch script is placed on the workers.
    #[arg(long, alias = "launch_script_remote_path", value_name = "PATH")]
    pub launch_script_remote_path: Option<String>,

    /// Remote user (default: the current OS user).
    #[arg(long, alias = "tpu_user", value_name = "USER")]
    pub tpu_user: Option<String>,

    /// tmux session name on the workers (default: `tpc`).
    #[arg(long, alias = "tmux_session_name", value_name = "SESSION")]
    pub tmux_session_name: Option<String>,

    /// Print each command before running it (default: true).
    #[arg(
        long,
        alias = "show_command",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub show_command: Option<bool>,
}

impl OverrideArgs {
    /// Collect the flags that were actually given into an override layer.
    pub fn to_layer(&self) -> Result<SettingsLayer> {
        let mut layer = SettingsLayer::new();

        let text = [
            (SettingKey::Project, &self.project),
            (SettingKey::Zone, &self.zone),
            (SettingKey::Name, &self.name),
            (SettingKey::AcceleratorType, &self.accelerator_type),
            (SettingKey::RuntimeVersion, &self.runtime_version),
            (SettingKey::UploadPath, &self.upload_path),
            (SettingKey::Command, &self.command),
            (SettingKey::LaunchScriptPath, &self.launch_script_path),
            (SettingKey::LaunchScript, &self.launch_script),
            (SettingKey::LaunchScriptRemotePath, &self.launch_script_remote_path),
            (SettingKey::TpuUser, &self.tpu_user),
            (SettingKey::TmuxSessionName, &self.tmux_session_name),
        ];
        for (key, value) in text {
            if let Some(value) = value {
                layer.set(key, value.as_str())?;
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

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_match_the_cli() {
        let args = CliArgs::try_parse_from(["tpc", "upload+launch", "job.py"]).unwrap();
        assert_eq!(args.action, Action::UploadLaunch);
        assert_eq!(args.config_file, Some(PathBuf::from("job.py")));
        assert_eq!(args.action.to_string(), "upload+launch");

        let args = CliArgs::try_parse_from(["tpc", "ls_queue"]).unwrap();
        assert_eq!(args.action, Action::LsQueue);
        assert_eq!(args.config_file, None);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(CliArgs::try_parse_from(["tpc", "destroy"]).is_err());
    }

    #[test]
    fn flags_become_overrides() {
        let args = CliArgs::try_parse_from([
            "tpc",
            "queue",
            "--zone",
            "us-central2-b",
            "--accelerator_type=v4-16",
            "--spot",
            "--show-command=false",
        ])
        .unwrap();
        let layer = args.overrides.to_layer().unwrap();
        assert_eq!(layer.text(SettingKey::Zone), Some("us-central2-b"));
        assert_eq!(layer.text(SettingKey::AcceleratorType), Some("v4-16"));
        assert_eq!(layer.flag(SettingKey::Spot), Some(true));
        assert_eq!(layer.flag(SettingKey::ShowCommand), Some(false));
        assert!(!layer.contains(SettingKey::Reserved));
        assert_eq!(layer.len(), 4);
    }

    #[test]
    fn log_level_accepts_warning_alias() {
        let args = CliArgs::try_parse_from(["tpc", "list", "--log-level", "warning"]).unwrap();
        assert!(matches!(args.log_level, Some(LogLevel::Warn)));
    }

    #[test]
    fn bool_flag_before_positional() {
        let args = CliArgs::try_parse_from(["tpc", "--reserved", "queue", "pod.toml"]).unwrap();
        assert_eq!(args.action, Action::Queue);
        assert_eq!(args.overrides.reserved, Some(true));
        assert_eq!(args.config_file, Some(PathBuf::from("pod.toml")));
    }
}
