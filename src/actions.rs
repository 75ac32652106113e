// src/actions.rs

//! Dispatch of CLI actions onto the gateway and session workflows.

use tracing::info;

use crate::cli::Action;
use crate::config::{SettingKey, Settings};
use crate::errors::Result;
use crate::exec::Executor;
use crate::session::SessionOrchestrator;

/// Run one action to completion.
///
/// Required fields are checked by the operation itself, so an incomplete
/// configuration fails before any external command starts.
pub async fn run_action<E: Executor + ?Sized>(
    action: Action,
    orchestrator: &SessionOrchestrator<'_, E>,
) -> Result<()> {
    let gateway = orchestrator.gateway();
    info!(%action, "running action");

    match action {
        Action::Debug => print_settings(gateway.settings()),
        Action::List => {
            gateway.list().await?;
        }
        Action::Create => {
            gateway.create().await?;
        }
        Action::Queue => {
            gateway.queue().await?;
        }
        Action::LsQueue => {
            gateway.list_queue().await?;
        }
        Action::DelQueue => {
            gateway.delete_queue().await?;
        }
        Action::Describe => {
            gateway.describe().await?;
        }
        Action::Ips => {
            for ip in gateway.external_ips().await? {
                println!("{ip}");
            }
        }
        Action::Upload => gateway.upload().await?,
        Action::Run => {
            let command = gateway.settings().require_text(SettingKey::Command)?;
            gateway.ssh_exec(command).await?;
        }
        Action::Launch => orchestrator.launch().await?,
        Action::Check => {
            orchestrator.check().await?;
        }
        Action::Stop => {
            orchestrator.stop().await?;
        }
        Action::Reboot => {
            orchestrator.reboot().await?;
        }
        Action::UploadLaunch => orchestrator.upload_and_launch().await?,
    }

    Ok(())
}

/// Render resolved settings, one `key = value` per line.
///
/// The launch script is summarised by its line count.
pub fn describe_settings(settings: &Settings) -> String {
    let mut out = String::from("tpc resolved configuration\n");
    for key in SettingKey::ALL {
        let value = match key {
            SettingKey::Reserved => settings.reserved().to_string(),
            SettingKey::Spot => settings.spot().to_string(),
            SettingKey::ShowCommand => settings.show_command().to_string(),
            SettingKey::LaunchScript => match settings.text(key) {
                Some(script) => format!("<{} lines>", script.lines().count()),
                None => "<unset>".to_string(),
            },
            _ => settings
                .text(key)
                .map(|v| format!("{v:?}"))
                .unwrap_or_else(|| "<unset>".to_string()),
        };
        out.push_str(&format!("  {key} = {value}\n"));
    }
    out
}

fn print_settings(settings: &Settings) {
    print!("{}", describe_settings(settings));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Defaults, SettingsLayer, resolve_settings};
    use crate::fs::RealFileSystem;

    #[test]
    fn describe_lists_every_key() {
        let mut layer = SettingsLayer::new();
        layer.set(SettingKey::Zone, "us-central2-b").unwrap();
        layer.set(SettingKey::LaunchScript, "#!/bin/bash\necho hi\n").unwrap();
        let settings =
            resolve_settings(layer, None, &Defaults::with_user("alice"), &RealFileSystem).unwrap();

        let text = describe_settings(&settings);
        for key in SettingKey::ALL {
            assert!(text.contains(&format!("  {key} = ")), "missing {key}");
        }
        assert!(text.contains("zone = \"us-central2-b\""));
        assert!(text.contains("launch_script = <2 lines>"));
        assert!(text.contains("project = <unset>"));
        assert!(text.contains("reserved = false"));
        assert!(text.contains("tpu_user = \"alice\""));
    }
}
