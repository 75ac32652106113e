// src/session/mod.rs

//! Composite pod workflows built on the gateway.
//!
//! There is no local record of a session: a tmux session is identified only
//! by its name on the pod, and every workflow re-derives state by talking to
//! the workers. Each workflow is a fixed sequence of gateway calls; the
//! first failing step aborts the rest and nothing is rolled back.

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::SettingKey;
use crate::errors::{Result, TpcError};
use crate::exec::{CommandInvocation, Executor, shell_escape};
use crate::gateway::Gateway;

/// Pause between `upload` and `launch` in `upload+launch`.
pub const UPLOAD_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Scrollback lines captured by `check`.
pub const CHECK_SCROLLBACK_LINES: u32 = 2000;

/// Session name used for the detached reboot.
pub const REBOOT_SESSION_NAME: &str = "reboot";

/// Remote shell commands issued by the workflows.
pub mod tmux {
    use super::{CHECK_SCROLLBACK_LINES, REBOOT_SESSION_NAME};
    use crate::exec::shell_escape;

    /// `tmux new-session -d -s <session> <command>`
    pub fn new_session(session: &str, command: &str) -> String {
        format!(
            "tmux new-session -d -s {} {}",
            shell_escape(session),
            command
        )
    }

    /// `tmux capture-pane -pt <session> -S -<lines>`
    pub fn capture_pane(session: &str) -> String {
        format!(
            "tmux capture-pane -pt {} -S -{}",
            shell_escape(session),
            CHECK_SCROLLBACK_LINES
        )
    }

    /// `tmux kill-session -t <session>`
    pub fn kill_session(session: &str) -> String {
        format!("tmux kill-session -t {}", shell_escape(session))
    }

    /// Detached session whose only command reboots the host.
    pub fn reboot() -> String {
        new_session(REBOOT_SESSION_NAME, "sudo reboot")
    }

    /// `rm -f <path>`
    pub fn remove_file(path: &str) -> String {
        format!("rm -f {}", shell_escape(path))
    }
}

/// Runs launch / check / stop / reboot / upload+launch against one pod.
pub struct SessionOrchestrator<'a, E: ?Sized> {
    gateway: Gateway<'a, E>,
    settle_delay: Duration,
}

impl<'a, E: Executor + ?Sized> SessionOrchestrator<'a, E> {
    pub fn new(gateway: Gateway<'a, E>) -> Self {
        Self {
            gateway,
            settle_delay: UPLOAD_SETTLE_DELAY,
        }
    }

    /// Override the pause used by [`Self::upload_and_launch`].
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn gateway(&self) -> &Gateway<'a, E> {
        &self.gateway
    }

    fn session_name(&self) -> Result<&'a str> {
        self.gateway
            .settings()
            .require_text(SettingKey::TmuxSessionName)
    }

    /// Replace the remote launch script and start it in a detached session.
    ///
    /// 1. write the script to a local executable temp file,
    /// 2. remove any old remote script (best effort),
    /// 3. copy the temp file to the remote path on all workers,
    /// 4. start a detached tmux session running the remote script.
    ///
    /// The temp file is deleted on every exit path.
    pub async fn launch(&self) -> Result<()> {
        let [_, _, _, _, session, script, remote_path] = self.gateway.settings().require([
            SettingKey::Zone,
            SettingKey::Project,
            SettingKey::Name,
            SettingKey::TpuUser,
            SettingKey::TmuxSessionName,
            SettingKey::LaunchScript,
            SettingKey::LaunchScriptRemotePath,
        ])?;

        {
            let local = write_launch_script(script)?;
            let local_path = local.path().to_string_lossy().into_owned();
            info!(local = %local_path, remote = %remote_path, "staged launch script");

            self.remove_remote_file(remote_path).await?;
            self.gateway.scp_file(&local_path, remote_path).await?;
        }

        info!(session = %session, remote = %remote_path, "starting launch session");
        self.gateway
            .ssh_exec(&tmux::new_session(session, &shell_escape(remote_path)))
            .await?;
        Ok(())
    }

    /// `rm -f` on the workers; a failure here does not stop the workflow.
    async fn remove_remote_file(&self, remote_path: &str) -> Result<()> {
        match self.gateway.ssh_exec(&tmux::remove_file(remote_path)).await {
            Ok(_) => Ok(()),
            Err(TpcError::ExecutionError { code, .. }) => {
                warn!(
                    remote = %remote_path,
                    exit_code = code,
                    "removing previous launch script failed; continuing"
                );
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    /// Print the session's recent terminal output from every worker.
    pub async fn check(&self) -> Result<CommandInvocation> {
        let session = self.session_name()?;
        self.gateway.ssh_exec(&tmux::capture_pane(session)).await
    }

    /// Kill the session on every worker.
    pub async fn stop(&self) -> Result<CommandInvocation> {
        let session = self.session_name()?;
        info!(session = %session, "stopping session");
        self.gateway.ssh_exec(&tmux::kill_session(session)).await
    }

    /// Reboot every worker from a detached session; does not wait for the
    /// hosts to come back.
    pub async fn reboot(&self) -> Result<CommandInvocation> {
        info!("rebooting all workers");
        self.gateway.ssh_exec(&tmux::reboot()).await
    }

    /// `upload`, a short pause, then `launch`.
    pub async fn upload_and_launch(&self) -> Result<()> {
        self.gateway.upload().await?;
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        self.launch().await
    }
}

fn write_launch_script(script: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("tpc_launch_")
        .suffix(".sh")
        .tempfile()
        .context("creating local launch script")?;
    file.write_all(script.as_bytes())
        .context("writing local launch script")?;
    file.flush()?;
    make_executable(&file)?;
    Ok(file)
}

#[cfg(unix)]
fn make_executable(file: &NamedTempFile) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_file: &NamedTempFile) -> Result<()> {
    Ok(())
}
