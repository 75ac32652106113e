// src/gateway/mod.rs

//! Remote command gateway.
//!
//! One method per logical provider operation. Each method checks the
//! settings it needs (failing with `MissingField` before anything runs),
//! builds the command line with [`gcloud`] and hands it to the `Executor`.

pub mod gcloud;
pub mod upload;

use tracing::{debug, info};

use crate::config::{SettingKey, Settings};
use crate::errors::Result;
use crate::exec::{CommandInvocation, CommandLine, ExecOptions, Executor, shell_escape};
use crate::extract::extract_ips;

use self::gcloud::{Location, PodSpec, Target};
pub use self::upload::{UploadPair, parse_upload_pairs};

/// Stateless builder/executor pair over resolved settings.
pub struct Gateway<'a, E: ?Sized> {
    settings: &'a Settings,
    executor: &'a E,
}

impl<'a, E: Executor + ?Sized> Gateway<'a, E> {
    pub fn new(settings: &'a Settings, executor: &'a E) -> Self {
        Self { settings, executor }
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    fn options(&self, stream_output: bool) -> ExecOptions {
        ExecOptions {
            echo: self.settings.show_command(),
            stream_output,
        }
    }

    async fn run(&self, command: CommandLine) -> Result<CommandInvocation> {
        self.executor.execute(&command, self.options(true)).await
    }

    fn location(&self) -> Result<Location<'a>> {
        let [zone, project] = self
            .settings
            .require([SettingKey::Zone, SettingKey::Project])?;
        Ok(Location { zone, project })
    }

    fn pod_spec(&self) -> Result<(Location<'a>, PodSpec<'a>)> {
        let [zone, project, name, accelerator_type, runtime_version] = self.settings.require([
            SettingKey::Zone,
            SettingKey::Project,
            SettingKey::Name,
            SettingKey::AcceleratorType,
            SettingKey::RuntimeVersion,
        ])?;
        Ok((
            Location { zone, project },
            PodSpec {
                name,
                accelerator_type,
                runtime_version,
            },
        ))
    }

    fn named(&self) -> Result<(Location<'a>, &'a str)> {
        let [zone, project, name] =
            self.settings
                .require([SettingKey::Zone, SettingKey::Project, SettingKey::Name])?;
        Ok((Location { zone, project }, name))
    }

    fn target(&self) -> Result<(Location<'a>, Target<'a>)> {
        let [zone, project, name, user] = self.settings.require([
            SettingKey::Zone,
            SettingKey::Project,
            SettingKey::Name,
            SettingKey::TpuUser,
        ])?;
        Ok((Location { zone, project }, Target { user, name }))
    }

    /// List pods in the zone.
    pub async fn list(&self) -> Result<CommandInvocation> {
        let loc = self.location()?;
        self.run(gcloud::list(loc)).await
    }

    /// Create the pod directly.
    pub async fn create(&self) -> Result<CommandInvocation> {
        let (loc, pod) = self.pod_spec()?;
        info!(pod = %pod.name, accelerator = %pod.accelerator_type, "creating pod");
        self.run(gcloud::create(loc, pod)).await
    }

    /// Request the pod as a queued resource (on-demand, reserved or spot).
    pub async fn queue(&self) -> Result<CommandInvocation> {
        let (loc, pod) = self.pod_spec()?;
        let mode = self.settings.provisioning_mode();
        info!(pod = %pod.name, ?mode, "queueing pod request");
        self.run(gcloud::queue(loc, pod, mode)).await
    }

    pub async fn list_queue(&self) -> Result<CommandInvocation> {
        let loc = self.location()?;
        self.run(gcloud::list_queue(loc)).await
    }

    pub async fn delete_queue(&self) -> Result<CommandInvocation> {
        let [name, zone, project] =
            self.settings
                .require([SettingKey::Name, SettingKey::Zone, SettingKey::Project])?;
        self.run(gcloud::delete_queue(Location { zone, project }, name))
            .await
    }

    pub async fn describe(&self) -> Result<CommandInvocation> {
        let (loc, name) = self.named()?;
        self.run(gcloud::describe(loc, name)).await
    }

    /// External IPs of every worker, parsed from `describe` output.
    pub async fn external_ips(&self) -> Result<Vec<String>> {
        let (loc, name) = self.named()?;
        let invocation = self
            .executor
            .execute(&gcloud::describe(loc, name), self.options(false))
            .await?;
        let ips = extract_ips(&invocation.output());
        debug!(count = ips.len(), "extracted worker IPs");
        Ok(ips)
    }

    /// Upload every pair from the `upload_path` setting.
    ///
    /// The whole list is parsed first; a malformed entry fails before any
    /// transfer begins.
    pub async fn upload(&self) -> Result<()> {
        let [_, _, _, spec, _] = self.settings.require([
            SettingKey::Zone,
            SettingKey::Project,
            SettingKey::Name,
            SettingKey::UploadPath,
            SettingKey::TpuUser,
        ])?;
        let pairs = parse_upload_pairs(spec)?;
        self.upload_pairs(&pairs).await
    }

    /// Recursively copy each pair to all workers, in order.
    ///
    /// Local sides are expanded by the local shell (`~`, globs). The first
    /// failing transfer aborts the remaining ones.
    pub async fn upload_pairs(&self, pairs: &[UploadPair]) -> Result<()> {
        let (loc, target) = self.target()?;
        for (index, pair) in pairs.iter().enumerate() {
            info!(index, local = %pair.local, remote = %pair.remote, "uploading");
            self.run(gcloud::scp(loc, target, &pair.local, &pair.remote, true))
                .await?;
        }
        Ok(())
    }

    /// Copy one file (non-recursive) to all workers. `local` is taken
    /// literally.
    pub async fn scp_file(&self, local: &str, remote: &str) -> Result<CommandInvocation> {
        let (loc, target) = self.target()?;
        self.run(gcloud::scp(loc, target, &shell_escape(local), remote, false))
            .await
    }

    /// Run `command` on every worker over SSH.
    pub async fn ssh_exec(&self, command: &str) -> Result<CommandInvocation> {
        let (loc, target) = self.target()?;
        debug!(remote_cmd = %command, "ssh on all workers");
        self.run(gcloud::ssh(loc, target, command)).await
    }
}
