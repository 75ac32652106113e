// src/gateway/gcloud.rs

//! Builders for `gcloud` TPU command lines.
//!
//! These are pure: they never spawn anything, so the exact argument grammar
//! can be tested without the provider CLI installed.

use crate::config::ProvisioningMode;
use crate::exec::CommandLine;

pub const GCLOUD: &str = "gcloud";

/// Pod coordinates shared by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location<'a> {
    pub zone: &'a str,
    pub project: &'a str,
}

/// Parameters for creating a pod or queueing a request for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PodSpec<'a> {
    pub name: &'a str,
    pub accelerator_type: &'a str,
    pub runtime_version: &'a str,
}

/// Remote side of an `scp` / `ssh` call: `user@pod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target<'a> {
    pub user: &'a str,
    pub name: &'a str,
}

impl Target<'_> {
    fn host(&self) -> String {
        format!("{}@{}", self.user, self.name)
    }
}

fn tpu_vm(alpha: bool) -> CommandLine {
    let cmd = CommandLine::new(GCLOUD);
    let cmd = if alpha { cmd.arg("alpha") } else { cmd };
    cmd.args(["compute", "tpus", "tpu-vm"])
}

fn queued_resources() -> CommandLine {
    CommandLine::new(GCLOUD).args(["alpha", "compute", "tpus", "queued-resources"])
}

fn located(cmd: CommandLine, loc: Location<'_>) -> CommandLine {
    cmd.opt("zone", loc.zone).opt("project", loc.project)
}

pub fn list(loc: Location<'_>) -> CommandLine {
    located(tpu_vm(false).arg("list"), loc).arg("--quiet")
}

pub fn create(loc: Location<'_>, pod: PodSpec<'_>) -> CommandLine {
    located(tpu_vm(true).arg("create").arg(pod.name), loc)
        .opt("version", pod.runtime_version)
        .opt("accelerator-type", pod.accelerator_type)
        .arg("--quiet")
}

pub fn queue(loc: Location<'_>, pod: PodSpec<'_>, mode: ProvisioningMode) -> CommandLine {
    let cmd = queued_resources()
        .arg("create")
        .arg(pod.name)
        .opt("node-id", pod.name);
    located(cmd, loc)
        .opt("accelerator-type", pod.accelerator_type)
        .opt("runtime-version", pod.runtime_version)
        .arg("--quiet")
        .flag_if("reserved", mode == ProvisioningMode::Reserved)
        .flag_if("spot", mode == ProvisioningMode::Spot)
}

pub fn list_queue(loc: Location<'_>) -> CommandLine {
    located(queued_resources().arg("list"), loc).arg("--quiet")
}

pub fn delete_queue(loc: Location<'_>, name: &str) -> CommandLine {
    located(queued_resources().arg("delete").arg(name), loc).arg("--quiet")
}

pub fn describe(loc: Location<'_>, name: &str) -> CommandLine {
    located(tpu_vm(false).arg("describe").arg(name), loc).arg("--quiet")
}

/// Copy `local` to `remote` on every worker.
///
/// `local` is a shell word: the local shell expands `~` and globs in it, so
/// callers holding a literal path must quote it with
/// [`crate::exec::shell_escape`] first.
pub fn scp(
    loc: Location<'_>,
    target: Target<'_>,
    local: &str,
    remote: &str,
    recurse: bool,
) -> CommandLine {
    let cmd = tpu_vm(true)
        .arg("scp")
        .shell_word(local)
        .arg(format!("{}:{}", target.host(), remote))
        .flag_if("recurse", recurse)
        .arg("--worker=all")
        .arg("--quiet");
    located(cmd, loc)
}

/// Run `command` on every worker.
pub fn ssh(loc: Location<'_>, target: Target<'_>, command: &str) -> CommandLine {
    let cmd = tpu_vm(true).arg("ssh").arg(target.host());
    located(cmd, loc)
        .arg("--worker=all")
        .arg("--quiet")
        .opt("command", command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOC: Location<'static> = Location {
        zone: "us-central2-b",
        project: "proj",
    };

    const POD: PodSpec<'static> = PodSpec {
        name: "pod",
        accelerator_type: "v4-16",
        runtime_version: "tpu-ubuntu2204-base",
    };

    #[test]
    fn list_command() {
        assert_eq!(
            list(LOC).to_shell(),
            "gcloud compute tpus tpu-vm list --zone=us-central2-b --project=proj --quiet"
        );
    }

    #[test]
    fn create_command() {
        assert_eq!(
            create(LOC, POD).to_shell(),
            "gcloud alpha compute tpus tpu-vm create pod --zone=us-central2-b --project=proj \
             --version=tpu-ubuntu2204-base --accelerator-type=v4-16 --quiet"
        );
    }

    #[test]
    fn queue_command_modes() {
        let on_demand = queue(LOC, POD, ProvisioningMode::OnDemand);
        assert_eq!(
            on_demand.to_shell(),
            "gcloud alpha compute tpus queued-resources create pod --node-id=pod \
             --zone=us-central2-b --project=proj --accelerator-type=v4-16 \
             --runtime-version=tpu-ubuntu2204-base --quiet"
        );
        let reserved = queue(LOC, POD, ProvisioningMode::Reserved);
        assert_eq!(reserved.args.last().map(String::as_str), Some("--reserved"));
        assert!(!reserved.args.iter().any(|a| a == "--spot"));
        let spot = queue(LOC, POD, ProvisioningMode::Spot);
        assert_eq!(spot.args.last().map(String::as_str), Some("--spot"));
    }

    #[test]
    fn queue_list_and_delete() {
        assert_eq!(
            list_queue(LOC).to_shell(),
            "gcloud alpha compute tpus queued-resources list --zone=us-central2-b --project=proj --quiet"
        );
        assert_eq!(
            delete_queue(LOC, "pod").to_shell(),
            "gcloud alpha compute tpus queued-resources delete pod --zone=us-central2-b --project=proj --quiet"
        );
    }

    #[test]
    fn scp_targets_all_workers() {
        let target = Target {
            user: "alice",
            name: "pod",
        };
        assert_eq!(
            scp(LOC, target, "./data", "/home/alice/data", true).to_shell(),
            "gcloud alpha compute tpus tpu-vm scp ./data alice@pod:/home/alice/data --recurse \
             --worker=all --quiet --zone=us-central2-b --project=proj"
        );
        assert!(!scp(LOC, target, "a", "b", false).to_shell().contains("--recurse"));
        assert_eq!(
            scp(LOC, target, "~/data", "/remote/data", true).to_shell(),
            "gcloud alpha compute tpus tpu-vm scp ~/data alice@pod:/remote/data --recurse \
             --worker=all --quiet --zone=us-central2-b --project=proj"
        );
    }

    #[test]
    fn ssh_quotes_remote_command() {
        let target = Target {
            user: "alice",
            name: "pod",
        };
        assert_eq!(
            ssh(LOC, target, "tmux kill-session -t tpc").to_shell(),
            "gcloud alpha compute tpus tpu-vm ssh alice@pod --zone=us-central2-b --project=proj \
             --worker=all --quiet '--command=tmux kill-session -t tpc'"
        );
    }
}
