// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The gateway talks to an `Executor` instead of spawning processes itself.
//! Production code uses [`ShellExecutor`]; tests provide an implementation
//! that records command lines and returns scripted results.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::info;

use crate::errors::{Result, TpcError};
use crate::exec::command::{CommandInvocation, CommandLine, ExecOptions};

/// Trait abstracting how external commands are run.
pub trait Executor: Send + Sync {
    /// Run `command` to completion.
    ///
    /// Returns the captured output on exit code 0 and
    /// [`TpcError::ExecutionError`] otherwise.
    fn execute<'a>(
        &'a self,
        command: &'a CommandLine,
        options: ExecOptions,
    ) -> Pin<Box<dyn Future<Output = Result<CommandInvocation>> + Send + 'a>>;
}

/// Runs commands through `sh -c`, streaming their output.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for ShellExecutor {
    fn execute<'a>(
        &'a self,
        command: &'a CommandLine,
        options: ExecOptions,
    ) -> Pin<Box<dyn Future<Output = Result<CommandInvocation>> + Send + 'a>> {
        Box::pin(run_shell(command, options))
    }
}

/// Prefix that sends the shell's stderr into its stdout, so both streams
/// share one pipe and keep their relative order.
const MERGE_STDERR: &str = "exec 2>&1; ";

async fn run_shell(command: &CommandLine, options: ExecOptions) -> Result<CommandInvocation> {
    let line = command.to_shell();
    if options.echo {
        println!("Running command: \n{line}\n");
    }
    info!(cmd = %line, "starting process");

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(format!("{MERGE_STDERR}{line}"))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning `{}`", command.program))?;

    let mut lines = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout).lines();
        while let Some(out) = reader
            .next_line()
            .await
            .with_context(|| format!("reading output of `{}`", command.program))?
        {
            let out = out.trim_end().to_string();
            if options.stream_output {
                println!("{out}");
            }
            lines.push(out);
        }
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for `{}`", command.program))?;
    let code = status.code().unwrap_or(-1);

    info!(
        cmd = %line,
        exit_code = code,
        lines = lines.len(),
        success = status.success(),
        "process exited"
    );

    if !status.success() {
        return Err(TpcError::ExecutionError {
            code,
            command: line,
        });
    }

    Ok(CommandInvocation {
        command: command.clone(),
        lines,
        exit_code: code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> ExecOptions {
        ExecOptions {
            echo: false,
            stream_output: false,
        }
    }

    #[tokio::test]
    async fn stdout_and_stderr_interleave_in_write_order() {
        let cmd = CommandLine::new("sh")
            .arg("-c")
            .arg("for i in 1 2 3 4 5; do echo o$i; echo e$i 1>&2; done");
        let executor = ShellExecutor::new();
        for _ in 0..20 {
            let inv = executor.execute(&cmd, quiet()).await.unwrap();
            assert_eq!(inv.exit_code, 0);
            assert_eq!(
                inv.lines,
                vec!["o1", "e1", "o2", "e2", "o3", "e3", "o4", "e4", "o5", "e5"]
            );
        }
    }

    #[tokio::test]
    async fn preserves_line_order_within_a_stream() {
        let cmd = CommandLine::new("printf").arg("a\\nb\\nc\\n");
        let inv = ShellExecutor::new().execute(&cmd, quiet()).await.unwrap();
        assert_eq!(inv.lines, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_execution_error() {
        let cmd = CommandLine::new("sh").arg("-c").arg("exit 3");
        let err = ShellExecutor::new().execute(&cmd, quiet()).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        match err {
            TpcError::ExecutionError { command, .. } => assert!(command.contains("exit 3")),
            other => panic!("expected ExecutionError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shell_words_are_expanded_locally() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        let cmd = CommandLine::new("echo").shell_word("~/data");
        let inv = ShellExecutor::new().execute(&cmd, quiet()).await.unwrap();
        assert_eq!(inv.lines, vec![format!("{home}/data")]);
    }

    #[tokio::test]
    async fn arguments_are_not_reinterpreted_by_the_shell() {
        let cmd = CommandLine::new("echo").arg("$HOME; echo injected");
        let inv = ShellExecutor::new().execute(&cmd, quiet()).await.unwrap();
        assert_eq!(inv.lines, vec!["$HOME; echo injected"]);
    }
}
