// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] holds `CommandLine` (program + arguments, shell quoting),
//!   `ExecOptions` and the `CommandInvocation` result.
//! - [`backend`] provides the `Executor` trait and the production
//!   `ShellExecutor`, which runs commands through `sh -c` with
//!   `tokio::process::Command`, streaming and capturing their output.

pub mod backend;
pub mod command;

pub use backend::{Executor, ShellExecutor};
pub use command::{CommandInvocation, CommandLine, ExecOptions, shell_escape};
