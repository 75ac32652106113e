// src/exec/command.rs

//! Command lines and their results.

use std::collections::BTreeSet;
use std::fmt;

/// An external command: program plus ordered arguments.
///
/// Rendered to a single shell line by [`CommandLine::to_shell`], quoting
/// every argument so nested remote commands reach the remote shell intact.
/// Arguments added with [`CommandLine::shell_word`] are the exception: they
/// are left for the local shell to expand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    /// Indices into `args` rendered without quoting.
    expanded: BTreeSet<usize>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            expanded: BTreeSet::new(),
        }
    }

    /// Append an argument the local shell expands (`~`, globs, `$VAR`).
    pub fn shell_word(mut self, word: impl Into<String>) -> Self {
        self.expanded.insert(self.args.len());
        self.args.push(word.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `--name=value`.
    pub fn opt(self, name: &str, value: impl fmt::Display) -> Self {
        self.arg(format!("--{name}={value}"))
    }

    /// Append `--name` only when `enabled`.
    pub fn flag_if(self, name: &str, enabled: bool) -> Self {
        if enabled {
            self.arg(format!("--{name}"))
        } else {
            self
        }
    }

    /// Render as one shell-quoted line suitable for `sh -c`.
    pub fn to_shell(&self) -> String {
        let args = self.args.iter().enumerate().map(|(i, arg)| {
            if self.expanded.contains(&i) {
                arg.clone()
            } else {
                shell_escape(arg)
            }
        });
        std::iter::once(shell_escape(&self.program))
            .chain(args)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell())
    }
}

/// Quote `s` for a POSIX shell, leaving it bare when that is safe.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    let safe = |c: char| {
        c.is_ascii_alphanumeric()
            || matches!(c, '-' | '_' | '.' | '/' | '%' | ':' | '=' | '@' | ',' | '+')
    };
    if s.chars().all(safe) {
        return s.to_string();
    }
    let escaped = s.replace('\'', "'\\''");
    format!("'{}'", escaped)
}

/// How a command is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Print the command line before running it.
    pub echo: bool,
    /// Print output lines as they arrive.
    pub stream_output: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            echo: true,
            stream_output: true,
        }
    }
}

/// Result of one successful external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: CommandLine,
    /// stdout and stderr lines, in the order they were read.
    pub lines: Vec<String>,
    pub exit_code: i32,
}

impl CommandInvocation {
    /// All output lines joined with `\n`.
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }
}
