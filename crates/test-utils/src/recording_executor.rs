use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tpc::errors::{Result, TpcError};
use tpc::exec::{CommandInvocation, CommandLine, ExecOptions, Executor};

/// Scripted result for commands matching a rule.
#[derive(Debug, Clone)]
pub enum Response {
    Output(Vec<String>),
    Fail(i32),
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    response: Response,
}

/// One call seen by the executor.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub command: CommandLine,
    pub options: ExecOptions,
    /// `(path, contents)` of every argument that named an existing local
    /// file at call time.
    pub files: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn shell(&self) -> String {
        self.command.to_shell()
    }

    /// Whether the program or any argument contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        mentions(&self.command, needle)
    }
}

/// Whether the program or any argument of `command` contains `needle`.
pub fn mentions(command: &CommandLine, needle: &str) -> bool {
    command.program.contains(needle) || command.args.iter().any(|a| a.contains(needle))
}

/// A fake executor that:
/// - records every command line it is asked to run
/// - answers with the first matching scripted response, or empty success.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    rules: Vec<Rule>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands mentioning `needle` exit with `code`.
    pub fn fail_when(mut self, needle: &str, code: i32) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            response: Response::Fail(code),
        });
        self
    }

    /// Commands mentioning `needle` succeed with `lines` as output.
    pub fn respond_when(mut self, needle: &str, lines: &[&str]) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            response: Response::Output(lines.iter().map(|l| l.to_string()).collect()),
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Shell renderings of every recorded call, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::shell).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn respond(&self, command: &CommandLine, options: ExecOptions) -> Result<CommandInvocation> {
        let files = command
            .args
            .iter()
            .filter(|arg| Path::new(arg.as_str()).is_file())
            .map(|arg| {
                let contents = std::fs::read_to_string(arg).unwrap_or_default();
                (arg.clone(), contents)
            })
            .collect();

        self.calls.lock().unwrap().push(RecordedCall {
            command: command.clone(),
            options,
            files,
        });

        let response = self
            .rules
            .iter()
            .find(|rule| mentions(command, &rule.needle))
            .map(|rule| rule.response.clone())
            .unwrap_or(Response::Output(Vec::new()));

        match response {
            Response::Output(lines) => Ok(CommandInvocation {
                command: command.clone(),
                lines,
                exit_code: 0,
            }),
            Response::Fail(code) => Err(TpcError::ExecutionError {
                code,
                command: command.to_shell(),
            }),
        }
    }
}

impl Executor for RecordingExecutor {
    fn execute<'a>(
        &'a self,
        command: &'a CommandLine,
        options: ExecOptions,
    ) -> Pin<Box<dyn Future<Output = Result<CommandInvocation>> + Send + 'a>> {
        Box::pin(async move { self.respond(command, options) })
    }
}
