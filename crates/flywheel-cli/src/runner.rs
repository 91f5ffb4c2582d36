//! External command execution.
//!
//! Steps never spawn processes directly; they build a [`CommandSpec`] and hand
//! it to a [`CommandRunner`]. That keeps `--dry-run` and tests out of the
//! step logic.

use crate::error::{CliError, CliResult};
use async_trait::async_trait;
use colored::Colorize;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const REDACTED: &str = "****";

/// One external command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    /// Read-only commands still run under `--dry-run`.
    pub read_only: bool,
    /// Values masked when the command is displayed.
    secrets: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
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

    /// Append an argument containing `secret`, which is masked on display.
    pub fn secret_arg(mut self, arg: impl Into<String>, secret: &str) -> Self {
        if !secret.is_empty() {
            self.secrets.push(secret.to_string());
        }
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Shell-like rendering with secrets masked.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            let mut shown = arg.clone();
            for secret in &self.secrets {
                shown = shown.replace(secret.as_str(), REDACTED);
            }
            out.push(' ');
            if shown.is_empty() || shown.contains(char::is_whitespace) || shown.contains('"') {
                out.push('\'');
                out.push_str(&shown.replace('\'', "'\\''"));
                out.push('\'');
            } else {
                out.push_str(&shown);
            }
        }
        if self.stdin.is_some() {
            out.push_str(" < (stdin)");
        }
        out
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[cfg(test)]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. A non-zero exit is *not* an error here.
    async fn run(&self, spec: &CommandSpec) -> CliResult<CommandOutput>;

    /// Whether mutating commands are only printed.
    fn is_dry_run(&self) -> bool {
        false
    }

    /// Run and turn a non-zero exit into [`CliError::CommandFailed`].
    async fn run_checked(&self, spec: &CommandSpec) -> CliResult<String> {
        let output = self.run(spec).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(CliError::CommandFailed {
                command: spec.display(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> CliResult<CommandOutput> {
        debug!(command = %spec.display(), "running");
        let spawn_err = |source| CliError::Spawn {
            command: spec.display(),
            source,
        };

        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn().map_err(spawn_err)?;
        if let Some(input) = &spec.stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(input.as_bytes()).await.map_err(spawn_err)?;
            // Closing stdin lets the child see EOF.
            drop(pipe);
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(command = %spec.program, code = ?result.code, "finished");
        Ok(result)
    }
}

/// Prints mutating commands instead of running them. Read-only commands are
/// passed to the inner runner so later steps still see real cluster state.
pub struct DryRunRunner<R> {
    inner: R,
}

impl<R: CommandRunner> DryRunRunner<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: CommandRunner> CommandRunner for DryRunRunner<R> {
    async fn run(&self, spec: &CommandSpec) -> CliResult<CommandOutput> {
        if spec.read_only {
            return self.inner.run(spec).await;
        }
        println!("{} {}", "[dry-run]".yellow(), spec.display());
        Ok(CommandOutput::ok(""))
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
