//! External command execution
//!
//! Everything flakeforge asks of `nix` and `git` goes through the
//! [`CommandRunner`] trait. [`SystemRunner`] spawns real processes with
//! `tokio::process`; tests substitute `testing::RecordingRunner`.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Description of a process to launch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    envs: BTreeMap<String, String>,
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

    /// Set an environment variable on top of the inherited environment
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.envs.get(key).map(String::as_str)
    }

    pub fn get_envs(&self) -> &BTreeMap<String, String> {
        &self.envs
    }

    /// Build a tokio command; the child is killed if its future is dropped.
    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.envs).kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// How a process finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    code: Option<i32>,
}

impl CommandStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// A process terminated by a signal
    pub fn signaled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {}", code),
            None => f.write_str("signal termination"),
        }
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: CommandStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: CommandStatus::from_code(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status: CommandStatus::from_code(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Turn an unsuccessful exit into `Error::CommandFailed`, keeping
    /// whatever the process printed.
    pub fn check(self, spec: &CommandSpec) -> Result<Self> {
        if self.status.success() {
            return Ok(self);
        }
        let mut output = self.stdout_lossy();
        output.push_str(&self.stderr_lossy());
        Err(Error::command_failed(
            spec.to_string(),
            self.status.to_string(),
            output,
        ))
    }
}

/// Capability for running external programs.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run with stdin, stdout and stderr inherited from this process.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandStatus>;

    /// Run with stdout and stderr captured separately.
    async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run with both streams captured; everything is returned in `stdout`,
    /// stdout first.
    async fn combined_output(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// `run`, killed once `timeout` elapses.
    async fn run_with_timeout(
        &self,
        spec: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<CommandStatus> {
        let Some(limit) = timeout else {
            return self.run(spec).await;
        };
        match tokio::time::timeout(limit, self.run(spec)).await {
            Ok(result) => result,
            Err(_) => Err(Error::CommandTimeout {
                command: spec.to_string(),
                timeout: limit,
            }),
        }
    }
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn spawn_error(spec: &CommandSpec, err: std::io::Error) -> Error {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::command_not_found(spec.program())
        } else {
            Error::CommandSpawn {
                command: spec.to_string(),
                source: err,
            }
        }
    }

    async fn captured(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("running command: {}", spec);
        let output = spec
            .to_command()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Self::spawn_error(spec, e))?;

        Ok(CommandOutput {
            status: output.status.into(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandStatus> {
        debug!("running command: {}", spec);
        let status = spec
            .to_command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Self::spawn_error(spec, e))?;
        Ok(status.into())
    }

    async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.captured(spec).await
    }

    async fn combined_output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut output = self.captured(spec).await?;
        let stderr = std::mem::take(&mut output.stderr);
        output.stdout.extend_from_slice(&stderr);
        Ok(output)
    }
}
