//! Test doubles for the command execution capability
//!
//! Enabled with the `testing` cargo feature so that downstream crates can use
//! it from their integration tests.

use crate::error::Result;
use crate::process::{CommandOutput, CommandRunner, CommandSpec, CommandStatus};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Which capability method a recorded call went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Run,
    Output,
    CombinedOutput,
}

/// A recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub spec: CommandSpec,
}

impl RecordedCall {
    /// The command line as it would be displayed
    pub fn line(&self) -> String {
        self.spec.to_string()
    }
}

/// Records every command and replies with canned output.
///
/// Responses are matched by substring against the rendered command line;
/// the first registered match wins. Unmatched commands succeed with empty
/// output.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    responses: Arc<Mutex<Vec<(String, CommandOutput)>>>,
    delay: Option<Duration>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to any command line containing `pattern`
    pub fn respond(&self, pattern: &str, output: CommandOutput) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push((pattern.to_string(), output));
        self
    }

    /// Make every command take `delay` to complete
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Rendered command lines, in call order
    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::line).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn record(&self, kind: CallKind, spec: &CommandSpec) -> CommandOutput {
        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            spec: spec.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let line = spec.to_string();
        self.responses
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::success(""))
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandStatus> {
        Ok(self.record(CallKind::Run, spec).await.status)
    }

    async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        Ok(self.record(CallKind::Output, spec).await)
    }

    async fn combined_output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut output = self.record(CallKind::CombinedOutput, spec).await;
        let stderr = std::mem::take(&mut output.stderr);
        output.stdout.extend_from_slice(&stderr);
        Ok(output)
    }
}
