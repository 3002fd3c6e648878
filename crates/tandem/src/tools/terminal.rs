use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use super::process::{format_seconds, run_with_timeout, ProcessOutcome};
use super::{require_str, str_arg, AgentTool, ParameterType, ToolParameter, ToolResult};
use crate::config::Settings;
use crate::errors::{AgentError, AgentResult};

/// Runs shell commands through the configured shell
pub struct TerminalTool {
    shell: String,
    timeout: Duration,
    working_dir: Option<PathBuf>,
    parameters: Vec<ToolParameter>,
}

impl TerminalTool {
    pub fn new<S: Into<String>>(shell: S, timeout: Duration, working_dir: Option<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            timeout,
            working_dir,
            parameters: vec![
                ToolParameter::required("command", ParameterType::String, "The command to run"),
                ToolParameter::optional(
                    "working_directory",
                    ParameterType::String,
                    "Directory to run the command in",
                    None,
                ),
            ],
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.terminal_shell.clone(),
            settings.terminal_timeout(),
            Some(settings.terminal_working_dir()),
        )
    }
}

fn format_output(stdout: &str, stderr: &str) -> String {
    let mut output = String::new();
    if !stdout.is_empty() {
        output.push_str(&format!("STDOUT:\n{}", stdout));
    }
    if !stderr.is_empty() {
        if !output.is_empty() {
            output.push_str("\n\n");
        }
        output.push_str(&format!("STDERR:\n{}", stderr));
    }
    if output.is_empty() {
        output.push_str("Command executed successfully (no output)");
    }
    output
}

#[async_trait]
impl AgentTool for TerminalTool {
    fn name(&self) -> &str {
        "terminal"
    }

    fn description(&self) -> &str {
        "Execute terminal/shell commands and return output"
    }

    fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    async fn execute(&self, arguments: Value) -> AgentResult<ToolResult> {
        let command_text = require_str(&arguments, "command")?;
        let work_dir = str_arg(&arguments, "working_directory")
            .map(PathBuf::from)
            .or_else(|| self.working_dir.clone());

        let mut command = Command::new(&self.shell);
        command.arg("-c").arg(command_text);
        if let Some(dir) = &work_dir {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AgentError::ExecutionError(format!(
                    "Terminal command failed: cannot create {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            command.current_dir(dir);
        }
        debug!(shell = %self.shell, command = command_text, "running terminal command");

        let metadata = |result: ToolResult, return_code: Option<i32>| {
            result
                .with_meta("command", json!(command_text))
                .with_meta("return_code", json!(return_code))
                .with_meta(
                    "working_directory",
                    json!(work_dir.as_ref().map(|d| d.display().to_string())),
                )
                .with_meta("shell", json!(self.shell))
        };

        let output = match run_with_timeout(command, self.timeout).await? {
            ProcessOutcome::TimedOut => {
                return Ok(metadata(
                    ToolResult::failure(format!(
                        "Command timed out after {} seconds",
                        format_seconds(self.timeout)
                    )),
                    None,
                ));
            }
            ProcessOutcome::Completed(output) => output,
        };

        let formatted = format_output(&output.stdout, &output.stderr);
        let result = if output.succeeded() {
            ToolResult::success(formatted)
        } else if output.stderr.trim().is_empty() {
            ToolResult::failure(formatted)
        } else {
            ToolResult::failure(output.stderr.clone())
        };
        Ok(metadata(result, output.status))
    }
}
