use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use strum_macros::{AsRefStr, Display, EnumString};
use tokio::process::Command;
use tracing::debug;

use super::process::{format_seconds, run_with_timeout, ProcessOutcome};
use super::{require_str, str_arg, AgentTool, ParameterType, ToolParameter, ToolResult};
use crate::config::Settings;
use crate::errors::{AgentError, AgentResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CodeType {
    Python,
    Bash,
    R,
}

impl CodeType {
    fn extension(&self) -> &'static str {
        match self {
            CodeType::Python => ".py",
            CodeType::Bash => ".sh",
            CodeType::R => ".r",
        }
    }

    pub fn interpreter(&self) -> &'static str {
        match self {
            CodeType::Python => "python3",
            CodeType::Bash => "bash",
            CodeType::R => "Rscript",
        }
    }
}

/// Runs Python, Bash or R snippets from a temporary file
pub struct CodeExecutionTool {
    enabled: bool,
    allowed_types: Vec<String>,
    timeout: Duration,
    working_dir: Option<PathBuf>,
    parameters: Vec<ToolParameter>,
}

impl CodeExecutionTool {
    pub fn new(enabled: bool, allowed_types: Vec<String>, timeout: Duration) -> Self {
        Self {
            enabled,
            allowed_types,
            timeout,
            working_dir: None,
            parameters: vec![
                ToolParameter::required("code", ParameterType::String, "The source code to run"),
                ToolParameter::optional(
                    "code_type",
                    ParameterType::String,
                    "Language of the code: python, bash or r",
                    Some(json!("python")),
                ),
            ],
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.enable_code_execution,
            settings.allowed_code_types.clone(),
            settings.code_execution_timeout(),
        )
        .with_working_dir(settings.terminal_working_dir())
    }

    /// Run snippets inside `dir` when it exists
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    fn write_source(&self, code_type: CodeType, code: &str) -> AgentResult<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("tandem-code-")
            .suffix(code_type.extension())
            .tempfile()
            .map_err(|e| AgentError::ExecutionError(format!("Code execution failed: {}", e)))?;
        file.write_all(code.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| AgentError::ExecutionError(format!("Code execution failed: {}", e)))?;
        Ok(file)
    }
}

#[async_trait]
impl AgentTool for CodeExecutionTool {
    fn name(&self) -> &str {
        "code_execution"
    }

    fn description(&self) -> &str {
        "Execute Python, Bash, or R code and return the output"
    }

    fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    async fn execute(&self, arguments: Value) -> AgentResult<ToolResult> {
        let code = require_str(&arguments, "code")?;
        let requested = str_arg(&arguments, "code_type").unwrap_or("python");

        if !self.enabled {
            return Ok(ToolResult::failure("Code execution is disabled"));
        }
        if !self
            .allowed_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(requested))
        {
            return Ok(ToolResult::failure(format!(
                "Code type '{}' not allowed. Allowed types: {}",
                requested,
                self.allowed_types.join(", ")
            )));
        }
        let Ok(code_type) = CodeType::from_str(requested) else {
            return Ok(ToolResult::failure(format!(
                "Code type '{}' is not supported",
                requested
            )));
        };

        // Removed from disk when dropped
        let source = self.write_source(code_type, code)?;

        let mut command = Command::new(code_type.interpreter());
        command.arg(source.path());
        if let Some(dir) = self.working_dir.as_ref().filter(|d| d.is_dir()) {
            command.current_dir(dir);
        }
        debug!(code_type = %code_type, "running code snippet");

        let output = match run_with_timeout(command, self.timeout).await? {
            ProcessOutcome::TimedOut => {
                return Ok(ToolResult::failure(format!(
                    "Code execution timed out after {} seconds",
                    format_seconds(self.timeout)
                ))
                .with_meta("code_type", json!(code_type.as_ref())));
            }
            ProcessOutcome::Completed(output) => output,
        };

        let result = if output.succeeded() {
            let mut content = output.stdout.clone();
            if !output.stderr.is_empty() {
                content.push_str(&format!("\nSTDERR:\n{}", output.stderr));
            }
            ToolResult::success(content)
        } else if !output.stderr.trim().is_empty() {
            ToolResult::failure(output.stderr.clone())
        } else if !output.stdout.trim().is_empty() {
            ToolResult::failure(output.stdout.clone())
        } else {
            ToolResult::failure(format!(
                "Process exited with code {}",
                output.status.map_or("unknown".to_string(), |c| c.to_string())
            ))
        };

        Ok(result
            .with_meta("code_type", json!(code_type.as_ref()))
            .with_meta("return_code", json!(output.status)))
    }
}
