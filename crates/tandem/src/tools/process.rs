use std::process::Stdio;
use std::time::Duration;

use kill_tree::{blocking::kill_tree_with_config, Config};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{AgentError, AgentResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was ended by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn succeeded(&self) -> bool {
        self.status == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Completed(ProcessOutput),
    TimedOut,
}

/// Render a timeout the way tool error messages show it: `10`, `0.5`
pub fn format_seconds(duration: Duration) -> String {
    format!("{}", duration.as_secs_f64())
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Kill a process and everything it spawned
pub(crate) fn kill_process_tree(pid: u32) {
    let config = Config {
        signal: "SIGKILL".to_string(),
        ..Default::default()
    };
    match kill_tree_with_config(pid, &config) {
        Ok(outputs) => debug!(pid, killed = outputs.len(), "killed process tree"),
        Err(e) => warn!(pid, error = %e, "failed to kill process tree"),
    }
}

/// Run a command to completion, capturing its output.
///
/// When `timeout` elapses first the whole process tree is killed and
/// [`ProcessOutcome::TimedOut`] is returned.
pub async fn run_with_timeout(mut command: Command, timeout: Duration) -> AgentResult<ProcessOutcome> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| AgentError::ExecutionError(format!("Failed to start process: {}", e)))?;
    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let run = async {
        tokio::try_join!(child.wait(), read_all(stdout), read_all(stderr))
    };
    let outcome = tokio::time::timeout(timeout, run).await;

    match outcome {
        Ok(Ok((status, stdout, stderr))) => Ok(ProcessOutcome::Completed(ProcessOutput {
            status: status.code(),
            stdout,
            stderr,
        })),
        Ok(Err(e)) => Err(AgentError::ExecutionError(format!(
            "Failed to collect process output: {}",
            e
        ))),
        Err(_) => {
            if let Some(pid) = pid {
                tokio::task::spawn_blocking(move || kill_process_tree(pid))
                    .await
                    .ok();
            }
            if let Err(e) = child.kill().await {
                debug!(error = %e, "process already gone after timeout");
            }
            Ok(ProcessOutcome::TimedOut)
        }
    }
}

/// Interpreter lookup that tolerates missing binaries
pub fn program_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}
