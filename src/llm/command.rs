//! Subprocess backend - pipes the prompt through a local model CLI

use crate::llm::{LlmBackend, LlmError, LlmMode};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Backend that runs a local program once per invocation
///
/// The program receives its configured arguments, optionally `<mode_flag> <mode>`,
/// and finally the prompt. Its stdout is the raw model output.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    /// Path to the executable
    program: String,

    /// Arguments placed before the prompt
    args: Vec<String>,

    /// Flag used to forward the invocation mode, e.g. `--mode`
    mode_flag: Option<String>,

    /// Timeout for command execution in seconds
    timeout_secs: u64,
}

impl CommandBackend {
    /// Create a new subprocess backend
    ///
    /// # Arguments
    /// * `program` - Path to the executable (e.g., "llm", "/usr/local/bin/ollama")
    /// * `timeout_secs` - Timeout for command execution in seconds
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            mode_flag: None,
            timeout_secs,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_mode_flag(mut self, flag: impl Into<String>) -> Self {
        self.mode_flag = Some(flag.into());
        self
    }

    /// Get the executable path
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command_args(&self, prompt: &str, mode: LlmMode) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(flag) = &self.mode_flag {
            args.push(flag.clone());
            args.push(mode.to_string());
        }
        args.push(prompt.to_string());
        args
    }
}

#[async_trait]
impl LlmBackend for CommandBackend {
    /// Execute a prompt through the subprocess
    ///
    /// # Errors
    /// Returns `LlmError` if:
    /// - The executable cannot be spawned
    /// - It exits with a non-zero status
    /// - The output is not valid UTF-8
    /// - The command times out
    async fn invoke(&self, prompt: &str, mode: LlmMode) -> Result<String, LlmError> {
        debug!(
            "Spawning {} with {} prompt of length {}",
            self.program,
            mode,
            prompt.len()
        );

        let timeout_duration = Duration::from_secs(self.timeout_secs);

        let result = timeout(
            timeout_duration,
            Command::new(&self.program)
                .args(self.command_args(prompt, mode))
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| LlmError::Timeout(self.timeout_secs))?;

        let output = result.map_err(|e| {
            LlmError::Internal(format!("Failed to execute {}: {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", self.program, exit_code, stderr.trim());
            return Err(LlmError::Api(format!(
                "{} exited with code {}: {}",
                self.program,
                exit_code,
                stderr.trim()
            )));
        }

        let content = String::from_utf8(output.stdout).map_err(|e| {
            LlmError::Internal(format!("Failed to decode {} output: {}", self.program, e))
        })?;

        debug!("{} returned {} bytes of output", self.program, content.len());

        Ok(content)
    }

    fn name(&self) -> &str {
        "command"
    }
}
