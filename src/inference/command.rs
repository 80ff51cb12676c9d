use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::InferenceGateway;

/// Runs `<program> run <model>` per question.
///
/// The prompt goes to the child's stdin as-is: it is never split into
/// arguments and is not bounded by the argv size limit.
pub struct CommandGateway {
    program: PathBuf,
    model: String,
}

impl CommandGateway {
    pub fn new(program: &Path, model: &str) -> Self {
        Self {
            program: program.to_path_buf(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl InferenceGateway for CommandGateway {
    async fn query(&self, prompt: &str) -> Result<String> {
        log::debug!(
            "Running {:?} run {} ({} prompt chars)",
            self.program,
            self.model,
            prompt.chars().count()
        );

        let mut child = Command::new(&self.program)
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {:?}", self.program))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Child stdin was not captured"))?;
        stdin.write_all(prompt.as_bytes()).await?;
        // Closing stdin tells the model the prompt is complete.
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(anyhow!(
                "{:?} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
