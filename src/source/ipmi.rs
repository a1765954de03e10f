// Licensed under the Open Software License version 3.0
use super::{SensorSource, SourceError};
use crate::{
    config::connection::ConnectionParams,
    hardware::types::{ContentHint, RawReport, SourceKind},
};
use async_trait::async_trait;
use std::{path::PathBuf, process::Stdio};
use tokio::process::Command;

/// Runs `ipmi-sensors -h <host> -u <user> -p <password>` once per fetch.
/// Arguments go straight to the executable, no shell is involved.
pub struct CommandLineSource {
    tool: PathBuf,
}

impl CommandLineSource {
    pub fn new(tool: PathBuf) -> Self {
        Self { tool }
    }

    fn build_command(&self, params: &ConnectionParams) -> Command {
        let mut command = Command::new(&self.tool);
        command
            .args([
                "-h",
                params.host(),
                "-u",
                params.user(),
                "-p",
                params.password(),
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the fetch (timeout, shutdown) kills the child
            .kill_on_drop(true);
        command
    }

    fn describe(&self, params: &ConnectionParams) -> String {
        format!(
            "{} -h {} -u {} -p ***",
            self.tool.display(),
            params.host(),
            params.user()
        )
    }
}

#[async_trait]
impl SensorSource for CommandLineSource {
    fn kind(&self) -> SourceKind {
        SourceKind::CommandLine
    }

    async fn fetch(&self, params: &ConnectionParams) -> Result<RawReport, SourceError> {
        tracing::trace!("Executing: {}", self.describe(params));
        let child = self
            .build_command(params)
            .spawn()
            .map_err(|error| SourceError::ToolNotFound {
                tool: self.tool.display().to_string(),
                reason: error.to_string(),
            })?;
        let output = child
            .wait_with_output()
            .await
            .map_err(|error| SourceError::ToolFailed {
                exit_code: None,
                stderr: error.to_string(),
            })?;

        if !output.status.success() {
            tracing::debug!(
                "{} exited with {}",
                self.tool.display(),
                output.status
            );
            return Err(SourceError::ToolFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        tracing::trace!(
            "{} succeeded with {} bytes of output",
            self.tool.display(),
            output.stdout.len()
        );
        Ok(RawReport::new(
            SourceKind::CommandLine,
            output.stdout,
            ContentHint::DelimitedText,
        ))
    }
}
