// Licensed under the Open Software License version 3.0
pub mod ipmi;
pub mod redfish;

use crate::{
    config::{
        connection::ConnectionParams,
        types::{Config, Transport},
    },
    hardware::types::{RawReport, SourceKind},
};
use async_trait::async_trait;
use ipmi::CommandLineSource;
use redfish::RedfishSource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failures. None of the messages carry credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SourceError {
    #[error("failed to execute {tool}: {reason}")]
    ToolNotFound { tool: String, reason: String },

    #[error("sensor tool failed ({}): {stderr}", describe_exit(.exit_code))]
    ToolFailed {
        /// `None` when the tool was killed by a signal
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("BMC rejected the credentials")]
    AuthFailed,

    #[error("BMC answered with HTTP {status_code}")]
    HttpError { status_code: u16 },

    #[error("BMC unreachable: {reason}")]
    Unreachable { reason: String },
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => String::from("terminated by signal"),
    }
}

/// Produces one raw sensor report per call for a single BMC
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn fetch(&self, params: &ConnectionParams) -> Result<RawReport, SourceError>;
}

/// Builds the source for a transport from the shared config sections
pub fn build_source(
    transport: Transport,
    config: &Config,
) -> Result<Box<dyn SensorSource>, SourceError> {
    match transport {
        Transport::Cli => Ok(Box::new(CommandLineSource::new(config.ipmi.get_tool()))),
        Transport::Redfish => Ok(Box::new(RedfishSource::new(&config.redfish)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failed_message() {
        let error = SourceError::ToolFailed {
            exit_code: Some(1),
            stderr: String::from("permission denied"),
        };
        assert_eq!(
            error.to_string(),
            "sensor tool failed (exit code 1): permission denied"
        );
        let error = SourceError::ToolFailed {
            exit_code: None,
            stderr: String::new(),
        };
        assert!(error.to_string().contains("terminated by signal"));
    }
}
