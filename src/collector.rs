// Licensed under the Open Software License version 3.0
use crate::{
    config::connection::ConnectionParams,
    hardware::types::Snapshot,
    parser::{self, ParseError},
    source::{SensorSource, SourceError},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CollectorError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("collection timed out after {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },
}

impl CollectorError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Source(SourceError::AuthFailed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Idle,
    Fetching,
    Parsing,
    Done,
    Failed,
}

/// Runs single collection cycles for one target
#[derive(Debug, Clone)]
pub struct Collector {
    target: String,
}

impl Collector {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn transition(&self, from: CollectionState, to: CollectionState) -> CollectionState {
        tracing::trace!(bmc = %self.target, ?from, ?to, "collection state changed");
        to
    }

    /// Fetch then parse. Failures end up in `Snapshot::error`, never retried.
    pub async fn collect(&self, source: &dyn SensorSource, params: &ConnectionParams) -> Snapshot {
        let kind = source.kind();
        let state = self.transition(CollectionState::Idle, CollectionState::Fetching);
        let report = match source.fetch(params).await {
            Ok(report) => report,
            Err(error) => {
                self.transition(state, CollectionState::Failed);
                return Snapshot::failure(self.target.clone(), kind, error.into());
            }
        };
        tracing::trace!("Received {} bytes from {}", report.payload.len(), self.target);

        let state = self.transition(state, CollectionState::Parsing);
        match parser::parse(&report) {
            Ok(readings) => {
                self.transition(state, CollectionState::Done);
                Snapshot::success(self.target.clone(), kind, readings)
            }
            Err(error) => {
                self.transition(state, CollectionState::Failed);
                Snapshot::failure(self.target.clone(), kind, error.into())
            }
        }
    }
}
