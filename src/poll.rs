// Licensed under the Open Software License version 3.0
pub mod backoff;

use crate::{
    collector::{Collector, CollectorError},
    config::{connection::ConnectionParams, types::PollConfig},
    hardware::types::Snapshot,
    source::SensorSource,
};
use backoff::Backoff;
use serde::{Deserialize, Serialize};
use std::{cmp::max, time::Duration};
use thiserror::Error;
use tokio::{sync::broadcast, time::sleep};

const MIN_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PollError {
    #[error("{target} rejected the credentials, polling stopped")]
    AuthRejected { target: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub backoff_ceiling: Duration,
}

impl PollSettings {
    /// `interval` comes from the command line and wins over the config file
    pub fn from_config(config: &PollConfig, interval: Option<Duration>) -> Self {
        Self {
            interval: max(interval.unwrap_or(config.get_interval()), MIN_INTERVAL),
            timeout: config.get_timeout(),
            backoff_ceiling: config.get_backoff_ceiling(),
        }
    }
}

fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// One collection bounded by `timeout`. The collection is dropped on expiry.
pub async fn collect_once(
    collector: &Collector,
    source: &dyn SensorSource,
    params: &ConnectionParams,
    timeout: Duration,
) -> Snapshot {
    match tokio::time::timeout(timeout, collector.collect(source, params)).await {
        Ok(snapshot) => snapshot,
        Err(_) => Snapshot::failure(
            collector.target().to_string(),
            source.kind(),
            CollectorError::TimedOut {
                timeout_ms: timeout_ms(timeout),
            },
        ),
    }
}

/// Collects until shutdown. Every snapshot is handed to `on_snapshot`.
/// Rejected credentials end the loop with an error.
pub async fn start_poll_loop<F>(
    mut shutdown_rx: broadcast::Receiver<()>,
    collector: Collector,
    source: Box<dyn SensorSource>,
    params: ConnectionParams,
    settings: PollSettings,
    mut on_snapshot: F,
) -> Result<(), PollError>
where
    F: FnMut(Snapshot) + Send,
{
    tracing::trace!("Starting poll loop for {}", collector.target());
    let mut backoff = Backoff::new(settings.interval, settings.backoff_ceiling);

    loop {
        let snapshot = tokio::select! {
            snapshot = collect_once(&collector, source.as_ref(), &params, settings.timeout) => snapshot,
            _ = shutdown_rx.recv() => {
                tracing::trace!("Shutting down poll loop for {} mid-collection", collector.target());
                break;
            }
        };

        let auth_rejected = snapshot
            .error
            .as_ref()
            .is_some_and(CollectorError::is_auth_failure);
        match &snapshot.error {
            None => {
                tracing::debug!(
                    "Collected {} readings from {}",
                    snapshot.readings.len(),
                    collector.target()
                );
                backoff.record_success();
            }
            Some(error) => {
                backoff.record_failure();
                tracing::warn!(
                    "Collection from {} failed ({} in a row): {}",
                    collector.target(),
                    backoff.failures(),
                    error
                );
            }
        }
        on_snapshot(snapshot);

        if auth_rejected {
            tracing::error!("{} rejected the credentials, giving up", collector.target());
            return Err(PollError::AuthRejected {
                target: collector.target().to_string(),
            });
        }

        let delay = backoff.delay();
        tracing::trace!("Next collection from {} in {:?}", collector.target(), delay);
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::trace!("Shutting down poll loop for {}", collector.target());
                break;
            }
            _ = sleep(delay) => {}
        }
    }
    tracing::trace!("Stopped poll loop for {}", collector.target());
    Ok(())
}
