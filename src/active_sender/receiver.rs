// Licensed under the Open Software License version 3.0
use super::config::{ActiveSenderConfig, Endpoint};
use crate::hardware::types::Snapshot;
use serde::Serialize;
use std::{cmp::max, collections::HashMap, time::Duration};
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc,
    },
    time::Instant,
};
use tokio_stream::StreamExt;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const QUEUE_CAPACITY: usize = 16;

pub async fn send_data<T>(
    client: &reqwest::Client,
    json: &T,
    endpoint: &Endpoint,
    timeout: &Duration,
    ignore_connection_errors: &bool,
) where
    T: ?Sized + Serialize,
{
    let mut request = client.post(&endpoint.url).json(json).timeout(*timeout);
    if let Some(token) = &endpoint.bearer_token {
        request = request.bearer_auth(token);
    }
    let result = request.send().await;
    match result {
        Ok(response) => {
            if response.status().is_success() {
                // Only useful against httpbin-like echo servers
                #[cfg(debug_assertions)]
                {
                    if let Ok(json) = response.json::<serde_json::Value>().await {
                        tracing::trace!(?json, ?endpoint.url);
                    }
                }
            } else {
                tracing::warn!("Got {} response from {}", response.status(), endpoint.url);
            }
        }
        Err(error) => {
            if *ignore_connection_errors && error.is_connect() {
                return;
            }
            tracing::warn!("Connection failed: {}", error);
        }
    }
}

async fn start_active_sender_client_loop(
    mut shutdown_rx: broadcast::Receiver<()>,
    config: ActiveSenderConfig,
    endpoint: Endpoint,
    mut snapshot_rx: mpsc::Receiver<Snapshot>,
) {
    let client = reqwest::Client::new();
    let cooldown = max(config.get_cooldown(), Duration::from_secs(1));
    // Cooldown applies per target so one chatty BMC does not starve the others
    let mut last_sent: HashMap<String, Instant> = HashMap::new();

    loop {
        tokio::select! {
            received = snapshot_rx.recv() => {
                let Some(snapshot) = received else {
                    tracing::trace!("Shutting down active sender loop for {}", endpoint.url);
                    break;
                };
                if last_sent
                    .get(&snapshot.target)
                    .is_some_and(|sent| sent.elapsed() <= cooldown)
                {
                    tracing::trace!("Skipping {} because of cooldown: {}", snapshot.target, endpoint.url);
                    continue;
                }
                send_data(
                    &client,
                    &snapshot,
                    &endpoint,
                    &REQUEST_TIMEOUT,
                    &config.get_ignore_connection_errors(),
                )
                .await;
                last_sent.insert(snapshot.target, Instant::now());
            }
            _ = shutdown_rx.recv() => {
                tracing::trace!("Shutting down active sender loop for {}", endpoint.url);
                break;
            }
        }
    }
}

/// Copies every broadcast snapshot to each endpoint queue
async fn start_snapshot_distributor_loop(
    mut shutdown_rx: broadcast::Receiver<()>,
    mut snapshot_rx: broadcast::Receiver<Snapshot>,
    endpoint_txs: Vec<mpsc::Sender<Snapshot>>,
) {
    loop {
        tokio::select! {
            received = snapshot_rx.recv() => {
                let snapshot = match received {
                    Ok(snapshot) => snapshot,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Active sender skipped {} snapshots", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                for endpoint_tx in &endpoint_txs {
                    if endpoint_tx.try_send(snapshot.clone()).is_err() {
                        tracing::warn!("Endpoint queue is full, dropping snapshot of {}", snapshot.target);
                    }
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
    tracing::trace!("Shutting down snapshot distributor");
}

pub async fn start_active_sender_loop(
    shutdown_rx: broadcast::Receiver<()>,
    config: ActiveSenderConfig,
    snapshot_rx: broadcast::Receiver<Snapshot>,
) {
    if !config.is_enabled() {
        tracing::trace!("Module is disabled");
        return;
    }

    // Spawn task for each endpoint
    tracing::trace!("Starting active sender loop");
    let mut endpoints = tokio_stream::iter(config.get_endpoints());

    // Make sure all tasks are spawned
    let mut tasks = Vec::new();
    let mut endpoint_txs = Vec::new();

    while let Some(endpoint) = endpoints.next().await {
        let shutdown_rx_clone = shutdown_rx.resubscribe();
        let (endpoint_tx, endpoint_rx) = mpsc::channel::<Snapshot>(QUEUE_CAPACITY);
        endpoint_txs.push(endpoint_tx);
        let config = config.clone();
        let task = tokio::spawn(async move {
            start_active_sender_client_loop(shutdown_rx_clone, config, endpoint, endpoint_rx).await
        });
        tasks.push(task);
    }

    // Endpoint loops stop once the distributor drops their senders
    let distributor_task = tokio::spawn(start_snapshot_distributor_loop(
        shutdown_rx,
        snapshot_rx,
        endpoint_txs,
    ));
    tasks.push(distributor_task);

    for task in tasks {
        if let Err(error) = task.await {
            tracing::error!("Active sender task failed: {}", error);
        }
    }
}
