// Licensed under the Open Software License version 3.0
use super::config::PassiveEndpointConfig;
use crate::hardware::types::Snapshot;
use rocket::{get, http::Status, routes, serde::json::Json, Build, Rocket, State};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    RwLock,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
struct ApiResponse<T> {
    success: bool,
    error: Option<String>,
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn new(data: Option<T>) -> Self {
        // If data is None, error is "not found"
        let error = match data.is_none() {
            true => Some(String::from("not found")),
            false => None,
        };
        Self {
            success: error.is_none(),
            error,
            data,
        }
    }
}

/// Latest snapshot of every target
#[derive(Debug, Clone, Default)]
struct CachedData {
    snapshots_by_target: Arc<RwLock<HashMap<String, Snapshot>>>,
}

impl CachedData {
    pub async fn get_snapshots(&self) -> Vec<Snapshot> {
        let mut snapshots: Vec<Snapshot> = self
            .snapshots_by_target
            .read()
            .await
            .values()
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| a.target.cmp(&b.target));
        snapshots
    }

    pub async fn get_snapshot_by_target(&self, target: String) -> Option<Snapshot> {
        self.snapshots_by_target.read().await.get(&target).cloned()
    }

    pub async fn set_snapshot(&self, snapshot: Snapshot) {
        self.snapshots_by_target
            .write()
            .await
            .insert(snapshot.target.clone(), snapshot);
    }
}

async fn start_cache_updater_loop(
    mut shutdown_rx: broadcast::Receiver<()>,
    cache: Arc<CachedData>,
    mut snapshot_rx: broadcast::Receiver<Snapshot>,
) {
    loop {
        tokio::select! {
            received = snapshot_rx.recv() => match received {
                Ok(snapshot) => {
                    tracing::trace!("Caching snapshot of {}", snapshot.target);
                    cache.set_snapshot(snapshot).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Cache updater skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = shutdown_rx.recv() => {
                tracing::trace!("Shutting down cache updater loop");
                break;
            }
        }
    }
}

#[get("/snapshots")]
async fn get_snapshots_route(cache: &State<Arc<CachedData>>) -> Json<ApiResponse<Vec<Snapshot>>> {
    Json(ApiResponse::new(Some(cache.get_snapshots().await)))
}

#[get("/snapshots/<target>")]
async fn get_snapshot_by_target_route(
    cache: &State<Arc<CachedData>>,
    target: String,
) -> (Status, Json<ApiResponse<Snapshot>>) {
    let data = cache.get_snapshot_by_target(target).await;
    let data = ApiResponse::new(data);
    if !data.success {
        return (Status::NotFound, Json(data));
    }
    (Status::Ok, Json(data))
}

fn rocket(cache: Arc<CachedData>) -> Rocket<Build> {
    rocket::build().manage(cache).mount(
        "/",
        routes![get_snapshots_route, get_snapshot_by_target_route],
    )
}

pub async fn start_passive_endpoint_loop(
    shutdown_rx: broadcast::Receiver<()>,
    config: PassiveEndpointConfig,
    snapshot_rx: broadcast::Receiver<Snapshot>,
) {
    if !config.is_enabled() {
        tracing::trace!("Module is disabled");
        return;
    }

    let cache = Arc::new(CachedData::default());

    // Simple API that returns cached data as JSON
    tracing::trace!("Starting passive endpoint loop");
    let mut shutdown_rx_clone = shutdown_rx.resubscribe();
    let cache_arc_clone: Arc<CachedData> = cache.clone();
    let rocket_handle = tokio::spawn(async move {
        let prepared_rocket = rocket(cache_arc_clone)
            .configure(rocket::Config {
                port: config.get_port(),
                shutdown: rocket::config::Shutdown {
                    ctrlc: false,
                    ..Default::default()
                },
                ..Default::default()
            })
            .launch();

        tokio::select! {
            result = prepared_rocket => {
                if let Err(error) = result {
                    tracing::error!("Passive endpoint failed: {}", error);
                }
            },
            _ = shutdown_rx_clone.recv() => {
                tracing::trace!("Aborting rocket");
            }
        }
    });

    let cache_updater_handle = tokio::spawn(async move {
        start_cache_updater_loop(shutdown_rx, cache, snapshot_rx).await;
    });

    let _ = tokio::try_join!(rocket_handle, cache_updater_handle);
}
