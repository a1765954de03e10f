// Licensed under the Open Software License version 3.0
use active_sender::receiver::start_active_sender_loop;
use clap::Parser;
use cli::Args;
use collector::Collector;
use config::{
    error::ConfigError,
    file::{create_example_config_if_not_exists, load},
    types::{Config, Transport},
};
use hardware::types::Snapshot;
use passive_endpoint::receiver::start_passive_endpoint_loop;
use poll::{collect_once, start_poll_loop, PollError, PollSettings};
use shutdown_notifier::start_shutdown_notifier;
use source::{build_source, SensorSource};
use std::process::ExitCode;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
mod active_sender;
mod cli;
mod collector;
mod config;
mod hardware;
mod parser;
mod passive_endpoint;
mod poll;
mod render;
mod shutdown_notifier;
mod source;

const EXIT_COLLECTION_FAILED: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_AUTH_REJECTED: u8 = 3;

/// Everything one poll task owns
struct PreparedTarget {
    collector: Collector,
    source: Box<dyn SensorSource>,
    params: config::connection::ConnectionParams,
}

fn prepare_targets(
    config: &Config,
    transport_override: Option<Transport>,
) -> Result<Vec<PreparedTarget>, source::SourceError> {
    config
        .targets()
        .map(|target| {
            let transport = transport_override.unwrap_or(target.get_transport());
            tracing::debug!(
                "Target {} ({}) uses {:?}",
                target.label,
                target.connection.host(),
                transport
            );
            Ok(PreparedTarget {
                collector: Collector::new(target.connection.host()),
                source: build_source(transport, config)?,
                params: target.connection.clone(),
            })
        })
        .collect()
}

fn print_snapshot(snapshot: &Snapshot, json: bool) {
    if json {
        match render::to_json(snapshot) {
            Ok(line) => println!("{}", line),
            Err(error) => tracing::error!("Cannot serialize snapshot: {}", error),
        }
    } else {
        print!("{}", render::to_table(snapshot));
    }
}

async fn run_once(targets: Vec<PreparedTarget>, settings: PollSettings, json: bool) -> ExitCode {
    let mut tasks = Vec::new();
    for target in targets {
        tasks.push(tokio::spawn(async move {
            collect_once(
                &target.collector,
                target.source.as_ref(),
                &target.params,
                settings.timeout,
            )
            .await
        }));
    }

    let mut exit_code = ExitCode::SUCCESS;
    let mut auth_rejected = false;
    for task in tasks {
        let snapshot = match task.await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::error!("Collection task failed: {}", error);
                exit_code = ExitCode::from(EXIT_COLLECTION_FAILED);
                continue;
            }
        };
        print_snapshot(&snapshot, json);
        if let Some(error) = &snapshot.error {
            tracing::warn!("Collection from {} failed: {}", snapshot.target, error);
            auth_rejected |= error.is_auth_failure();
            exit_code = ExitCode::from(EXIT_COLLECTION_FAILED);
        }
    }
    if auth_rejected {
        return ExitCode::from(EXIT_AUTH_REJECTED);
    }
    exit_code
}

async fn run_polling(
    targets: Vec<PreparedTarget>,
    config: Config,
    settings: PollSettings,
    json: bool,
) -> ExitCode {
    // Prepare channels for async tasks
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    const BROADCAST_CAPACITY: usize = 16;
    let (snapshot_tx, snapshot_rx) = broadcast::channel::<Snapshot>(BROADCAST_CAPACITY);

    let Config {
        active_data_sender,
        passive_data_endpoint,
        ..
    } = config;

    let shutdown_tx_clone = shutdown_tx.clone();
    let shutdown_notifier_handle = tokio::spawn(async move {
        start_shutdown_notifier(shutdown_tx_clone).await;
    });

    // Channel receivers
    // Periodically send snapshots to HTTP endpoints
    let shutdown_rx_clone = shutdown_rx.resubscribe();
    let snapshot_rx_clone = snapshot_rx.resubscribe();
    let active_sender_handle = tokio::spawn(async move {
        start_active_sender_loop(shutdown_rx_clone, active_data_sender, snapshot_rx_clone)
            .await;
    });

    // Passive endpoint that returns cached snapshots on request
    // Don't clone the receiver as this is the last receiving module
    let shutdown_rx_clone = shutdown_rx.resubscribe();
    let passive_endpoint_handle = tokio::spawn(async move {
        start_passive_endpoint_loop(shutdown_rx_clone, passive_data_endpoint, snapshot_rx)
            .await;
    });

    // Channel senders
    // One poll loop per target
    let mut poll_handles = Vec::new();
    let mut targets = tokio_stream::iter(targets);
    while let Some(target) = targets.next().await {
        let shutdown_rx_clone = shutdown_rx.resubscribe();
        let snapshot_tx = snapshot_tx.clone();
        poll_handles.push(tokio::spawn(async move {
            start_poll_loop(
                shutdown_rx_clone,
                target.collector,
                target.source,
                target.params,
                settings,
                move |snapshot| {
                    print_snapshot(&snapshot, json);
                    if snapshot_tx.receiver_count() > 0 {
                        let _ = snapshot_tx.send(snapshot);
                    }
                },
            )
            .await
        }));
    }
    drop(snapshot_tx);

    let mut exit_code = ExitCode::SUCCESS;
    for handle in poll_handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(PollError::AuthRejected { target })) => {
                tracing::error!("Stopped polling {}: credentials rejected", target);
                exit_code = ExitCode::from(EXIT_AUTH_REJECTED);
            }
            Err(error) => tracing::error!("Poll task failed: {}", error),
        }
    }

    // Every poll loop is gone, stop the exporters too
    let _ = shutdown_tx.send(());
    shutdown_notifier_handle.abort();
    let _ = tokio::join!(active_sender_handle, passive_endpoint_handle);

    tracing::debug!("Successfully shut down");
    exit_code
}

fn report_config_error(error: &ConfigError, args: &Args) {
    tracing::error!("Invalid configuration: {}", error);
    if matches!(error, ConfigError::NotFound { .. }) {
        tracing::info!(
            "Run with --init to create an example config at {}",
            args.config.display()
        );
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logger, stdout is reserved for snapshots
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(
                    "bmc_telemetry=info"
                        .parse()
                        .unwrap_or_else(|_| LevelFilter::INFO.into()),
                )
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    if args.init {
        if create_example_config_if_not_exists(&args.config) {
            tracing::info!("Created example config at {}", args.config.display());
            return ExitCode::SUCCESS;
        }
        tracing::error!("Did not write {}", args.config.display());
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    // Read config file
    let config = match load(&args.config) {
        Ok(config) => config,
        Err(error) => {
            report_config_error(&error, &args);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let targets = match prepare_targets(&config, args.transport) {
        Ok(targets) => targets,
        Err(error) => {
            tracing::error!("Cannot prepare sensor source: {}", error);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let settings = PollSettings::from_config(&config.poll, args.interval);

    if args.once {
        return run_once(targets, settings, args.json).await;
    }
    tracing::info!(
        "Polling {} target(s) every {:?}",
        targets.len(),
        settings.interval
    );
    run_polling(targets, config, settings, args.json).await
}
