// Licensed under the Open Software License version 3.0
use tokio::sync::broadcast::Sender;

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(error) => {
            tracing::warn!("Cannot listen for SIGTERM: {}", error);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Broadcasts one message to every loop on Ctrl-C or SIGTERM
pub async fn start_shutdown_notifier(tx: Sender<()>) {
    tracing::trace!("Starting shutdown notifier");
    wait_for_signal().await;
    tracing::info!("Received shutdown signal");
    tracing::trace!("Sending message to {} receivers", tx.receiver_count());
    let _ = tx.send(());
}
