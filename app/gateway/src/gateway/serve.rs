//! Shared gateway serve entrypoint -- used by the binary and the tests.

use crate::{GatewayConfig, gateway::Gateway};
use anyhow::Result;
use tokio::{sync::broadcast, task::JoinHandle};

/// Handle returned by [`serve`] -- holds the bound port and shutdown trigger.
pub struct ServeHandle {
    /// The port the gateway is listening on.
    pub port: u16,
    /// The engine behind the server.
    pub gateway: Gateway,
    /// Send a value to trigger graceful shutdown.
    shutdown_tx: Option<broadcast::Sender<()>>,
    /// Join handle for the server task.
    join: Option<JoinHandle<Result<(), std::io::Error>>>,
    /// Join handle for the stale sweeper, when enabled.
    sweeper: Option<JoinHandle<()>>,
}

impl ServeHandle {
    /// Trigger graceful shutdown and wait for the server to stop.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.await?;
        }
        if let Some(join) = self.join.take() {
            join.await??;
        }
        Ok(())
    }
}

/// Build the engine, bind the axum server, and start serving.
///
/// Returns a [`ServeHandle`] with the bound port and a shutdown trigger.
/// The server runs in a spawned task -- call `handle.shutdown()` to stop it.
pub async fn serve(config: &GatewayConfig, bind: &str) -> Result<ServeHandle> {
    let gateway = Gateway::new(config);
    let app = super::router(gateway.clone());
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("gateway listening on {bind} (port {port})");

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    let sweeper = config.stale_after().map(|max_idle| {
        super::sweep::start(
            gateway.clone(),
            max_idle,
            config.sweep_interval(),
            shutdown_tx.subscribe(),
        )
    });

    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                tracing::info!("received shutdown signal");
            })
            .await
    });

    Ok(ServeHandle {
        port,
        gateway,
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
        sweeper,
    })
}
