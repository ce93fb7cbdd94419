//! The gateway: shared engine state, event dispatch, and the axum surface.

use crate::{
    GatewayConfig,
    gap::{self, GapReport},
    hub::BroadcastHub,
    ingest::PositionIngester,
    lifecycle::ConnectionLifecycle,
    session::{ConnectionId, SessionRegistry},
    synthetic::TestRunnerFactory,
};
use axum::{
    Router,
    routing::{get, post},
};
use protocol::{ClientMessage, ServerMessage};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

pub mod http;
pub mod serve;
pub mod sweep;
pub mod ws;

/// Shared state available to every connection and request handler.
#[derive(Clone)]
pub struct Gateway {
    /// Active sessions.
    pub registry: Arc<SessionRegistry>,
    /// Outbound event fan-out.
    pub hub: Arc<BroadcastHub>,
    /// Connection → run bindings.
    pub lifecycle: Arc<ConnectionLifecycle>,
    /// Position updates.
    pub ingester: Arc<PositionIngester>,
    /// Synthetic runner creation.
    pub test_runners: Arc<TestRunnerFactory>,
}

impl Gateway {
    /// Wire up a fresh engine from configuration.
    pub fn new(config: &GatewayConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let hub = Arc::new(BroadcastHub::new());
        Self {
            lifecycle: Arc::new(ConnectionLifecycle::new(
                Arc::clone(&registry),
                Arc::clone(&hub),
            )),
            ingester: Arc::new(PositionIngester::new(
                Arc::clone(&registry),
                Arc::clone(&hub),
            )),
            test_runners: Arc::new(TestRunnerFactory::new(
                Arc::clone(&registry),
                Arc::clone(&hub),
                config.test_runners.clone(),
            )),
            registry,
            hub,
        }
    }

    /// Register a new connection, returning its id and outbound receiver.
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = ConnectionId::from(ulid::Ulid::new().to_string());
        let (tx, rx) = mpsc::unbounded_channel();
        self.hub.register(id.clone(), tx);
        tracing::debug!(connection = %id, "client connected");
        (id, rx)
    }

    /// Tear down a connection after the transport closed.
    pub fn disconnect(&self, connection: &str) {
        self.lifecycle.disconnect(connection);
        self.hub.unregister(connection);
        tracing::debug!(connection, "client disconnected");
    }

    /// Handle one inbound event from `connection`.
    pub fn dispatch(&self, connection: &str, msg: ClientMessage) {
        match msg {
            ClientMessage::JoinRun {
                run_id,
                runner_name,
            } => {
                self.lifecycle.join(connection, &run_id, &runner_name);
            }

            ClientMessage::UpdatePosition {
                latitude,
                longitude,
                speed,
            } => {
                let Some(run_id) = self.lifecycle.bound_run(connection) else {
                    return;
                };
                if let Err(e) = self.ingester.update_position(
                    connection, &run_id, latitude, longitude, speed,
                ) {
                    self.reject(connection, e);
                }
            }

            ClientMessage::TestRunnerUpdate {
                runner_id,
                runner_name,
                position,
                speed,
            } => {
                let Some(run_id) = self.lifecycle.bound_run(connection) else {
                    return;
                };
                if let Err(e) = self.ingester.update_test_runner(
                    &run_id,
                    &runner_id,
                    &runner_name,
                    position,
                    speed,
                ) {
                    self.reject(connection, e);
                }
            }

            ClientMessage::RequestGaps => {
                let Some(run_id) = self.lifecycle.bound_run(connection) else {
                    return;
                };
                let Some(report) = self.gaps(&run_id) else {
                    return;
                };
                if let Some(largest) = &report.largest_gap {
                    tracing::debug!(run = %run_id, largest = largest.distance_meters, "computed gaps");
                }
                self.hub.emit_to_connection(
                    connection,
                    ServerMessage::GapsInfo {
                        gaps: report.gaps,
                        largest_gap: report.largest_gap,
                        timestamp: chrono::Utc::now(),
                    },
                );
            }

            ClientMessage::CreateTestRunners { count, run_id } => {
                if let Err(e) = self.test_runners.create(&run_id, count) {
                    tracing::debug!(connection, "ignored create-test-runners: {e}");
                }
            }

            ClientMessage::LeaveRun { run_id } => {
                self.lifecycle.leave(connection, &run_id);
            }

            ClientMessage::Ping => {
                self.hub.emit_to_connection(connection, ServerMessage::Pong);
            }
        }
    }

    /// Compute the gaps of a run from a snapshot taken under its lock.
    pub fn gaps(&self, run_id: &str) -> Option<GapReport> {
        let runners = self
            .registry
            .with_session(run_id, |session| session.runners().cloned().collect::<Vec<_>>())?;
        Some(gap::compute_gaps(&runners))
    }

    /// Evict idle runners and announce their departure. Returns how many
    /// runners were evicted.
    pub fn sweep_stale(&self, max_idle: Duration) -> usize {
        let evicted = self.registry.evict_stale(max_idle, |eviction| {
            let runner = &eviction.runner;
            self.hub.emit_to_session(
                &eviction.run_id,
                &ServerMessage::RunnerLeft {
                    runner_id: runner.id.clone(),
                    runner_name: runner.name.clone(),
                    total_runners: eviction.remaining,
                },
                None,
            );
            if !runner.is_test {
                self.lifecycle.forget(&runner.id, &eviction.run_id);
            }
        });
        for eviction in &evicted {
            tracing::info!(run = %eviction.run_id, runner = %eviction.runner.name, "evicted stale runner");
        }
        evicted.len()
    }

    fn reject(&self, connection: &str, error: crate::Error) {
        tracing::debug!(connection, "rejected event: {error}");
        self.hub.emit_to_connection(
            connection,
            ServerMessage::Error {
                code: error.code(),
                message: error.to_string(),
            },
        );
    }
}

/// Build the axum router: `/ws`, `GET /runs`, `POST /test-runners/{run_id}`.
pub fn router(state: Gateway) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/runs", get(http::list_runs))
        .route("/test-runners/{run_id}", post(http::create_test_runners))
        .with_state(state)
}
