//! Position ingestion.
//!
//! Updates are applied and broadcast while the session lock is held, so
//! every receiver observes one runner's updates in the order they were
//! applied.

use crate::{
    Error, Result,
    hub::BroadcastHub,
    session::{RunnerRecord, SessionRegistry},
};
use protocol::{Position, ServerMessage};
use std::sync::Arc;

/// Applies position updates to runner records.
pub struct PositionIngester {
    registry: Arc<SessionRegistry>,
    hub: Arc<BroadcastHub>,
}

impl PositionIngester {
    /// Create an ingester over a registry and hub.
    pub fn new(registry: Arc<SessionRegistry>, hub: Arc<BroadcastHub>) -> Self {
        Self { registry, hub }
    }

    /// Apply a live runner's own update and broadcast it to the other
    /// members of the run.
    ///
    /// Returns `Ok(false)` when the run or the runner is unknown; such
    /// updates are dropped without any broadcast.
    pub fn update_position(
        &self,
        connection: &str,
        run_id: &str,
        latitude: f64,
        longitude: f64,
        speed: Option<f64>,
    ) -> Result<bool> {
        let position = Position::new(latitude, longitude);
        let speed = validate(position, speed)?;

        let applied = self
            .registry
            .with_session(run_id, |session| {
                let runner = session.get_mut(connection)?;
                runner.apply(position, speed);
                self.hub
                    .emit_to_session(run_id, &updated(runner, position), Some(connection));
                Some(())
            })
            .flatten()
            .is_some();

        if !applied {
            tracing::debug!(connection, run = run_id, "dropped update for unknown runner");
        }
        Ok(applied)
    }

    /// Apply an update for a synthetic runner, creating it when absent, and
    /// broadcast it to every member of the run.
    ///
    /// Returns `Ok(false)` when the run is unknown or `runner_id` belongs
    /// to a live connection.
    pub fn update_test_runner(
        &self,
        run_id: &str,
        runner_id: &str,
        name: &str,
        position: Position,
        speed: Option<f64>,
    ) -> Result<bool> {
        let speed = validate(position, speed)?;

        let applied = self
            .registry
            .with_session(run_id, |session| {
                match session.get_mut(runner_id) {
                    Some(runner) if !runner.is_test => return false,
                    Some(runner) => {
                        runner.name = name.into();
                        runner.apply(position, speed);
                    }
                    None => {
                        session.insert(RunnerRecord::synthetic(runner_id, name, position, speed));
                    }
                }
                let Some(runner) = session.get(runner_id) else {
                    return false;
                };
                self.hub
                    .emit_to_session(run_id, &updated(runner, position), None);
                true
            })
            .unwrap_or(false);

        if applied {
            tracing::debug!(run = run_id, runner = name, "test runner updated");
        }
        Ok(applied)
    }
}

/// Check coordinates and speed, defaulting an absent speed to zero.
fn validate(position: Position, speed: Option<f64>) -> Result<f64> {
    if !position.is_valid() {
        return Err(Error::InvalidPosition {
            latitude: position.latitude,
            longitude: position.longitude,
        });
    }
    let speed = speed.unwrap_or(0.0);
    if !speed.is_finite() || speed < 0.0 {
        return Err(Error::InvalidSpeed(speed));
    }
    Ok(speed)
}

/// Build the `runner-updated` event for a freshly applied record.
pub(crate) fn updated(runner: &RunnerRecord, position: Position) -> ServerMessage {
    ServerMessage::RunnerUpdated {
        runner_id: runner.id.clone(),
        runner_name: runner.name.clone(),
        position,
        speed: runner.speed,
        timestamp: runner.last_update,
    }
}
