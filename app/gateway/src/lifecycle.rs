//! Connection lifecycle: binding connections to runs on join, and cleanup on
//! leave or disconnect.

use crate::{
    hub::BroadcastHub,
    session::{ConnectionId, RunId, RunnerRecord, SessionRegistry},
};
use parking_lot::Mutex;
use protocol::{RunnerSnapshot, ServerMessage};
use std::{collections::HashMap, sync::Arc};

/// Owns the connection → run association table.
pub struct ConnectionLifecycle {
    registry: Arc<SessionRegistry>,
    hub: Arc<BroadcastHub>,
    bindings: Mutex<HashMap<ConnectionId, RunId>>,
}

impl ConnectionLifecycle {
    /// Create a lifecycle manager over a registry and hub.
    pub fn new(registry: Arc<SessionRegistry>, hub: Arc<BroadcastHub>) -> Self {
        Self {
            registry,
            hub,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    /// The run a connection is bound to.
    pub fn bound_run(&self, connection: &str) -> Option<RunId> {
        self.bindings.lock().get(connection).cloned()
    }

    /// Join `connection` to `run_id` as `runner_name`.
    ///
    /// Sends `run-info` to the joiner and `runner-joined` to everyone else,
    /// and returns the runner list sent to the joiner. Rejoining the same
    /// run replaces the existing record; joining another run leaves the
    /// previous one first.
    pub fn join(&self, connection: &str, run_id: &str, runner_name: &str) -> Vec<RunnerSnapshot> {
        if let Some(previous) = self.bound_run(connection)
            && previous.as_str() != run_id
        {
            self.leave(connection, &previous);
        }

        // Bind under the session lock; eviction forgets under the same lock.
        let runners = self.registry.join_with(run_id, |session| {
            self.bindings.lock().insert(connection.into(), run_id.into());
            session.insert(RunnerRecord::live(connection, runner_name));
            self.hub.subscribe(connection, run_id);

            let total_runners = session.len();
            self.hub.emit_to_session(
                run_id,
                &ServerMessage::RunnerJoined {
                    runner_id: connection.into(),
                    runner_name: runner_name.into(),
                    total_runners,
                },
                Some(connection),
            );

            let runners = session.snapshot();
            self.hub.emit_to_connection(
                connection,
                ServerMessage::RunInfo {
                    run_id: run_id.into(),
                    runners: runners.clone(),
                    total_runners,
                },
            );
            runners
        });

        tracing::info!(connection, run = run_id, runner = runner_name, "runner joined");
        runners
    }

    /// Remove `connection` from `run_id`.
    ///
    /// Emits `runner-left` to the remaining members and drops the session
    /// once it is empty. Unknown connections and runners are ignored.
    pub fn leave(&self, connection: &str, run_id: &str) -> Option<RunnerRecord> {
        {
            let mut bindings = self.bindings.lock();
            if bindings.get(connection).is_some_and(|bound| bound.as_str() == run_id) {
                bindings.remove(connection);
            }
        }
        self.hub.unsubscribe(connection, run_id);
        self.remove_runner(connection, run_id)
    }

    /// Clean up after a transport-level disconnect.
    pub fn disconnect(&self, connection: &str) -> Option<RunnerRecord> {
        let run_id = self.bindings.lock().remove(connection)?;
        self.hub.unsubscribe(connection, &run_id);
        self.remove_runner(connection, &run_id)
    }

    /// Drop the binding of an evicted runner without touching its session.
    ///
    /// Call with the run's session lock held.
    pub fn forget(&self, connection: &str, run_id: &str) {
        let mut bindings = self.bindings.lock();
        if bindings.get(connection).is_some_and(|bound| bound.as_str() == run_id) {
            bindings.remove(connection);
            self.hub.unsubscribe(connection, run_id);
        }
    }

    fn remove_runner(&self, runner_id: &str, run_id: &str) -> Option<RunnerRecord> {
        let removed = self
            .registry
            .with_session(run_id, |session| {
                let runner = session.remove(runner_id)?;
                self.hub.emit_to_session(
                    run_id,
                    &ServerMessage::RunnerLeft {
                        runner_id: runner.id.clone(),
                        runner_name: runner.name.clone(),
                        total_runners: session.len(),
                    },
                    Some(runner_id),
                );
                Some(runner)
            })
            .flatten();

        if let Some(runner) = &removed {
            tracing::info!(connection = runner_id, run = run_id, runner = %runner.name, "runner left");
        }
        self.registry.remove_if_empty(run_id);
        removed
    }
}
