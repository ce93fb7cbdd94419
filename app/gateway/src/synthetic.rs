//! Synthetic runners for exercising a run without real devices.

use crate::{
    Error, Result,
    config::TestRunnerConfig,
    hub::BroadcastHub,
    ingest,
    session::{RunnerRecord, SessionRegistry},
};
use chrono::Utc;
use compact_str::format_compact;
use protocol::{Position, ServerMessage, http::CreatedRunner};
use rand::Rng;
use std::sync::Arc;

/// Result of a bulk creation.
#[derive(Debug, Clone)]
pub struct CreatedRunners {
    /// Runners that were added.
    pub runners: Vec<CreatedRunner>,
    /// Runners in the run afterwards.
    pub total_runners: usize,
}

/// Seeds existing runs with randomly placed test runners.
pub struct TestRunnerFactory {
    registry: Arc<SessionRegistry>,
    hub: Arc<BroadcastHub>,
    config: TestRunnerConfig,
}

impl TestRunnerFactory {
    /// Create a factory.
    pub fn new(
        registry: Arc<SessionRegistry>,
        hub: Arc<BroadcastHub>,
        config: TestRunnerConfig,
    ) -> Self {
        Self {
            registry,
            hub,
            config,
        }
    }

    /// Add up to `count` test runners to `run_id`, announcing each with
    /// `runner-joined` and `runner-updated` to every member.
    ///
    /// `count` defaults to the configured count and is capped by the
    /// number of configured names. Fails when the run does not exist.
    pub fn create(&self, run_id: &str, count: Option<usize>) -> Result<CreatedRunners> {
        let count = count
            .unwrap_or(self.config.count)
            .min(self.config.names.len());
        let stamp = Utc::now().timestamp_millis();
        let mut rng = rand::rng();

        let created = self
            .registry
            .with_session(run_id, |session| {
                let mut runners = Vec::with_capacity(count);
                for (i, name) in self.config.names.iter().take(count).enumerate() {
                    let mut n = i;
                    let id = loop {
                        let id = format_compact!("test-runner-{stamp}-{n}");
                        if !session.contains(&id) {
                            break id;
                        }
                        n += self.config.names.len();
                    };

                    let position = Position::new(
                        self.config.base_latitude + rng.random::<f64>() * self.config.spread,
                        self.config.base_longitude + rng.random::<f64>() * self.config.spread,
                    );
                    let speed = 3.0 + rng.random::<f64>() * 2.0;
                    let record = RunnerRecord::synthetic(id.clone(), name.clone(), position, speed);
                    let announce = ingest::updated(&record, position);
                    session.insert(record);

                    self.hub.emit_to_session(
                        run_id,
                        &ServerMessage::RunnerJoined {
                            runner_id: id.clone(),
                            runner_name: name.clone(),
                            total_runners: session.len(),
                        },
                        None,
                    );
                    self.hub.emit_to_session(run_id, &announce, None);
                    runners.push(CreatedRunner {
                        runner_id: id,
                        runner_name: name.clone(),
                    });
                }
                CreatedRunners {
                    runners,
                    total_runners: session.len(),
                }
            })
            .ok_or_else(|| Error::UnknownRun(run_id.into()))?;

        tracing::info!(
            run = run_id,
            created = created.runners.len(),
            "created test runners"
        );
        Ok(created)
    }
}
