//! Run sessions and the registry that owns them.
//!
//! A [`Session`] holds the runners of one run, keyed and ordered by runner
//! id. The [`SessionRegistry`] maps run ids to sessions, each behind its own
//! mutex so that distinct runs never contend. Locks are always taken
//! registry first, then session; no code path holds a session lock while
//! acquiring the registry lock.

use chrono::{DateTime, TimeDelta, Utc};
use compact_str::CompactString;
use parking_lot::Mutex;
use protocol::{
    Position, RunnerSnapshot,
    http::{RunSummary, RunnerSummary},
};
use std::{collections::BTreeMap, sync::Arc, time::Duration};

/// Caller-supplied run identifier.
pub type RunId = CompactString;
/// Runner identifier, unique within a session.
pub type RunnerId = CompactString;
/// Gateway-assigned connection identifier. Live runners use it as their id.
pub type ConnectionId = RunnerId;

/// Shared handle to a session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// One participant in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerRecord {
    /// Connection id or synthetic id.
    pub id: RunnerId,
    /// Display name.
    pub name: CompactString,
    /// Last known position, absent until the first update.
    pub position: Option<Position>,
    /// Speed in meters per second.
    pub speed: f64,
    /// When the runner joined.
    pub joined_at: DateTime<Utc>,
    /// When the runner last changed.
    pub last_update: DateTime<Utc>,
    /// Whether the runner was generated for testing.
    pub is_test: bool,
}

impl RunnerRecord {
    /// A runner backed by a live connection, not yet positioned.
    pub fn live(id: impl Into<RunnerId>, name: impl Into<CompactString>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            position: None,
            speed: 0.0,
            joined_at: now,
            last_update: now,
            is_test: false,
        }
    }

    /// A synthetic runner with an initial position.
    pub fn synthetic(
        id: impl Into<RunnerId>,
        name: impl Into<CompactString>,
        position: Position,
        speed: f64,
    ) -> Self {
        Self {
            position: Some(position),
            speed,
            is_test: true,
            ..Self::live(id, name)
        }
    }

    /// Apply a position and speed, stamping `last_update`.
    pub fn apply(&mut self, position: Position, speed: f64) {
        self.position = Some(position);
        self.speed = speed;
        self.last_update = Utc::now();
    }

    /// Wire view of this runner.
    pub fn snapshot(&self) -> RunnerSnapshot {
        RunnerSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            position: self.position,
            speed: self.speed,
            joined_at: self.joined_at,
            last_update: self.last_update,
            is_test: self.is_test,
        }
    }
}

/// The runners of one run.
#[derive(Debug)]
pub struct Session {
    id: RunId,
    created_at: DateTime<Utc>,
    runners: BTreeMap<RunnerId, RunnerRecord>,
    /// Set once the registry drops this session. A closed session must not
    /// gain runners.
    closed: bool,
}

impl Session {
    fn new(id: RunId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            runners: BTreeMap::new(),
            closed: false,
        }
    }

    /// Run identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Runners in ascending runner id order.
    pub fn runners(&self) -> impl Iterator<Item = &RunnerRecord> {
        self.runners.values()
    }

    /// Look up a runner.
    pub fn get(&self, id: &str) -> Option<&RunnerRecord> {
        self.runners.get(id)
    }

    /// Look up a runner for mutation.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut RunnerRecord> {
        self.runners.get_mut(id)
    }

    /// Whether a runner with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.runners.contains_key(id)
    }

    /// Insert or replace a runner, returning the replaced record.
    pub fn insert(&mut self, record: RunnerRecord) -> Option<RunnerRecord> {
        self.runners.insert(record.id.clone(), record)
    }

    /// Remove a runner.
    pub fn remove(&mut self, id: &str) -> Option<RunnerRecord> {
        self.runners.remove(id)
    }

    /// Number of runners.
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    /// Whether the session has no runners.
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Wire view of every runner.
    pub fn snapshot(&self) -> Vec<RunnerSnapshot> {
        self.runners.values().map(RunnerRecord::snapshot).collect()
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.id.clone(),
            runner_count: self.runners.len(),
            started_at: self.created_at,
            runners: self
                .runners
                .values()
                .map(|r| RunnerSummary {
                    id: r.id.clone(),
                    name: r.name.clone(),
                    is_test: r.is_test,
                })
                .collect(),
        }
    }
}

/// A runner removed by [`SessionRegistry::evict_stale`].
#[derive(Debug, Clone)]
pub struct Eviction {
    /// Run the runner was removed from.
    pub run_id: RunId,
    /// The removed runner.
    pub runner: RunnerRecord,
    /// Runners left in the run afterwards.
    pub remaining: usize,
}

/// Owns every active session. Created at startup and injected into the
/// components that need it.
pub struct SessionRegistry {
    sessions: Mutex<BTreeMap<RunId, SessionHandle>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Return the session for `run_id`, creating it if absent.
    pub fn get_or_create(&self, run_id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock();
        if let Some(handle) = sessions.get(run_id) {
            return Arc::clone(handle);
        }
        tracing::info!(run = run_id, "session created");
        let handle = Arc::new(Mutex::new(Session::new(run_id.into())));
        sessions.insert(run_id.into(), Arc::clone(&handle));
        handle
    }

    /// Look up a session without creating it.
    pub fn get(&self, run_id: &str) -> Option<SessionHandle> {
        self.sessions.lock().get(run_id).cloned()
    }

    /// Whether a session exists for `run_id`.
    pub fn contains(&self, run_id: &str) -> bool {
        self.sessions.lock().contains_key(run_id)
    }

    /// Run `f` on the session for `run_id`, creating it if needed.
    ///
    /// Retries when the session was closed between lookup and lock, so `f`
    /// always sees a session that is still registered.
    pub fn join_with<R>(&self, run_id: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        loop {
            let handle = self.get_or_create(run_id);
            let mut session = handle.lock();
            if session.closed {
                continue;
            }
            return f(&mut session);
        }
    }

    /// Run `f` on the session for `run_id` if it exists.
    pub fn with_session<R>(&self, run_id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let handle = self.get(run_id)?;
        let mut session = handle.lock();
        if session.closed {
            return None;
        }
        Some(f(&mut session))
    }

    /// Remove the session if it has no runners. Returns whether it was
    /// removed.
    pub fn remove_if_empty(&self, run_id: &str) -> bool {
        let mut sessions = self.sessions.lock();
        let Some(handle) = sessions.get(run_id) else {
            return false;
        };
        {
            let mut session = handle.lock();
            if !session.is_empty() {
                return false;
            }
            session.closed = true;
        }
        sessions.remove(run_id);
        tracing::info!(run = run_id, "session ended, no runners left");
        true
    }

    /// Summaries of every active session, ordered by run id.
    pub fn list(&self) -> Vec<RunSummary> {
        self.sessions
            .lock()
            .values()
            .map(|handle| handle.lock().summary())
            .collect()
    }

    /// Remove runners idle for longer than `max_idle`, dropping sessions
    /// this empties.
    ///
    /// `on_evict` runs for each eviction while the registry and session
    /// locks are held, so nothing can rejoin the run before it returns.
    pub fn evict_stale(
        &self,
        max_idle: Duration,
        mut on_evict: impl FnMut(&Eviction),
    ) -> Vec<Eviction> {
        let max_idle = TimeDelta::from_std(max_idle).unwrap_or(TimeDelta::MAX);
        let now = Utc::now();
        let mut evicted = Vec::new();
        let mut sessions = self.sessions.lock();
        sessions.retain(|run_id, handle| {
            let mut session = handle.lock();
            let stale: Vec<RunnerId> = session
                .runners
                .values()
                .filter(|r| now.signed_duration_since(r.last_update) > max_idle)
                .map(|r| r.id.clone())
                .collect();
            for id in stale {
                if let Some(runner) = session.runners.remove(&id) {
                    let eviction = Eviction {
                        run_id: run_id.clone(),
                        runner,
                        remaining: session.len(),
                    };
                    on_evict(&eviction);
                    evicted.push(eviction);
                }
            }
            if session.is_empty() {
                session.closed = true;
                tracing::info!(run = %run_id, "session ended, all runners stale");
                return false;
            }
            true
        });
        evicted
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether there are no active sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
