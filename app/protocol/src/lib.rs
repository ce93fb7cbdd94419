//! Pack wire protocol types shared between the gateway and its clients.
//!
//! Every WebSocket text frame carries one JSON object tagged by a `type`
//! field in kebab-case (`join-run`, `runner-updated`, ...). Payload field
//! names are camelCase.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

pub mod http;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

impl Position {
    /// Create a position from latitude and longitude.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Point-in-time view of one runner, as sent in `run-info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerSnapshot {
    /// Connection id, or synthetic id for test runners.
    pub id: CompactString,
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

/// Distance and speed differential between two runners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    /// Name of the first runner of the pair.
    pub runner_a: CompactString,
    /// Name of the second runner of the pair.
    pub runner_b: CompactString,
    /// Great-circle distance, rounded to the nearest meter.
    pub distance_meters: f64,
    /// Absolute speed difference in meters per second.
    pub speed_difference_mps: f64,
}

/// Messages sent by a client to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Join (or create) a run.
    JoinRun {
        /// Run identifier.
        run_id: CompactString,
        /// Display name of the joining runner.
        runner_name: CompactString,
    },
    /// Report the sender's own position.
    UpdatePosition {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
        /// Speed in m/s, zero when absent.
        #[serde(default)]
        speed: Option<f64>,
    },
    /// Report the position of a synthetic runner in the sender's run.
    TestRunnerUpdate {
        /// Synthetic runner id.
        runner_id: CompactString,
        /// Synthetic runner name.
        runner_name: CompactString,
        /// New position.
        position: Position,
        /// Speed in m/s, zero when absent.
        #[serde(default)]
        speed: Option<f64>,
    },
    /// Ask for the current pairwise gaps of the sender's run.
    RequestGaps,
    /// Seed a run with synthetic runners.
    CreateTestRunners {
        /// How many runners to create.
        #[serde(default)]
        count: Option<usize>,
        /// Target run.
        run_id: CompactString,
    },
    /// Leave a run.
    LeaveRun {
        /// Run identifier.
        run_id: CompactString,
    },
    /// Keepalive.
    Ping,
}

/// Messages sent by the gateway to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Reply to `join-run` with the full runner list.
    RunInfo {
        /// Run identifier.
        run_id: CompactString,
        /// All runners currently in the run.
        runners: Vec<RunnerSnapshot>,
        /// Number of runners in the run.
        total_runners: usize,
    },
    /// A runner joined the run.
    RunnerJoined {
        /// Runner id.
        runner_id: CompactString,
        /// Runner name.
        runner_name: CompactString,
        /// Number of runners after the join.
        total_runners: usize,
    },
    /// A runner reported a new position.
    RunnerUpdated {
        /// Runner id.
        runner_id: CompactString,
        /// Runner name.
        runner_name: CompactString,
        /// New position.
        position: Position,
        /// Speed in m/s.
        speed: f64,
        /// When the update was applied.
        timestamp: DateTime<Utc>,
    },
    /// Reply to `request-gaps`.
    GapsInfo {
        /// Every unordered pair of positioned runners.
        gaps: Vec<Gap>,
        /// The pair with the largest distance.
        largest_gap: Option<Gap>,
        /// When the gaps were computed.
        timestamp: DateTime<Utc>,
    },
    /// A runner left the run.
    RunnerLeft {
        /// Runner id.
        runner_id: CompactString,
        /// Runner name.
        runner_name: CompactString,
        /// Number of runners remaining.
        total_runners: usize,
    },
    /// The previous request was rejected.
    Error {
        /// Status code (HTTP semantics).
        code: u16,
        /// Human readable reason.
        message: String,
    },
    /// Reply to `ping`.
    Pong,
}

impl ServerMessage {
    /// The wire name of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunInfo { .. } => "run-info",
            Self::RunnerJoined { .. } => "runner-joined",
            Self::RunnerUpdated { .. } => "runner-updated",
            Self::GapsInfo { .. } => "gaps-info",
            Self::RunnerLeft { .. } => "runner-left",
            Self::Error { .. } => "error",
            Self::Pong => "pong",
        }
    }
}
