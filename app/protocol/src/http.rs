//! Bodies of the auxiliary HTTP endpoints (`GET /runs`,
//! `POST /test-runners/{runId}`).

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Response of `GET /runs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunList {
    /// Active runs ordered by run id.
    pub runs: Vec<RunSummary>,
}

/// One active run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: CompactString,
    /// Number of runners in the run.
    pub runner_count: usize,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// Runners in the run.
    pub runners: Vec<RunnerSummary>,
}

/// Identity of one runner within a [`RunSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerSummary {
    /// Runner id.
    pub id: CompactString,
    /// Runner name.
    pub name: CompactString,
    /// Whether the runner is synthetic.
    pub is_test: bool,
}

/// A synthetic runner created by the test-runner endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRunner {
    /// Generated runner id.
    pub runner_id: CompactString,
    /// Runner name.
    pub runner_name: CompactString,
}

/// Response of `POST /test-runners/{runId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunnersCreated {
    /// Summary line.
    pub message: String,
    /// Runners that were created.
    pub runners: Vec<CreatedRunner>,
    /// Runners in the run after creation.
    pub total_runners: usize,
}

/// Error body for failed auxiliary requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Reason for the failure.
    pub error: String,
}
