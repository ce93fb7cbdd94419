//! Auxiliary HTTP endpoints for tooling and debugging.

use crate::{Error, gateway::Gateway};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use protocol::http::{ErrorBody, RunList, TestRunnersCreated};
use serde::Deserialize;

/// Query string of `POST /test-runners/{run_id}`.
#[derive(Debug, Deserialize)]
pub struct CountQuery {
    /// Requested runner count. Missing, zero, or unparsable values fall
    /// back to the configured default.
    pub count: Option<String>,
}

impl CountQuery {
    fn count(&self) -> Option<usize> {
        self.count
            .as_deref()
            .and_then(|c| c.trim().parse::<usize>().ok())
            .filter(|&c| c > 0)
    }
}

/// `GET /runs` -- list active runs with their runners.
pub async fn list_runs(State(state): State<Gateway>) -> Json<RunList> {
    Json(RunList {
        runs: state.registry.list(),
    })
}

/// `POST /test-runners/{run_id}?count=N` -- add synthetic runners to a run.
pub async fn create_test_runners(
    State(state): State<Gateway>,
    Path(run_id): Path<String>,
    Query(query): Query<CountQuery>,
) -> Response {
    match state.test_runners.create(&run_id, query.count()) {
        Ok(created) => Json(TestRunnersCreated {
            message: format!("Created {} test runners", created.runners.len()),
            runners: created.runners,
            total_runners: created.total_runners,
        })
        .into_response(),
        Err(e @ Error::UnknownRun(_)) => {
            tracing::debug!("test runner request rejected: {e}");
            (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: "Run not found".to_owned(),
                }),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::from_u16(e.code()).unwrap_or(StatusCode::BAD_REQUEST),
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
