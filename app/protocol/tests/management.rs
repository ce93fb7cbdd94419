//! Auxiliary HTTP body tests.

use pack_protocol::http::{CreatedRunner, ErrorBody, RunList, RunSummary, RunnerSummary, TestRunnersCreated};

#[test]
fn run_list_serializes() {
    let list = RunList {
        runs: vec![RunSummary {
            run_id: "r1".into(),
            runner_count: 1,
            started_at: chrono::Utc::now(),
            runners: vec![RunnerSummary {
                id: "c1".into(),
                name: "Ana".into(),
                is_test: false,
            }],
        }],
    };
    let json = serde_json::to_value(&list).unwrap();
    assert_eq!(json["runs"][0]["runId"], "r1");
    assert_eq!(json["runs"][0]["runnerCount"], 1);
    assert!(json["runs"][0]["startedAt"].is_string());
    assert_eq!(json["runs"][0]["runners"][0]["isTest"], false);
}

#[test]
fn test_runners_created_serializes() {
    let body = TestRunnersCreated {
        message: "Created 1 test runners".into(),
        runners: vec![CreatedRunner {
            runner_id: "test-runner-1-0".into(),
            runner_name: "Alex".into(),
        }],
        total_runners: 2,
    };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["runners"][0]["runnerId"], "test-runner-1-0");
    assert_eq!(json["totalRunners"], 2);
}

#[test]
fn error_body_serializes() {
    let body = ErrorBody {
        error: "Run not found".into(),
    };
    assert_eq!(
        serde_json::to_string(&body).unwrap(),
        r#"{"error":"Run not found"}"#
    );
}
