//! Engine client behavior against a real HTTP server.

use std::time::Duration;

use chainflow::clients::engine::{EngineApi, EngineClient, EngineError, RetryConfig};
use chainflow::models::execution::ExecutionPhase;
use chainflow::models::workflow::{
    NodeKind, NodeMetadata, Position, WorkflowEdge, WorkflowNode, WorkflowSpec,
};
use serde_json::{Map, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> EngineClient {
    EngineClient::new(server.uri(), "test-key", Duration::from_secs(2)).with_retry(RetryConfig {
        max_retries: 2,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
    })
}

fn sample_workflow() -> WorkflowSpec {
    let trigger = WorkflowNode {
        id: "node_t".to_string(),
        kind: NodeKind::ManualTrigger,
        name: "Manual start".to_string(),
        description: "start".to_string(),
        config: Map::new(),
        position: Position { x: 0.0, y: 120.0 },
        metadata: NodeMetadata {
            block_id: "manual".to_string(),
        },
    };
    let action = WorkflowNode {
        id: "node_a".to_string(),
        kind: NodeKind::Notification,
        name: "Telegram message".to_string(),
        description: "notify".to_string(),
        config: Map::new(),
        position: Position { x: 260.0, y: 120.0 },
        metadata: NodeMetadata {
            block_id: "telegram_notification".to_string(),
        },
    };
    WorkflowSpec {
        name: "Test".to_string(),
        description: "test workflow".to_string(),
        edges: vec![WorkflowEdge::linear("node_t", "node_a")],
        trigger_node_id: trigger.id.clone(),
        nodes: vec![trigger, action],
        category: "automation".to_string(),
        tags: vec!["chat".to_string()],
        is_public: false,
    }
}

#[tokio::test]
async fn test_create_workflow_retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/workflows"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/workflows"))
        .and(header("X-User-Id", "user-1"))
        .and(body_partial_json(json!({"name": "Test"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "wf_42"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .create_workflow("user-1", &sample_workflow())
        .await
        .unwrap();
    assert_eq!(id, "wf_42");
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/workflows"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "validation failed",
            "details": {"validation": [{"path": "nodes.1.config.connectionId"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = client(&server)
        .create_workflow("user-1", &sample_workflow())
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(400));
    assert!(!error.is_retryable());
    assert_eq!(
        error.validation_paths(),
        vec!["nodes.1.config.connectionId".to_string()]
    );
}

#[tokio::test]
async fn test_retry_budget_is_bounded() {
    let server = MockServer::start().await;

    // max_retries = 2 means three requests in total, then the error surfaces.
    Mock::given(method("POST"))
        .and(path("/workflows"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let error = client(&server)
        .create_workflow("user-1", &sample_workflow())
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(503));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_execution_status_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/executions/exec-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "exec-9",
            "status": "waiting_for_signature",
            "startedAt": "2026-08-06T10:00:00Z",
            "nodeExecutions": [
                {"nodeType": "swap", "status": "pending"}
            ]
        })))
        .mount(&server)
        .await;

    let status = client(&server)
        .execution_status("user-1", "exec-9")
        .await
        .unwrap();

    assert_eq!(status.status, ExecutionPhase::WaitingForSignature);
    assert_eq!(status.node_executions.unwrap()[0].node_type, "swap");
}

#[tokio::test]
async fn test_cancel_trigger_accepts_empty_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/time-triggers/tb-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .cancel_time_trigger("user-1", "tb-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_engine_is_transport_error() {
    // Port 1 refuses connections.
    let client = EngineClient::new("http://127.0.0.1:1", "key", Duration::from_millis(200))
        .with_retry(RetryConfig {
            max_retries: 1,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
        });

    let error = client
        .create_workflow("user-1", &sample_workflow())
        .await
        .unwrap_err();
    assert!(matches!(error, EngineError::Transport(_)));
    assert!(error.is_retryable());
}
