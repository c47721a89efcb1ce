//! Promotion workflows driven through the HTTP API on a SQLite store.

use axum::http::StatusCode;
use integration_tests::{
    fixtures::{create_body, values, SOURCE, TARGET},
    init_test_logging, TestEnvironment,
};
use promotion_core::HttpSmokeTestRunner;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn create(env: &TestEnvironment, smoke_test_enabled: bool) -> anyhow::Result<String> {
    let (status, body) = env
        .request("POST", "/api/v1/promotions", Some(create_body(smoke_test_enabled)))
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    Ok(body["id"].as_str().unwrap_or_default().to_string())
}

async fn approve(env: &TestEnvironment, id: &str) -> anyhow::Result<Value> {
    let (status, body) = env
        .request(
            "POST",
            &format!("/api/v1/promotions/{id}/approve"),
            Some(json!({ "approvedBy": "bob", "reason": "reviewed" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    Ok(body)
}

#[tokio::test]
async fn test_full_lifecycle_over_http() -> anyhow::Result<()> {
    init_test_logging();
    let env = TestEnvironment::new()?;
    env.seed(SOURCE, &[("A", "1"), ("B", "2")]).await;
    env.seed(TARGET, &[("B", "2"), ("C", "3")]).await;

    let id = create(&env, false).await?;

    let (status, summary) = env
        .request("GET", &format!("/api/v1/promotions/{id}/diff/summary"), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["newConfigs"], 1);
    assert_eq!(summary["deleted"], 1);
    assert_eq!(summary["same"], 1);

    let approved = approve(&env, &id).await?;
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["approvalReason"], "reviewed");

    let (status, executed) = env
        .request("POST", &format!("/api/v1/promotions/{id}/execute"), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(executed["status"], "COMPLETED");
    assert_eq!(
        env.config.values(TARGET).await,
        values(&[("A", "1"), ("B", "2")])
    );

    let (status, rolled_back) = env
        .request(
            "POST",
            &format!("/api/v1/promotions/{id}/rollback?reason=regression"),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rolled_back["status"], "ROLLED_BACK");
    assert_eq!(rolled_back["errorMessage"], "Rolled back: regression");
    assert_eq!(
        env.config.values(TARGET).await,
        values(&[("B", "2"), ("C", "3")])
    );

    let (_, stats) = env.request("GET", "/api/v1/promotions/stats", None).await?;
    assert_eq!(stats["rolledBack"], 1);
    assert_eq!(stats["total"], 1);

    let metrics = env.metrics_text()?;
    assert!(metrics.contains("promotion_executions_total{outcome=\"completed\"} 1"));
    assert!(metrics.contains("promotion_rollbacks_total 1"));
    Ok(())
}

#[tokio::test]
async fn test_failing_smoke_test_blocks_execution() -> anyhow::Result<()> {
    let probe_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&probe_server)
        .await;

    let mut probes = HashMap::new();
    probes.insert(
        TARGET.to_string(),
        vec![format!("{}/health", probe_server.uri())],
    );
    let env = TestEnvironment::with_smoke_tests(Arc::new(HttpSmokeTestRunner::new(probes)))?;
    env.seed(SOURCE, &[("A", "1")]).await;
    env.seed(TARGET, &[("B", "2")]).await;

    let id = create(&env, true).await?;
    approve(&env, &id).await?;

    let (status, executed) = env
        .request("POST", &format!("/api/v1/promotions/{id}/execute"), None)
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(executed["status"], "FAILED");
    assert_eq!(executed["smokeTestResult"]["status"], "FAILED");
    assert_eq!(executed["smokeTestResult"]["probes"][0]["status"], 503);
    assert!(executed["errorMessage"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Smoke tests failed"));
    assert_eq!(env.config.values(TARGET).await, values(&[("B", "2")]));

    let metrics = env.metrics_text()?;
    assert!(metrics.contains("promotion_executions_total{outcome=\"smoke_test_failed\"} 1"));
    Ok(())
}

#[tokio::test]
async fn test_passing_smoke_test_allows_execution() -> anyhow::Result<()> {
    let probe_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&probe_server)
        .await;

    let mut probes = HashMap::new();
    probes.insert(
        TARGET.to_string(),
        vec![format!("{}/health", probe_server.uri())],
    );
    let env = TestEnvironment::with_smoke_tests(Arc::new(HttpSmokeTestRunner::new(probes)))?;
    env.seed(SOURCE, &[("A", "1")]).await;

    let id = create(&env, true).await?;
    approve(&env, &id).await?;
    let (_, executed) = env
        .request("POST", &format!("/api/v1/promotions/{id}/execute"), None)
        .await?;

    assert_eq!(executed["status"], "COMPLETED");
    assert_eq!(executed["smokeTestResult"]["status"], "PASSED");
    assert_eq!(env.config.values(TARGET).await, values(&[("A", "1")]));
    Ok(())
}

#[tokio::test]
async fn test_background_execution_through_queue() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    env.seed(SOURCE, &[("A", "1")]).await;
    let id = create(&env, false).await?;
    approve(&env, &id).await?;

    let (status, _) = env
        .request(
            "POST",
            &format!("/api/v1/promotions/{id}/execute/async"),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::ACCEPTED);

    let mut current = Value::Null;
    for _ in 0..100 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let (_, body) = env
            .request("GET", &format!("/api/v1/promotions/{id}"), None)
            .await?;
        current = body["status"].clone();
        if current == "COMPLETED" {
            break;
        }
    }

    assert_eq!(current, "COMPLETED");
    assert_eq!(env.config.values(TARGET).await, values(&[("A", "1")]));
    Ok(())
}

#[tokio::test]
async fn test_listing_and_recent_over_sqlite() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    env.seed(SOURCE, &[("A", "1")]).await;
    let first = create(&env, false).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = create(&env, false).await?;
    env.request(
        "POST",
        &format!("/api/v1/promotions/{first}/reject"),
        Some(json!({ "rejectedBy": "bob", "reason": "duplicate" })),
    )
    .await?;

    let (_, recent) = env
        .request("GET", "/api/v1/promotions/recent?limit=1", None)
        .await?;
    assert_eq!(recent[0]["id"], second.as_str());

    let (_, rejected) = env
        .request(
            "GET",
            "/api/v1/promotions?applicationId=billing&status=REJECTED",
            None,
        )
        .await?;
    let rejected = rejected.as_array().cloned().unwrap_or_default();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["id"], first.as_str());
    Ok(())
}
