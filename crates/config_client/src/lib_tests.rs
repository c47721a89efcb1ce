//! Unit tests for the config_client crate.

use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entry(id: &str, key: &str, value: &str, config_type: &str, version: u32) -> serde_json::Value {
    json!({
        "id": id,
        "key": key,
        "value": value,
        "type": config_type,
        "description": null,
        "isSecret": false,
        "environmentId": "production",
        "versionNumber": version
    })
}

fn client(server: &MockServer) -> HttpConfigClient {
    HttpConfigClient::new(&format!("{}/api/v1", server.uri())).unwrap()
}

fn app() -> ApplicationId {
    ApplicationId::new("billing").unwrap()
}

fn env(name: &str) -> EnvironmentName {
    EnvironmentName::new(name).unwrap()
}

#[test]
fn test_new_rejects_invalid_base_url() {
    assert!(matches!(
        HttpConfigClient::new("not a url"),
        Err(ConfigClientError::InvalidBaseUrl { .. })
    ));
    assert!(matches!(
        HttpConfigClient::new("mailto:ops@example.com"),
        Err(ConfigClientError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn test_url_appends_encoded_segments() {
    let client = HttpConfigClient::new("http://config.local/api/v1/").unwrap();

    let url = client
        .url(&["configurations", "environment", "prod", "key", "a b/c"])
        .unwrap();

    assert_eq!(
        url.as_str(),
        "http://config.local/api/v1/configurations/environment/prod/key/a%20b%2Fc"
    );
}

#[tokio::test]
async fn test_typed_snapshot_reads_types_and_versions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/configurations/environment/staging"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            entry("1", "timeout", "30", "INTEGER", 3),
            entry("2", "feature", "on", "STRING", 1),
        ])))
        .mount(&server)
        .await;

    let snapshot = client(&server)
        .snapshot(&app(), &env("staging"))
        .await
        .unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["timeout"], ConfigRecord::new("30", "INTEGER", 3));
}

#[tokio::test]
async fn test_values_only_snapshot_defaults_type_and_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/configurations/environment/staging/map"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"A": "1", "B": "2"})))
        .mount(&server)
        .await;

    let client = client(&server).with_snapshot_mode(SnapshotMode::ValuesOnly);
    let snapshot = client.snapshot(&app(), &env("staging")).await.unwrap();

    assert_eq!(snapshot["A"], ConfigRecord::new("1", "STRING", 1));
    assert_eq!(snapshot["B"], ConfigRecord::untyped("2"));
}

#[tokio::test]
async fn test_snapshot_server_error_maps_to_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/configurations/environment/staging"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .snapshot(&app(), &env("staging"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CollaboratorError::Rejected {
            status: 500,
            message: "boom".to_string()
        }
    );
}

#[tokio::test]
async fn test_snapshot_malformed_body_maps_to_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/configurations/environment/staging"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"unexpected\": true}"))
        .mount(&server)
        .await;

    let err = client(&server)
        .snapshot(&app(), &env("staging"))
        .await
        .unwrap_err();

    assert!(matches!(err, CollaboratorError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_unreachable_service_maps_to_unavailable() {
    let client = HttpConfigClient::new("http://127.0.0.1:9/api/v1").unwrap();

    let err = client.snapshot(&app(), &env("staging")).await.unwrap_err();

    assert!(matches!(err, CollaboratorError::Unavailable { .. }));
}

#[tokio::test]
async fn test_apply_updates_existing_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/configurations/environment/production/key/timeout"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(entry("cfg-7", "timeout", "10", "INTEGER", 2)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/configurations/cfg-7"))
        .and(body_json(json!({
            "value": "30",
            "type": "INTEGER",
            "isSecret": false
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(entry("cfg-7", "timeout", "30", "INTEGER", 3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .apply_configuration_change(&env("production"), "timeout", "30", "INTEGER")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_apply_creates_missing_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/configurations/environment/production/key/api.secret"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/configurations"))
        .and(body_json(json!({
            "key": "api.secret",
            "value": "s3cr3t",
            "type": "SECRET",
            "isSecret": true,
            "environmentId": "production"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(entry("cfg-9", "api.secret", "s3cr3t", "SECRET", 1)),
        )
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .apply_configuration_change(&env("production"), "api.secret", "s3cr3t", "SECRET")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_existing_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/configurations/environment/production/key/old"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(entry("cfg-3", "old", "x", "STRING", 1)),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/configurations/cfg-3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete_configuration_key(&env("production"), "old")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_missing_key_is_noop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/configurations/environment/production/key/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    client(&server)
        .delete_configuration_key(&env("production"), "gone")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_write_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/configurations/environment/production/key/k"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/configurations"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid type"))
        .mount(&server)
        .await;

    let err = client(&server)
        .apply_configuration_change(&env("production"), "k", "v", "UNKNOWN")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CollaboratorError::Rejected {
            status: 400,
            message: "invalid type".to_string()
        }
    );
}
