use rigger_secrets::{SecretBackend, SecretOptions, VaultBackend};
use rigger_utils::RetryConfig;
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_VAR: &str = "RIGGER_TEST_VAULT_TOKEN";

fn backend(server: &MockServer) -> VaultBackend {
    std::env::set_var(TOKEN_VAR, "t0ken");
    VaultBackend::new(&server.uri(), TOKEN_VAR)
        .unwrap()
        .with_retry(RetryConfig::none())
}

#[tokio::test]
#[serial]
async fn test_reads_value_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/db_password"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "data": { "value": "hunter2" }, "metadata": { "version": 3 } }
        })))
        .mount(&server)
        .await;

    let value = backend(&server)
        .resolve("db_password", &SecretOptions::default())
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("hunter2"));
}

#[tokio::test]
#[serial]
async fn test_missing_secret_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let value = backend(&server)
        .resolve("absent", &SecretOptions::namespace("kv"))
        .await
        .unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
#[serial]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let backend = backend(&server).with_retry(RetryConfig {
        max_attempts: 2,
        initial_delay: std::time::Duration::from_millis(1),
        max_delay: std::time::Duration::from_millis(1),
        multiplier: 1.0,
        jitter: false,
    });

    assert!(backend
        .resolve("flaky", &SecretOptions::default())
        .await
        .is_err());
}

#[tokio::test]
#[serial]
async fn test_save_posts_value() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/secret/data/api_key"))
        .and(body_partial_json(json!({ "data": { "value": "abc" } })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    assert!(backend
        .save("api_key", "abc", &SecretOptions::default())
        .await
        .unwrap());
    backend.close().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_missing_token_is_environment_error() {
    let server = MockServer::start().await;
    let backend = backend(&server);
    std::env::remove_var(TOKEN_VAR);

    let err = backend
        .resolve("anything", &SecretOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, rigger_core::Error::Environment { .. }));
}

#[tokio::test]
#[serial]
async fn test_endpoint_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vault/v1/secret/data/db_password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "data": { "value": "hunter2" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    std::env::set_var(TOKEN_VAR, "t0ken");
    let backend = VaultBackend::new(&format!("{}/vault", server.uri()), TOKEN_VAR)
        .unwrap()
        .with_retry(RetryConfig::none());

    let value = backend
        .resolve("db_password", &SecretOptions::default())
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("hunter2"));
}
