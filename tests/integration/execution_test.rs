//! End-to-end execution tests
//!
//! These tests drive the full pipeline (variable loading, header merge,
//! dispatch, history) against a local wiremock server.

use super::{runner, runner_with_config, vars};
use api_tester::config::EngineConfig;
use api_tester::environment::Environment;
use api_tester::models::{Collection, ExecuteInput, HttpMethod, ResponseBody, SavedRequest};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_get_json_with_caller_variables() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42, "name": "Ada"})))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("GET", "{{baseUrl}}/users/{{userId}}");
    input.variables = Some(vars(&[("baseUrl", &server.uri()), ("userId", "42")]));

    let outcome = runner.execute(input).await;

    assert!(outcome.is_success(), "unexpected error: {:?}", outcome.result.error);
    assert_eq!(outcome.result.status, Some(200));
    assert_eq!(outcome.result.status_text.as_deref(), Some("OK"));
    assert_eq!(
        outcome.result.body,
        Some(ResponseBody::Json(json!({"id": 42, "name": "Ada"})))
    );
    assert!(outcome.result.time.is_some());
    assert!(outcome.tests.is_none());
    assert!(outcome.environment.is_none());
}

#[tokio::test]
async fn test_error_status_is_still_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let outcome = runner
        .execute(ExecuteInput::new("GET", format!("{}/nope", server.uri())))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.result.status, Some(404));
    assert_eq!(
        outcome.result.body,
        Some(ResponseBody::Text("missing".to_string()))
    );
    assert!(outcome.result.error.is_none());
}

#[tokio::test]
async fn test_set_cookie_is_split_from_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "session=abc; Path=/")
                .append_header("Set-Cookie", "theme=dark")
                .insert_header("X-Trace", "t-1"),
        )
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let outcome = runner
        .execute(ExecuteInput::new("GET", server.uri()))
        .await;

    let cookies = outcome.result.cookies.clone().unwrap_or_default();
    assert_eq!(cookies, vec!["session=abc; Path=/", "theme=dark"]);
    assert_eq!(outcome.result.header("x-trace"), Some("t-1"));
    assert!(outcome.result.header("set-cookie").is_none());
}

#[tokio::test]
async fn test_default_environment_is_used_without_caller_variables() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (runner, storage) = runner();
    storage.insert_environment(Environment::with_variables(
        "Local Environment",
        &vars(&[("baseUrl", &server.uri())]),
    ));

    let outcome = runner
        .execute(ExecuteInput::new("GET", "{{baseUrl}}/health"))
        .await;

    assert_eq!(outcome.result.status, Some(204));
}

#[tokio::test]
async fn test_post_json_body_gets_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("content-type", "application/json"))
        .and(body_string(r#"{"name":"widget"}"#))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("POST", format!("{}/items", server.uri()));
    input.body = Some(r#"{"name":"{{item}}"}"#.to_string());
    input.variables = Some(vars(&[("item", "widget")]));

    let outcome = runner.execute(input).await;
    assert_eq!(outcome.result.status, Some(201));
}

#[tokio::test]
async fn test_collection_headers_merge_under_caller_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (runner, storage) = runner();
    let collection = Collection::new("Billing", "system")
        .with_headers(r#"{"X-Api-Key":"{{apiKey}}","Accept":"text/plain"}"#);
    let saved = SavedRequest::new("Invoices", HttpMethod::GET, "/invoices", &collection.id);
    let request_id = saved.id.clone();
    storage.insert_collection(collection);
    storage.insert_request(saved);

    let mut caller = HashMap::new();
    caller.insert("accept".to_string(), "application/json".to_string());
    let mut input = ExecuteInput::new("GET", format!("{}/invoices", server.uri()));
    input.request_id = Some(request_id);
    input.headers = Some(caller);
    input.variables = Some(vars(&[("apiKey", "k-123")]));

    let outcome = runner.execute(input).await;
    assert!(outcome.is_success());

    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 1);
    let sent = &received[0].headers;
    assert_eq!(
        sent.get("x-api-key").and_then(|v| v.to_str().ok()),
        Some("k-123")
    );
    assert_eq!(
        sent.get("accept").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
}

#[tokio::test]
async fn test_config_default_headers_are_lowest_precedence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "caller-agent"))
        .and(header("x-client", "api-tester"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = EngineConfig::default();
    config
        .default_headers
        .insert("User-Agent".to_string(), "engine".to_string());
    config
        .default_headers
        .insert("X-Client".to_string(), "api-tester".to_string());
    let (runner, _storage) = runner_with_config(config);

    let mut input = ExecuteInput::new("GET", server.uri());
    input.headers = Some(vars(&[("user-agent", "caller-agent")]));

    let outcome = runner.execute(input).await;
    assert_eq!(outcome.result.status, Some(200));
}

#[tokio::test]
async fn test_dns_failure_is_classified() {
    let (runner, _storage) = runner();
    let outcome = runner
        .execute(ExecuteInput::new("GET", "http://does-not-exist.invalid/"))
        .await;

    assert!(!outcome.is_success());
    assert!(outcome.result.status.is_none());
    let error = outcome.result.error.unwrap_or_default();
    assert!(error.contains("DNS"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_connection_refused_is_classified() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let (runner, _storage) = runner();
    let outcome = runner
        .execute(ExecuteInput::new("GET", format!("http://127.0.0.1:{}/", port)))
        .await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.result.error.as_deref(), Some("Connection refused"));
}

#[tokio::test]
async fn test_response_size_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2 * 1024 * 1024)))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("GET", server.uri());
    input.max_response_size = Some(1);

    let outcome = runner.execute(input).await;
    assert!(!outcome.is_success());
    assert_eq!(
        outcome.result.error.as_deref(),
        Some("Response size exceeded limit of 1MB")
    );
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("GET", server.uri());
    input.timeout = Some(1000);

    let outcome = runner.execute(input).await;
    assert!(!outcome.is_success());
    assert_eq!(
        outcome.result.error.as_deref(),
        Some("Request timeout after 1000ms")
    );
}

#[tokio::test]
async fn test_redirects_not_followed_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("GET", format!("{}/old", server.uri()));
    input.follow_redirects = Some(false);
    let outcome = runner.execute(input).await;
    assert_eq!(outcome.result.status, Some(302));

    let followed = runner
        .execute(ExecuteInput::new("GET", format!("{}/old", server.uri())))
        .await;
    assert_eq!(followed.result.status, Some(200));
}

#[tokio::test]
async fn test_history_is_recorded_and_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let mut config = EngineConfig::default();
    config.sanitize_history_headers = true;
    let (runner, _storage) = runner_with_config(config);

    let mut input = ExecuteInput::new("GET", server.uri());
    input.headers = Some(vars(&[("Authorization", "Bearer secret"), ("Accept", "*/*")]));
    runner.execute(input).await;

    let history = runner.history().await.unwrap();
    assert_eq!(history.len(), 1);
    let record = &history[0];
    assert_eq!(record.method, "GET");
    assert_eq!(record.status, 200);
    assert_eq!(record.owner_id, "system");
    assert!(!record.request_headers.contains("secret"));
    assert!(record.request_headers.contains("Accept"));
    assert_eq!(record.response_body, "ok");

    assert_eq!(runner.clear_history().await.unwrap(), 1);
    assert!(runner.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_executions_are_isolated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (runner, storage) = runner();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let runner = runner.clone();
            let uri = server.uri();
            tokio::spawn(async move {
                let mut input = ExecuteInput::new("GET", "{{base}}/item/{{n}}");
                input.variables = Some(vars(&[("base", &uri), ("n", &i.to_string())]));
                input.pre_request_script =
                    Some(format!(r#"pm.environment.set("seen", "{}");"#, i));
                (i, runner.execute(input).await)
            })
        })
        .collect();

    for handle in handles {
        let (i, outcome) = handle.await.unwrap();
        assert_eq!(outcome.result.status, Some(200));
        let environment = outcome.environment.unwrap_or_default();
        assert_eq!(environment.get("seen"), Some(&i.to_string()));
        assert_eq!(environment.get("n"), Some(&i.to_string()));
    }

    assert_eq!(storage.history_len(), 8);
}
