//! Pre/post-request scripting through the full pipeline

use super::{runner, runner_with_config, vars};
use api_tester::config::EngineConfig;
use api_tester::environment::Environment;
use api_tester::models::{ExecuteInput, HttpMethod, SavedRequest};
use api_tester::storage::Storage;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_pre_script_injects_header_from_environment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer t-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("GET", server.uri());
    input.variables = Some(vars(&[("token", "t-1")]));
    input.pre_request_script = Some(
        r#"pm.request.headers.add("Authorization", "Bearer " + pm.environment.get("token"));"#
            .to_string(),
    );

    let outcome = runner.execute(input).await;
    assert_eq!(outcome.result.status, Some(200));
    assert!(outcome.pre_request_error.is_none());
}

#[tokio::test]
async fn test_pre_script_rewrites_body_and_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/items"))
        .and(body_string("rewritten"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("POST", format!("{}/v1/items", server.uri()));
    input.body = Some("original".to_string());
    input.pre_request_script = Some(
        r#"
            let url = pm.request.url;
            url.replace("/v1/", "/v2/");
            pm.request.url = url;
            pm.request.body.update("rewritten");
        "#
        .to_string(),
    );

    let outcome = runner.execute(input).await;
    assert_eq!(outcome.result.status, Some(201), "{:?}", outcome.pre_request_error);
}

#[tokio::test]
async fn test_failing_pre_script_sends_unmodified_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("GET", server.uri());
    input.pre_request_script = Some(
        r#"
            pm.request.headers.add("X-Partial", "yes");
            throw "boom";
        "#
        .to_string(),
    );

    let outcome = runner.execute(input).await;
    assert!(outcome.is_success());
    assert!(outcome.pre_request_error.is_some());

    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("x-partial").is_none());
}

#[tokio::test]
async fn test_post_script_tests_and_environment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc", "user": {"id": 7}})))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("POST", format!("{}/login", server.uri()));
    input.body = Some(r#"{"user":"ada"}"#.to_string());
    input.variables = Some(vars(&[]));
    input.post_request_script = Some(
        r#"
            let data = pm.response.json();
            pm.environment.set("token", data.token);
            pm.test("status is 200", || pm.response.to.have.status(200));
            pm.test("has user", || pm.response.to.have.jsonBody("user"));
            pm.test("wrong status", || pm.response.to.have.status(201));
        "#
        .to_string(),
    );

    let outcome = runner.execute(input).await;

    assert!(outcome.post_request_error.is_none(), "{:?}", outcome.post_request_error);
    let tests = outcome.tests.clone().unwrap_or_default();
    assert_eq!(tests.get("status is 200"), Some(&true));
    assert_eq!(tests.get("has user"), Some(&true));
    assert_eq!(tests.get("wrong status"), Some(&false));
    assert!(!outcome.all_tests_passed());

    let environment = outcome.environment.unwrap_or_default();
    assert_eq!(environment.get("token").map(String::as_str), Some("abc"));
}

#[tokio::test]
async fn test_post_script_sees_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (runner, _storage) = runner();
    let mut input = ExecuteInput::new("GET", server.uri());
    input.post_request_script =
        Some(r#"pm.test("is ok", || pm.response.to.have.status(200));"#.to_string());

    let outcome = runner.execute(input).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.result.status, Some(404));
    assert_eq!(
        outcome.tests.unwrap_or_default().get("is ok"),
        Some(&false)
    );
}

#[tokio::test]
async fn test_runaway_post_script_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = EngineConfig::default();
    config.script_timeout = 200;
    let (runner, _storage) = runner_with_config(config);

    let mut input = ExecuteInput::new("GET", server.uri());
    input.post_request_script = Some("let x = 0; loop { x += 1; }".to_string());

    let outcome = runner.execute(input).await;
    assert!(outcome.is_success());
    let error = outcome.post_request_error.unwrap_or_default();
    assert!(error.contains("timed out"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_saved_request_scripts_are_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-from-saved", "1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (runner, storage) = runner();
    let mut saved = SavedRequest::new("Saved", HttpMethod::GET, server.uri(), "col-1");
    saved.pre_request_script = Some(r#"pm.request.headers.add("X-From-Saved", "1");"#.to_string());
    saved.post_request_script =
        Some(r#"pm.test("saved test", || pm.response.to.have.status(200));"#.to_string());
    let request_id = saved.id.clone();
    storage.insert_request(saved);

    let mut input = ExecuteInput::new("GET", server.uri());
    input.request_id = Some(request_id);

    let outcome = runner.execute(input).await;
    assert_eq!(outcome.result.status, Some(200));
    assert_eq!(
        outcome.tests.unwrap_or_default().get("saved test"),
        Some(&true)
    );
}

#[tokio::test]
async fn test_script_environment_persisted_when_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"next": "page-2"})))
        .mount(&server)
        .await;

    let mut config = EngineConfig::default();
    config.persist_script_environment = true;
    let (runner, storage) = runner_with_config(config);

    let environment = Environment::with_variables("staging", &vars(&[("baseUrl", &server.uri())]));
    let environment_id = environment.id.clone();
    storage.insert_environment(environment);

    let mut input = ExecuteInput::new("GET", "{{baseUrl}}/list");
    input.environment_id = Some(environment_id.clone());
    input.post_request_script =
        Some(r#"pm.environment.set("cursor", pm.response.json().next);"#.to_string());

    let outcome = runner.execute(input).await;
    assert!(outcome.post_request_error.is_none());

    let stored = storage
        .get_environment(&environment_id)
        .await
        .unwrap()
        .unwrap();
    let variables = stored.parse_variables().unwrap();
    assert_eq!(variables.get("cursor").map(String::as_str), Some("page-2"));
    assert_eq!(variables.get("baseUrl"), Some(&server.uri()));
}

#[tokio::test]
async fn test_script_environment_not_persisted_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (runner, storage) = runner();
    let environment = Environment::with_variables("staging", &vars(&[("baseUrl", &server.uri())]));
    let environment_id = environment.id.clone();
    storage.insert_environment(environment);

    let mut input = ExecuteInput::new("GET", "{{baseUrl}}/");
    input.environment_id = Some(environment_id.clone());
    input.post_request_script = Some(r#"pm.environment.set("cursor", "x");"#.to_string());

    let outcome = runner.execute(input).await;
    assert_eq!(
        outcome
            .environment
            .unwrap_or_default()
            .get("cursor")
            .map(String::as_str),
        Some("x")
    );

    let stored = storage
        .get_environment(&environment_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.parse_variables().unwrap().get("cursor").is_none());
}
