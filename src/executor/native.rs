//! Native HTTP dispatch using reqwest.

use super::config::HttpOptions;
use super::error::TransportError;
use crate::models::{ExecutionContext, ExecutionResult, HttpMethod, ResponseBody};
use log::{debug, warn};
use std::collections::HashMap;
use std::time::Instant;

/// Host that containers use to reach the machine running them.
const DOCKER_HOST_ALIAS: &str = "host.docker.internal";

/// Dispatches exactly one HTTP request and normalizes the outcome.
///
/// Never returns an error: transport failures become
/// `ExecutionResult { success: false, error, time }`.
///
/// # Arguments
///
/// * `context` - Fully resolved request
/// * `options` - Timeout, TLS, redirect and size settings
pub async fn execute_request(context: &ExecutionContext, options: &HttpOptions) -> ExecutionResult {
    let start_time = Instant::now();

    match dispatch(context, options).await {
        Ok(mut result) => {
            result.time = Some(elapsed_ms(start_time));
            result
        }
        Err(e) => {
            warn!("{} {} failed: {}", context.method, context.url, e);
            ExecutionResult::failure(e.to_string(), Some(elapsed_ms(start_time)))
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::GET => reqwest::Method::GET,
        HttpMethod::POST => reqwest::Method::POST,
        HttpMethod::PUT => reqwest::Method::PUT,
        HttpMethod::PATCH => reqwest::Method::PATCH,
        HttpMethod::DELETE => reqwest::Method::DELETE,
        HttpMethod::HEAD => reqwest::Method::HEAD,
        HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
    }
}

fn build_client(options: &HttpOptions) -> Result<reqwest::Client, TransportError> {
    let redirect = if options.follow_redirects {
        reqwest::redirect::Policy::limited(options.max_redirects)
    } else {
        reqwest::redirect::Policy::none()
    };

    reqwest::Client::builder()
        .timeout(options.timeout_duration())
        .danger_accept_invalid_certs(!options.ssl_verification)
        .redirect(redirect)
        .build()
        .map_err(|e| TransportError::Build(e.to_string()))
}

/// Headers actually sent: the context headers plus the implied ones.
fn outgoing_headers(context: &ExecutionContext, url: &url::Url) -> HashMap<String, String> {
    let mut headers = context.headers.clone();

    if let Some(body) = context.body.as_deref() {
        if context.method.sends_body()
            && context.header("content-type").is_none()
            && serde_json::from_str::<serde_json::Value>(body).is_ok()
        {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
    }

    if url.host_str() == Some(DOCKER_HOST_ALIAS) && context.header("host").is_none() {
        headers.insert("Host".to_string(), "localhost".to_string());
    }

    headers
}

async fn dispatch(
    context: &ExecutionContext,
    options: &HttpOptions,
) -> Result<ExecutionResult, TransportError> {
    let url = url::Url::parse(&context.url)?;
    let client = build_client(options)?;

    let mut req_builder = client.request(to_reqwest_method(context.method), url.clone());
    for (name, value) in outgoing_headers(context, &url) {
        req_builder = req_builder.header(name, value);
    }
    if context.method.sends_body() {
        if let Some(body) = &context.body {
            req_builder = req_builder.body(body.clone());
        }
    }

    debug!("Dispatching {} {}", context.method, url);
    let mut response = req_builder
        .send()
        .await
        .map_err(|e| TransportError::classify(&e, options.timeout_ms))?;

    let status = response.status();
    let (headers, cookies) = split_headers(response.headers());

    let limit = options.max_response_bytes();
    if let (Some(limit), Some(declared)) = (limit, response.content_length()) {
        if context.method != HttpMethod::HEAD && declared > limit {
            return Err(size_exceeded(options));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TransportError::classify(&e, options.timeout_ms))?
    {
        body.extend_from_slice(&chunk);
        if let Some(limit) = limit {
            if body.len() as u64 > limit {
                return Err(size_exceeded(options));
            }
        }
    }

    let text = String::from_utf8_lossy(&body).into_owned();
    let content_type = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.clone());

    Ok(ExecutionResult {
        success: true,
        status: Some(status.as_u16()),
        status_text: Some(status.canonical_reason().unwrap_or("").to_string()),
        body: Some(ResponseBody::classify(text, content_type.as_deref())),
        headers: Some(headers),
        cookies: Some(cookies),
        time: None,
        error: None,
    })
}

fn size_exceeded(options: &HttpOptions) -> TransportError {
    TransportError::SizeLimitExceeded {
        limit_mb: options.max_response_size_mb.unwrap_or_default(),
    }
}

/// Splits response headers into the general mapping and the raw `Set-Cookie` values.
///
/// Repeated non-cookie headers are joined with `", "` in received order.
fn split_headers(headers: &reqwest::header::HeaderMap) -> (HashMap<String, String>, Vec<String>) {
    let mut mapped: HashMap<String, String> = HashMap::new();
    let mut cookies = Vec::new();

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        if *name == reqwest::header::SET_COOKIE {
            cookies.push(value);
            continue;
        }
        mapped
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    (mapped, cookies)
}
