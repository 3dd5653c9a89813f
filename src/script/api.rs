//! The `pm` capability object exposed to scripts.
//!
//! Scripts never see engine state directly. Every handle here wraps a local copy
//! owned by one script run; handles obtained through property access share that
//! copy, so `pm.environment.set(..)` is visible to a later `pm.environment.get(..)`.
//!
//! `pm` is not a scope variable: the sandbox resolves it through the engine's
//! variable resolver, so `pm.test` callbacks never capture it and can run inside
//! the `pm.test(..)` call.

use super::ScriptRequest;
use crate::models::ExecutionResult;
use crate::variables::VariableMap;
use log::debug;
use rhai::{Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map, NativeCallContext};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

type Shared<T> = Rc<RefCell<T>>;

fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// `pm.environment` and `pm.variables`.
#[derive(Debug, Clone)]
pub struct EnvironmentApi {
    vars: Shared<VariableMap>,
}

impl EnvironmentApi {
    fn set(&mut self, key: &str, value: Dynamic) {
        self.vars.borrow_mut().insert(key.to_string(), value.to_string());
    }

    fn get(&mut self, key: &str) -> Dynamic {
        match self.vars.borrow().get(key) {
            Some(value) => Dynamic::from(value.clone()),
            None => Dynamic::UNIT,
        }
    }

    fn unset(&mut self, key: &str) {
        self.vars.borrow_mut().remove(key);
    }
}

/// `pm.request`, available before dispatch.
#[derive(Debug, Clone)]
pub struct RequestApi {
    state: Shared<ScriptRequest>,
}

/// `pm.request.headers`.
#[derive(Debug, Clone)]
pub struct HeadersApi {
    state: Shared<ScriptRequest>,
}

impl HeadersApi {
    fn add(&mut self, name: &str, value: Dynamic) {
        self.state
            .borrow_mut()
            .headers
            .insert(name.to_string(), value.to_string());
    }

    fn get(&mut self, name: &str) -> Dynamic {
        let state = self.state.borrow();
        let value = state
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| Dynamic::from(v.clone()));
        value.unwrap_or(Dynamic::UNIT)
    }
}

/// `pm.request.body`.
#[derive(Debug, Clone)]
pub struct BodyApi {
    state: Shared<ScriptRequest>,
}

/// `pm.response`, available after dispatch.
#[derive(Debug, Clone)]
pub struct ResponseApi {
    result: Rc<ExecutionResult>,
}

/// `pm.response.to` and `pm.response.to.have`.
#[derive(Debug, Clone)]
pub struct ResponseAssertions {
    result: Rc<ExecutionResult>,
}

impl ResponseAssertions {
    fn status(&mut self, code: i64) -> Result<(), Box<EvalAltResult>> {
        let actual = self.result.status.map(i64::from);
        if actual == Some(code) {
            return Ok(());
        }
        let shown = actual.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string());
        Err(format!("Expected status {} but got {}", code, shown).into())
    }

    fn json_body(&mut self) -> Result<serde_json::Value, Box<EvalAltResult>> {
        match self.result.body.as_ref().and_then(|b| b.to_json()) {
            Some(value) if value.is_object() || value.is_array() => Ok(value),
            _ => Err("Body is not JSON".into()),
        }
    }

    fn json_body_with_key(&mut self, key: &str) -> Result<(), Box<EvalAltResult>> {
        let value = self.json_body()?;
        match value.as_object() {
            Some(object) if !object.contains_key(key) => {
                Err(format!("Expected JSON body to have property '{}'", key).into())
            }
            _ => Ok(()),
        }
    }
}

/// Root `pm` object.
#[derive(Debug, Clone)]
pub struct PmApi {
    environment: EnvironmentApi,
    request: Option<RequestApi>,
    response: Option<ResponseApi>,
    tests: Shared<BTreeMap<String, bool>>,
}

impl PmApi {
    /// Capabilities for the pre-request phase.
    pub fn for_pre_request(environment: VariableMap, request: ScriptRequest) -> Self {
        Self {
            environment: EnvironmentApi {
                vars: shared(environment),
            },
            request: Some(RequestApi {
                state: shared(request),
            }),
            response: None,
            tests: shared(BTreeMap::new()),
        }
    }

    /// Capabilities for the post-request phase.
    pub fn for_post_request(environment: VariableMap, result: &ExecutionResult) -> Self {
        Self {
            environment: EnvironmentApi {
                vars: shared(environment),
            },
            request: None,
            response: Some(ResponseApi {
                result: Rc::new(result.clone()),
            }),
            tests: shared(BTreeMap::new()),
        }
    }

    /// Current state of the local environment copy.
    pub fn environment_snapshot(&self) -> VariableMap {
        self.environment.vars.borrow().clone()
    }

    /// Current state of the local request copy, if this is a pre-request run.
    pub fn request_snapshot(&self) -> Option<ScriptRequest> {
        self.request.as_ref().map(|r| r.state.borrow().clone())
    }

    /// Test outcomes recorded so far.
    pub fn tests_snapshot(&self) -> BTreeMap<String, bool> {
        self.tests.borrow().clone()
    }

    /// Runs a named test callback right away and records whether it passed.
    ///
    /// Errors raised by the callback mark the test as failed and are swallowed,
    /// except termination by the sandbox budget, which aborts the script.
    fn run_test(
        context: NativeCallContext,
        pm: &mut PmApi,
        name: &str,
        callback: FnPtr,
    ) -> Result<(), Box<EvalAltResult>> {
        match callback.call_within_context::<Dynamic>(&context, ()) {
            Ok(_) => pm.record_test(name, true),
            Err(e) => {
                if matches!(e.unwrap_inner(), EvalAltResult::ErrorTerminated(..)) {
                    return Err(e);
                }
                debug!("Test '{}' failed: {}", name, e);
                pm.record_test(name, false);
            }
        }
        Ok(())
    }

    fn record_test(&self, name: &str, passed: bool) {
        self.tests.borrow_mut().insert(name.to_string(), passed);
    }
}

fn optional<T: Clone + std::any::Any>(value: &Option<T>) -> Dynamic {
    value.clone().map(Dynamic::from).unwrap_or(Dynamic::UNIT)
}

fn to_rhai_map(headers: &HashMap<String, String>) -> Map {
    headers
        .iter()
        .map(|(k, v)| (k.as_str().into(), Dynamic::from(v.clone())))
        .collect()
}

fn json_to_dynamic(value: &serde_json::Value) -> Dynamic {
    rhai::serde::to_dynamic(value).unwrap_or(Dynamic::UNIT)
}

/// Registers every capability type on `engine`.
pub fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<PmApi>("Pm")
        .register_get("environment", |pm: &mut PmApi| pm.environment.clone())
        .register_get("variables", |pm: &mut PmApi| pm.environment.clone())
        .register_get("request", |pm: &mut PmApi| optional(&pm.request))
        .register_get("response", |pm: &mut PmApi| optional(&pm.response))
        .register_fn("test", PmApi::run_test);

    engine
        .register_type_with_name::<EnvironmentApi>("Environment")
        .register_fn("set", EnvironmentApi::set)
        .register_fn("get", EnvironmentApi::get)
        .register_fn("unset", EnvironmentApi::unset);

    engine
        .register_type_with_name::<RequestApi>("Request")
        .register_get("method", |r: &mut RequestApi| r.state.borrow().method.clone())
        .register_get("url", |r: &mut RequestApi| r.state.borrow().url.clone())
        .register_set("url", |r: &mut RequestApi, url: ImmutableString| {
            r.state.borrow_mut().url = url.to_string();
        })
        .register_get("headers", |r: &mut RequestApi| HeadersApi {
            state: Rc::clone(&r.state),
        })
        .register_get("body", |r: &mut RequestApi| BodyApi {
            state: Rc::clone(&r.state),
        });

    engine
        .register_type_with_name::<HeadersApi>("Headers")
        .register_fn("add", HeadersApi::add)
        .register_fn("get", HeadersApi::get)
        .register_indexer_get(|h: &mut HeadersApi, name: &str| h.get(name));

    engine
        .register_type_with_name::<BodyApi>("Body")
        .register_get("raw", |b: &mut BodyApi| {
            b.state.borrow().body.clone().unwrap_or_default()
        })
        .register_fn("update", |b: &mut BodyApi, content: Dynamic| {
            b.state.borrow_mut().body = Some(content.to_string());
        });

    engine
        .register_type_with_name::<ResponseApi>("Response")
        .register_get("code", |r: &mut ResponseApi| {
            r.result.status.map(i64::from).unwrap_or(0)
        })
        .register_get("status", |r: &mut ResponseApi| {
            r.result.status_text.clone().unwrap_or_default()
        })
        .register_get("headers", |r: &mut ResponseApi| {
            r.result.headers.as_ref().map(to_rhai_map).unwrap_or_default()
        })
        .register_get("cookies", |r: &mut ResponseApi| {
            r.result
                .cookies
                .clone()
                .unwrap_or_default()
                .into_iter()
                .map(Dynamic::from)
                .collect::<rhai::Array>()
        })
        .register_get("responseTime", |r: &mut ResponseApi| {
            r.result.time.map(|t| t as i64).unwrap_or(0)
        })
        .register_fn("text", |r: &mut ResponseApi| {
            r.result.body.as_ref().map(|b| b.to_text()).unwrap_or_default()
        })
        .register_fn("json", |r: &mut ResponseApi| {
            r.result
                .body
                .as_ref()
                .and_then(|b| b.to_json())
                .map(|v| json_to_dynamic(&v))
                .unwrap_or(Dynamic::UNIT)
        })
        .register_get("to", |r: &mut ResponseApi| ResponseAssertions {
            result: Rc::clone(&r.result),
        });

    engine
        .register_type_with_name::<ResponseAssertions>("Assertions")
        .register_get("have", |a: &mut ResponseAssertions| a.clone())
        .register_get("be", |a: &mut ResponseAssertions| a.clone())
        .register_fn("status", ResponseAssertions::status)
        .register_fn("jsonBody", |a: &mut ResponseAssertions| {
            a.json_body().map(|_| ())
        })
        .register_fn("jsonBody", ResponseAssertions::json_body_with_key);
}
