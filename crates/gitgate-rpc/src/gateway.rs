//! Request dispatch: rate limiting, validation, invocation and error shaping.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::rate_limit::RateLimiter;
use crate::sanitize::{sanitize, strip_git_prefixes};
use crate::schema::ParamSchema;
use crate::validator::ParameterValidator;
use crate::wire::{Request, RequestId, Response};

/// Future returned by a registered handler.
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// A registered method implementation taking positional parameters.
pub type Handler = Arc<dyn Fn(Vec<Value>) -> HandlerFuture + Send + Sync>;

/// Dispatches requests to named handlers.
///
/// Handlers are registered up front; after that the gateway is shared
/// read-only (typically behind an `Arc`) and every request gets exactly one
/// [`Response`], whatever happens inside the handler.
pub struct RpcGateway {
    handlers: HashMap<String, Handler>,
    limiter: RateLimiter,
    validator: ParameterValidator,
    rate_limit_enabled: bool,
    validation_enabled: bool,
}

impl Default for RpcGateway {
    fn default() -> Self {
        Self::new(&GatewayConfig::default())
    }
}

impl RpcGateway {
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            handlers: HashMap::new(),
            limiter: RateLimiter::new(&config.rate_limit),
            validator: ParameterValidator::new(),
            rate_limit_enabled: config.rate_limit.enabled,
            validation_enabled: config.validation.enabled,
        }
    }

    /// Register `handler` under `method`, with an optional parameter schema.
    ///
    /// # Errors
    /// - `EmptyMethod` for an empty name
    /// - `AlreadyRegistered` if the name is taken
    /// - `InvalidSchema` if a schema pattern does not compile
    pub fn register<F, Fut>(
        &mut self,
        method: &str,
        handler: F,
        schema: Option<Vec<ParamSchema>>,
    ) -> Result<()>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        if method.is_empty() {
            return Err(GatewayError::EmptyMethod);
        }
        if self.handlers.contains_key(method) {
            return Err(GatewayError::AlreadyRegistered(method.to_string()));
        }
        if let Some(schema) = schema {
            self.validator.register(method, schema)?;
        }

        let handler: Handler = Arc::new(move |params| handler(params).boxed());
        self.handlers.insert(method.to_string(), handler);
        debug!(method, "registered");
        Ok(())
    }

    /// Registered method names, sorted.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    #[must_use]
    pub const fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Dispatch one request. Failures come back as `{id, error}`.
    pub async fn handle(&self, request: Request) -> Response {
        let Request { id, method, params } = request;
        debug!(%id, method = %method, params = params.len(), "dispatch");

        if self.rate_limit_enabled {
            if let Err(err) = self.limiter.check(&method) {
                warn!(method = %method, "rejected: {err}");
                return Response::failure(Some(id), err.to_string());
            }
        }

        let Some(handler) = self.handlers.get(&method) else {
            warn!(method = %method, "unknown method");
            return Response::failure(Some(id), format!("Unknown method: {method}"));
        };

        if self.validation_enabled {
            if let Err(err) = self.validator.validate(&method, &params) {
                warn!(method = %method, "invalid params: {err}");
                return Response::failure(Some(id), err.to_string());
            }
        }

        match AssertUnwindSafe(handler(params)).catch_unwind().await {
            Ok(Ok(result)) => Response::success(id, result),
            Ok(Err(err)) => {
                warn!(method = %method, "handler failed: {err:#}");
                Response::failure(Some(id), format_error(&err))
            }
            Err(_) => {
                warn!(method = %method, "handler panicked");
                Response::failure(Some(id), "Internal error")
            }
        }
    }

    /// Check a raw envelope, dispatch it and hand the sanitized response to
    /// `post`, which is called exactly once.
    pub async fn handle_request<P>(&self, raw: Value, post: P)
    where
        P: FnOnce(Response),
    {
        let mut response = match parse_envelope(raw) {
            Ok(request) => self.handle(request).await,
            Err(response) => {
                warn!(error = ?response.error, "malformed request");
                response
            }
        };

        response.error = response.error.map(|message| sanitize(&message));
        post(response);
    }
}

/// Render a handler error for the UI, without git's `fatal:`/`error:` noise.
#[must_use]
pub fn format_error(err: &anyhow::Error) -> String {
    strip_git_prefixes(&err.to_string())
}

fn parse_envelope(raw: Value) -> std::result::Result<Request, Response> {
    let Value::Object(mut envelope) = raw else {
        return Err(invalid(None, "expected an object"));
    };

    let id = match envelope.remove("id") {
        Some(Value::String(s)) => Some(RequestId::String(s)),
        Some(Value::Number(n)) => n.as_i64().map(RequestId::Number),
        _ => None,
    };

    let method = match envelope.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => return Err(invalid(id, "method must be a non-empty string")),
    };

    let Some(id) = id else {
        return Err(invalid(None, "id must be an integer or a string"));
    };

    let params = match envelope.remove("params") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(params)) => params,
        Some(_) => return Err(invalid(Some(id), "params must be an array")),
    };

    Ok(Request { id, method, params })
}

fn invalid(id: Option<RequestId>, reason: &str) -> Response {
    Response::failure(id, format!("Invalid request: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use anyhow::bail;
    use serde_json::json;
    use std::sync::Mutex;

    fn gateway() -> RpcGateway {
        let mut gateway = RpcGateway::default();
        gateway
            .register("echo", |params| async move { Ok(Value::Array(params)) }, None)
            .unwrap();
        gateway
            .register(
                "git.fail",
                |_| async { bail!("fatal: not a git repository: /home/alice/project") },
                None,
            )
            .unwrap();
        gateway
            .register(
                "typed",
                |_| async { Ok(Value::Null) },
                Some(vec![ParamSchema::string(), ParamSchema::number()]),
            )
            .unwrap();
        gateway
    }

    async fn post(gateway: &RpcGateway, raw: Value) -> Vec<Response> {
        let posted = Mutex::new(Vec::new());
        gateway
            .handle_request(raw, |resp| posted.lock().unwrap().push(resp))
            .await;
        posted.into_inner().unwrap()
    }

    #[tokio::test]
    async fn test_dispatches_positional_params() {
        let resp = gateway()
            .handle(Request::new(1, "echo", vec![json!("a"), json!(2)]))
            .await;
        assert_eq!(resp, Response::success(1.into(), json!(["a", 2])));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let resp = gateway().handle(Request::new("r1", "git.nope", vec![])).await;
        assert_eq!(resp.id, Some(RequestId::from("r1")));
        assert_eq!(resp.error.as_deref(), Some("Unknown method: git.nope"));
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let mut gateway = gateway();
        let err = gateway
            .register("echo", |_| async { Ok(Value::Null) }, None)
            .unwrap_err();
        assert_eq!(err.to_string(), "Handler already registered for method: echo");
    }

    #[tokio::test]
    async fn test_empty_method_is_rejected() {
        let mut gateway = RpcGateway::default();
        assert!(matches!(
            gateway.register("", |_| async { Ok(Value::Null) }, None),
            Err(GatewayError::EmptyMethod)
        ));
    }

    #[tokio::test]
    async fn test_validation_runs_before_handler() {
        let resp = gateway()
            .handle(Request::new(1, "typed", vec![json!("a"), json!("b")]))
            .await;
        assert_eq!(
            resp.error.as_deref(),
            Some("Parameter 1: expected number, got string")
        );
    }

    #[tokio::test]
    async fn test_validation_can_be_disabled() {
        let mut config = GatewayConfig::default();
        config.validation.enabled = false;
        let mut gateway = RpcGateway::new(&config);
        gateway
            .register("typed", |_| async { Ok(json!(true)) }, Some(vec![ParamSchema::number()]))
            .unwrap();

        let resp = gateway.handle(Request::new(1, "typed", vec![])).await;
        assert_eq!(resp.result, Some(json!(true)));
    }

    #[tokio::test]
    async fn test_handler_error_loses_git_prefix() {
        let resp = gateway().handle(Request::new(1, "git.fail", vec![])).await;
        assert_eq!(
            resp.error.as_deref(),
            Some("not a git repository: /home/alice/project")
        );
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_error() {
        let mut gateway = RpcGateway::default();
        gateway
            .register(
                "boom",
                |_| async {
                    if true {
                        panic!("boom");
                    }
                    Ok(Value::Null)
                },
                None,
            )
            .unwrap();

        let resp = gateway.handle(Request::new(1, "boom", vec![])).await;
        assert_eq!(resp.error.as_deref(), Some("Internal error"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_counts_failed_calls() {
        let config = GatewayConfig {
            rate_limit: RateLimitConfig {
                max_requests: 2,
                window_ms: 1000,
                ..RateLimitConfig::default()
            },
            ..GatewayConfig::default()
        };
        let mut gateway = RpcGateway::new(&config);
        gateway
            .register("typed", |_| async { Ok(Value::Null) }, Some(vec![ParamSchema::string()]))
            .unwrap();

        for _ in 0..2 {
            let resp = gateway.handle(Request::new(1, "typed", vec![])).await;
            assert!(resp.error.unwrap().starts_with("Expected at least"));
        }
        let resp = gateway.handle(Request::new(1, "typed", vec![json!("ok")])).await;
        assert_eq!(resp.error.as_deref(), Some("Rate limit exceeded for typed"));
        assert_eq!(gateway.rate_limiter().stats("typed").count, 2);
    }

    #[tokio::test]
    async fn test_handle_request_sanitizes_and_posts_once() {
        let posted = post(&gateway(), json!({"id": 3, "method": "git.fail", "params": []})).await;

        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].id, Some(RequestId::Number(3)));
        assert_eq!(
            posted[0].error.as_deref(),
            Some("not a git repository: ~/project")
        );
    }

    #[tokio::test]
    async fn test_handle_request_rejects_bad_envelopes() {
        let gateway = gateway();

        let posted = post(&gateway, json!({"id": 1, "params": []})).await;
        assert_eq!(
            posted[0].error.as_deref(),
            Some("Invalid request: method must be a non-empty string")
        );
        assert_eq!(posted[0].id, Some(RequestId::Number(1)));

        let posted = post(&gateway, json!({"id": 1, "method": "echo", "params": {}})).await;
        assert_eq!(
            posted[0].error.as_deref(),
            Some("Invalid request: params must be an array")
        );

        let posted = post(&gateway, json!({"method": "echo"})).await;
        assert_eq!(posted[0].id, None);
        assert!(posted[0].is_error());

        let posted = post(&gateway, json!("not an object")).await;
        assert_eq!(posted.len(), 1);
        assert!(posted[0].is_error());
    }

    #[tokio::test]
    async fn test_methods_are_sorted() {
        assert_eq!(gateway().methods(), vec!["echo", "git.fail", "typed"]);
    }

    #[test]
    fn test_format_error() {
        let err = anyhow::anyhow!("error: could not apply abc... msg");
        assert_eq!(format_error(&err), "could not apply abc... msg");
    }
}
