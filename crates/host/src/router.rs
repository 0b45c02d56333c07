//! Dynamic endpoint registration and the HTTP ⇄ engine bridge.
//!
//! Each endpoint in the specification becomes one axum route. Per request the
//! handler gathers path parameters, query parameters, and headers, pre-parses
//! a JSON request body when present, builds an execution context, runs the
//! step executor, and converts the resulting response sink back into an HTTP
//! response.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, on};
use relay_engine::{ExecutionContext, ResponseSink, StepExecutor};
use relay_types::{ApiSpec, StepSpec};
use serde_json::Value;
use tracing::info;

/// Builds a router with one route per endpoint in the specification.
///
/// Fails when the specification names an HTTP method the host does not
/// support.
pub fn build_router(spec: &ApiSpec, executor: Arc<StepExecutor>) -> Result<Router> {
    let mut router = Router::new();

    for endpoint in &spec.endpoints {
        let filter = method_filter(&endpoint.method)?;
        let steps: Arc<[StepSpec]> = endpoint.steps.clone().into();
        let executor = Arc::clone(&executor);

        info!(method = %endpoint.method, path = %endpoint.path, "registering endpoint");

        let handler = move |Path(path_params): Path<HashMap<String, String>>,
                            Query(query_params): Query<HashMap<String, String>>,
                            headers: HeaderMap,
                            body: Bytes| {
            let steps = Arc::clone(&steps);
            let executor = Arc::clone(&executor);
            async move { handle_request(executor, &steps, path_params, query_params, headers, body).await }
        };

        router = router.route(&endpoint.path, on(filter, handler));
    }

    Ok(router)
}

/// Binds the address and serves the router until interrupted. Ctrl-C drains
/// in-flight requests before the task returns.
pub async fn serve(addr: &str, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "relay listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        // Without a handler the server can only run until killed; resolving
        // here would shut it down immediately.
        tracing::warn!(%error, "failed to install shutdown handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, draining connections");
}

async fn handle_request(
    executor: Arc<StepExecutor>,
    steps: &[StepSpec],
    path_params: HashMap<String, String>,
    query_params: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut context = ExecutionContext::new()
        .with_path_params(path_params)
        .with_query_params(query_params)
        .with_headers(header_pairs(&headers));

    if let Some(parsed) = parse_json_body(&headers, &body) {
        context = context.with_body(parsed);
    }

    let outcome = executor.execute(steps, &mut context).await;
    tracing::debug!(?outcome, "pipeline finished");

    sink_into_response(context.into_response_sink())
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|text| (name.as_str().to_string(), text.to_string()))
        })
        .collect()
}

/// Pre-parses a JSON request body so steps can reference `request.body`.
/// Malformed JSON is attached as raw text; non-JSON content types are left
/// unparsed.
fn parse_json_body(headers: &HeaderMap, body: &Bytes) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    if !content_type.contains("application/json") {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(body).into_owned())),
    }
}

/// Converts the engine's response surface into an HTTP response. An untouched
/// sink yields an empty 200 so endpoints whose steps produce no response
/// content still answer.
fn sink_into_response(sink: ResponseSink) -> Response {
    let status = sink
        .status()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = sink.content_type() {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    for (name, value) in sink.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Body::from(sink.into_body()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn method_filter(method: &str) -> Result<MethodFilter> {
    Ok(match method.to_ascii_uppercase().as_str() {
        "GET" => MethodFilter::GET,
        "POST" => MethodFilter::POST,
        "PUT" => MethodFilter::PUT,
        "PATCH" => MethodFilter::PATCH,
        "DELETE" => MethodFilter::DELETE,
        "HEAD" => MethodFilter::HEAD,
        other => bail!("unsupported HTTP method in spec: {other}"),
    })
}
