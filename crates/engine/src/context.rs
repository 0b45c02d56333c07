//! Per-request execution state.
//!
//! An [`ExecutionContext`] lives for exactly one HTTP request: it is created
//! at request entry, owned by the task handling that request, and discarded
//! when the response completes. Nothing in here is shared across requests,
//! including the expression memo.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use relay_types::StepOutput;
use serde_json::Value;

/// Per-request mutable state accumulating step outputs and exposing request
/// data to the expression resolver and to modules.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    path_params: HashMap<String, String>,
    query_params: HashMap<String, String>,
    /// Header names are stored lowercased; lookups are case-insensitive.
    headers: HashMap<String, String>,
    /// Pre-parsed request body attached by the host. The resolver itself
    /// never parses bodies.
    body: Option<Value>,
    /// Recorded step outputs keyed by step name. A name collision silently
    /// overwrites the earlier output.
    outputs: HashMap<String, StepOutput>,
    response: ResponseSink,
    /// Expression memo: the same expression evaluated repeatedly against this
    /// context returns the memoized value. Cleared whenever a step output is
    /// recorded so later steps observe fresh values.
    memo: Mutex<HashMap<String, Option<Value>>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_params(mut self, params: HashMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    pub fn with_query_params(mut self, params: HashMap<String, String>) -> Self {
        self.query_params = params;
        self
    }

    /// Attaches request headers; names are lowercased for lookup.
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        self
    }

    /// Attaches a pre-parsed request body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn path_param(&self, key: &str) -> Option<&str> {
        self.path_params.get(key).map(String::as_str)
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Process environment lookup for `env.<name>` references.
    pub fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    /// The recorded output of a completed step, if any.
    pub fn output(&self, step_name: &str) -> Option<&StepOutput> {
        self.outputs.get(step_name)
    }

    /// All recorded step outputs, keyed by step name.
    pub fn outputs(&self) -> &HashMap<String, StepOutput> {
        &self.outputs
    }

    /// Records a step's output under its name, overwriting any prior entry,
    /// and invalidates the expression memo.
    pub fn record_output(&mut self, step_name: &str, output: StepOutput) {
        self.outputs.insert(step_name.to_string(), output);
        self.memo.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn response(&self) -> &ResponseSink {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseSink {
        &mut self.response
    }

    /// Consumes the context, yielding the response surface for the host to
    /// convert into an HTTP response.
    pub fn into_response_sink(self) -> ResponseSink {
        self.response
    }

    pub(crate) fn memo_get(&self, expression: &str) -> Option<Option<Value>> {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(expression)
            .cloned()
    }

    pub(crate) fn memo_store(&self, expression: &str, value: Option<Value>) {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(expression.to_string(), value);
    }
}

/// Observable response surface: modules write response content here as a side
/// effect, and the executor writes the terminal error payload on abort.
#[derive(Debug, Default)]
pub struct ResponseSink {
    status: Option<u16>,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    body: String,
    touched: bool,
}

impl ResponseSink {
    pub fn set_status(&mut self, status: u16) {
        self.status = Some(status);
        self.touched = true;
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
        self.touched = true;
    }

    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
        self.touched = true;
    }

    /// Appends a chunk to the response body.
    pub fn write_str(&mut self, chunk: &str) {
        self.body.push_str(chunk);
        self.touched = true;
    }

    /// Replaces the response body. Used by the executor's terminal error
    /// signal so the error payload is well formed even after partial writes.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.touched = true;
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// True once anything wrote to this sink.
    pub fn is_touched(&self) -> bool {
        self.touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let context = ExecutionContext::new().with_headers(vec![("X-Request-Id".to_string(), "abc".to_string())]);

        assert_eq!(context.header("x-request-id"), Some("abc"));
        assert_eq!(context.header("X-REQUEST-ID"), Some("abc"));
        assert_eq!(context.header("x-other"), None);
    }

    #[test]
    fn record_output_overwrites_silently() {
        let mut context = ExecutionContext::new();
        context.record_output("step", StepOutput::ok(json!("first")));
        context.record_output("step", StepOutput::ok(json!("second")));

        assert_eq!(context.output("step").map(|o| &o.data), Some(&json!("second")));
        assert_eq!(context.outputs().len(), 1);
    }

    #[test]
    fn record_output_invalidates_memo() {
        let mut context = ExecutionContext::new();
        context.memo_store("steps.step.data", Some(json!("stale")));
        assert!(context.memo_get("steps.step.data").is_some());

        context.record_output("step", StepOutput::ok(json!("fresh")));

        assert!(context.memo_get("steps.step.data").is_none());
    }

    #[test]
    fn sink_tracks_touched_state() {
        let mut sink = ResponseSink::default();
        assert!(!sink.is_touched());

        sink.write_str("hello");
        assert!(sink.is_touched());
        assert_eq!(sink.body(), "hello");

        sink.write_str(" world");
        assert_eq!(sink.body(), "hello world");

        sink.set_body("replaced");
        assert_eq!(sink.into_body(), "replaced");
    }
}
