//! Response formatter module: writes status, content type, headers, and body
//! to the execution context's response surface.

use anyhow::Result;
use async_trait::async_trait;
use relay_engine::{ExecutionContext, Module, ModuleParameters};
use relay_types::StepOutput;
use serde_json::{Value, json};

const DEFAULT_STATUS: u16 = 200;
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Formats and writes the endpoint's HTTP response as a side effect.
///
/// Parameters: `statusCode` (default 200), `contentType` (default
/// `application/json`), `headers` (object of header name/value pairs), and
/// `body`. With a JSON content type a missing body becomes `{}` and
/// non-string bodies serialize to JSON text; otherwise the body is rendered
/// as plain text.
#[derive(Debug, Default)]
pub struct ResponseFormatterModule;

#[async_trait]
impl Module for ResponseFormatterModule {
    fn name(&self) -> &str {
        "relay.modules/response-formatter"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn execute(&self, parameters: &ModuleParameters, context: &mut ExecutionContext) -> Result<StepOutput> {
        let status = match parameters.get("statusCode") {
            Some(Value::Number(number)) => number
                .as_u64()
                .and_then(|value| u16::try_from(value).ok())
                .unwrap_or(DEFAULT_STATUS),
            Some(Value::String(text)) => text.parse().unwrap_or(DEFAULT_STATUS),
            _ => DEFAULT_STATUS,
        };

        let content_type = parameters
            .get("contentType")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let body = format_body(parameters.get("body"), &content_type);

        let sink = context.response_mut();
        sink.set_status(status);
        sink.set_content_type(&content_type);
        if let Some(Value::Object(headers)) = parameters.get("headers") {
            for (name, value) in headers {
                sink.insert_header(name, header_text(value));
            }
        }
        sink.write_str(&body);

        Ok(StepOutput::ok(json!({ "status": status, "body": body })))
    }
}

fn format_body(body: Option<&Value>, content_type: &str) -> String {
    if content_type == DEFAULT_CONTENT_TYPE {
        match body {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => "{}".to_string(),
            Some(other) => other.to_string(),
        }
    } else {
        match body {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

fn header_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn run(parameters: ModuleParameters) -> (StepOutput, ExecutionContext) {
        let mut context = ExecutionContext::new();
        let output = ResponseFormatterModule
            .execute(&parameters, &mut context)
            .await
            .expect("formatter never fails");
        (output, context)
    }

    fn parameters(entries: &[(&str, Value)]) -> ModuleParameters {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn applies_defaults_without_parameters() {
        let (output, context) = run(ModuleParameters::new()).await;

        let sink = context.response();
        assert_eq!(sink.status(), Some(200));
        assert_eq!(sink.content_type(), Some("application/json"));
        assert_eq!(sink.body(), "{}");
        assert_eq!(output.data, json!({ "status": 200, "body": "{}" }));
    }

    #[tokio::test]
    async fn writes_explicit_status_headers_and_body() {
        let (_, context) = run(parameters(&[
            ("statusCode", json!(404)),
            ("body", json!("not here")),
            ("headers", json!({ "X-Reason": "missing", "X-Retry": 3 })),
        ]))
        .await;

        let sink = context.response();
        assert_eq!(sink.status(), Some(404));
        assert_eq!(sink.body(), "not here");
        assert!(sink.headers().contains(&("X-Reason".to_string(), "missing".to_string())));
        assert!(sink.headers().contains(&("X-Retry".to_string(), "3".to_string())));
    }

    #[tokio::test]
    async fn serializes_structured_json_bodies() {
        let (_, context) = run(parameters(&[("body", json!({ "ok": true }))])).await;

        assert_eq!(context.response().body(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn plain_text_content_type_renders_body_verbatim() {
        let (_, context) = run(parameters(&[
            ("contentType", json!("text/plain")),
            ("body", json!("hello")),
        ]))
        .await;

        let sink = context.response();
        assert_eq!(sink.content_type(), Some("text/plain"));
        assert_eq!(sink.body(), "hello");
    }

    #[tokio::test]
    async fn missing_body_with_plain_text_is_empty() {
        let (_, context) = run(parameters(&[("contentType", json!("text/plain"))])).await;

        assert_eq!(context.response().body(), "");
    }

    #[tokio::test]
    async fn string_status_code_is_parsed() {
        let (_, context) = run(parameters(&[("statusCode", json!("418"))])).await;

        assert_eq!(context.response().status(), Some(418));
    }
}
