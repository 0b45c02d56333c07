//! Strongly typed specification schema: an API is a list of endpoints, each an
//! ordered list of steps executed by named, versioned modules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Top-level API specification loaded from a spec file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSpec {
    /// Human-readable name of the API.
    pub name: String,
    /// Optional descriptive copy.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional version tag for the specification document itself.
    #[serde(default)]
    pub version: Option<String>,
    /// Ordered endpoint declarations registered with the host router.
    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,
}

/// One HTTP endpoint: a route pattern, a method, and an ordered step list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointSpec {
    /// Route pattern, e.g. `/hello/{name}`.
    pub path: String,
    /// HTTP method, e.g. `GET`. Matched case-insensitively.
    pub method: String,
    /// Optional descriptive copy surfaced in startup logs.
    #[serde(default)]
    pub description: Option<String>,
    /// Steps executed sequentially for each matching request.
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// One unit of pipeline work: a module reference, an optional condition, and a
/// parameter map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSpec {
    /// Unique name within the endpoint's step list; later steps reference this
    /// step's output via `steps.<name>`.
    pub name: String,
    /// Module reference in the form `namespace/name[@version]`.
    pub uses: String,
    /// Optional conditional expression; when it resolves falsy the step is
    /// skipped without recording an output.
    #[serde(default, rename = "if")]
    pub r#if: Option<String>,
    /// Named parameters handed to the module after template resolution.
    #[serde(default = "default_parameter_map")]
    pub with: IndexMap<String, JsonValue>,
}

/// Result of one module invocation. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StepOutput {
    /// Whether the step succeeded. A false value aborts the pipeline.
    pub success: bool,
    /// Opaque structured-or-scalar payload available to later steps.
    #[serde(default)]
    pub data: JsonValue,
    /// Error message reported by the module on failure.
    #[serde(default)]
    pub error: Option<String>,
}

impl StepOutput {
    /// Successful output carrying `data`.
    pub fn ok(data: impl Into<JsonValue>) -> Self {
        Self {
            success: true,
            data: data.into(),
            error: None,
        }
    }

    /// Explicit module-reported failure with an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: JsonValue::Null,
            error: Some(message.into()),
        }
    }
}

fn default_parameter_map() -> IndexMap<String, JsonValue> {
    IndexMap::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_basic_spec() {
        let yaml_text = r#"
name: demo-api
version: 1.0.0
endpoints:
  - path: /hello/{name}
    method: GET
    steps:
      - name: greet
        uses: relay.modules/echo
        with:
          message: "Hello, ${{ request.path.name }}!"
      - name: respond
        uses: relay.modules/response-formatter
        if: "${{ steps.greet.data }}"
        with:
          statusCode: 200
          body: "${{ steps.greet.data }}"
"#;

        let spec: ApiSpec = serde_yaml::from_str(yaml_text).expect("deserialize spec");

        assert_eq!(spec.name, "demo-api");
        assert_eq!(spec.endpoints.len(), 1);
        let endpoint = &spec.endpoints[0];
        assert_eq!(endpoint.method, "GET");
        assert_eq!(endpoint.steps.len(), 2);
        assert_eq!(endpoint.steps[0].name, "greet");
        assert!(endpoint.steps[0].r#if.is_none());
        assert_eq!(endpoint.steps[1].r#if.as_deref(), Some("${{ steps.greet.data }}"));
        assert_eq!(endpoint.steps[1].with["statusCode"], 200);
    }

    #[test]
    fn repository_sample_spec_parses() {
        let yaml_text = include_str!("../../../samples/echo_api.yaml");
        let spec: ApiSpec = serde_yaml::from_str(yaml_text).expect("parse sample spec");
        assert_eq!(spec.name, "echo-api");
        assert_eq!(spec.endpoints.len(), 2);
        assert!(spec.endpoints.iter().all(|endpoint| !endpoint.steps.is_empty()));
    }

    #[test]
    fn step_output_constructors() {
        let ok = StepOutput::ok("hi");
        assert!(ok.success);
        assert_eq!(ok.data, JsonValue::String("hi".into()));
        assert!(ok.error.is_none());

        let failed = StepOutput::failure("boom");
        assert!(!failed.success);
        assert_eq!(failed.data, JsonValue::Null);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
