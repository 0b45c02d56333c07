//! Validation helpers applied to a loaded specification before it is served.
//!
//! Step names double as lookup keys for `steps.<name>` references, so
//! duplicates within one endpoint are rejected here at load time; at run time
//! a collision would silently overwrite the earlier output.

use std::collections::HashSet;
use std::fmt;

use crate::spec::ApiSpec;

/// HTTP methods a specification may declare.
pub const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"];

/// A single problem discovered while validating a specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location of the problem, e.g. `endpoints[1].steps[0]`.
    pub location: String,
    /// Human-readable description of what is wrong.
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Collects every structural problem in the specification.
///
/// Returns an empty vector when the specification is well formed.
pub fn validate_spec(spec: &ApiSpec) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if spec.name.trim().is_empty() {
        issues.push(issue("name", "specification name must not be empty"));
    }

    for (endpoint_index, endpoint) in spec.endpoints.iter().enumerate() {
        let endpoint_location = format!("endpoints[{endpoint_index}]");

        if !endpoint.path.starts_with('/') {
            issues.push(issue(&endpoint_location, "endpoint path must start with '/'"));
        }

        let method = endpoint.method.to_ascii_uppercase();
        if !SUPPORTED_METHODS.contains(&method.as_str()) {
            issues.push(issue(
                &endpoint_location,
                format!("unsupported HTTP method '{}'", endpoint.method),
            ));
        }

        let mut seen_names = HashSet::new();
        for (step_index, step) in endpoint.steps.iter().enumerate() {
            let step_location = format!("{endpoint_location}.steps[{step_index}]");

            if step.name.trim().is_empty() {
                issues.push(issue(&step_location, "step name must not be empty"));
            }
            if step.uses.trim().is_empty() {
                issues.push(issue(&step_location, "step module reference must not be empty"));
            }
            if !seen_names.insert(step.name.clone()) {
                issues.push(issue(
                    &step_location,
                    format!("duplicate step name '{}' within endpoint", step.name),
                ));
            }
        }
    }

    issues
}

fn issue(location: &str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        location: location.to_string(),
        message: message.into(),
    }
}
