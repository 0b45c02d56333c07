//! Expression resolution: evaluates `${{ ... }}` template strings and bare
//! dotted references against a per-request [`ExecutionContext`].
//!
//! A **bare reference** is a dot-separated path whose first segment selects a
//! resolution domain:
//!
//! - `steps.<name>.data` — a recorded step output's data, verbatim
//! - `steps.<name>.<path>` — a nested path into that data
//! - `request.path.<key>` / `request.query.<key>` / `request.headers.<key>`
//! - `request.body[.<path>]` — the pre-parsed body attached by the host
//! - `config.<path>` — reserved; always resolves to null (known gap)
//! - `env.<name>` — process environment variable
//!
//! A **template** is any string containing `${{ ... }}` markers; each enclosed
//! bare reference is substituted into the surrounding literal text. Expression
//! problems never abort execution: malformed or unresolvable references
//! degrade to null (`None`) with a warning.

use serde_json::Value;
use tracing::warn;

use crate::context::ExecutionContext;

const TEMPLATE_OPEN: &str = "${{";
const TEMPLATE_CLOSE: &str = "}}";

/// True when the string carries at least one template marker.
pub fn contains_template(text: &str) -> bool {
    text.contains(TEMPLATE_OPEN)
}

/// Evaluates an expression against the context. `None` means null.
///
/// A string that is exactly one `${{ ... }}` marker resolves to the enclosed
/// reference's typed value, so conditions like `${{ steps.missing.data }}`
/// stay null rather than becoming placeholder text. A string mixing markers
/// with literal text resolves to the interpolated string. Anything else is
/// treated as a bare reference.
///
/// Results are memoized per context for the lifetime of the request.
pub fn resolve_expression(expression: &str, context: &ExecutionContext) -> Option<Value> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(memoized) = context.memo_get(trimmed) {
        return memoized;
    }

    let resolved = if let Some(inner) = single_template_expression(trimmed) {
        resolve_reference(inner, context)
    } else if contains_template(trimmed) {
        Some(Value::String(interpolate(trimmed, context)))
    } else {
        resolve_reference(trimmed, context)
    };

    context.memo_store(trimmed, resolved.clone());
    resolved
}

/// Substitutes every `${{ ... }}` occurrence in a template string.
///
/// String results insert verbatim, non-string non-null results serialize to
/// their canonical JSON text, and null inserts the `{}` placeholder. An
/// unterminated marker preserves the remaining text as-is.
pub fn interpolate(template: &str, context: &ExecutionContext) -> String {
    let mut output = String::new();
    let mut remainder = template;

    while let Some(start) = remainder.find(TEMPLATE_OPEN) {
        let (before, after) = remainder.split_at(start);
        output.push_str(before);

        let after_open = &after[TEMPLATE_OPEN.len()..];
        let Some(end) = after_open.find(TEMPLATE_CLOSE) else {
            output.push_str(after);
            return output;
        };

        let reference = after_open[..end].trim();
        output.push_str(&substitution_text(resolve_reference(reference, context)));
        remainder = &after_open[end + TEMPLATE_CLOSE.len()..];
    }

    output.push_str(remainder);
    output
}

/// Three-case truthiness used for step conditions: booleans pass through, a
/// string is truthy unless empty, `"false"` (case-insensitive), or `"0"`, any
/// other non-null value is truthy, and null is falsy.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => !text.is_empty() && !text.eq_ignore_ascii_case("false") && text != "0",
        Some(_) => true,
    }
}

/// Returns the inner bare reference when the whole string is a single
/// template marker with no surrounding literal text.
fn single_template_expression(expression: &str) -> Option<&str> {
    let inner = expression.strip_prefix(TEMPLATE_OPEN)?.strip_suffix(TEMPLATE_CLOSE)?.trim();
    if inner.is_empty() || inner.contains(TEMPLATE_OPEN) || inner.contains(TEMPLATE_CLOSE) {
        return None;
    }
    Some(inner)
}

fn substitution_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(text)) => text,
        Some(Value::Null) | None => "{}".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Resolves a bare dotted reference. The first segment selects the domain;
/// fewer than two segments or an unknown domain resolve to null with a
/// warning.
fn resolve_reference(reference: &str, context: &ExecutionContext) -> Option<Value> {
    let segments: Vec<&str> = reference.split('.').collect();
    if segments.len() < 2 {
        warn!(expression = %reference, "invalid expression: expected a domain and a path");
        return None;
    }

    match segments[0] {
        "steps" => resolve_step_reference(&segments[1..], context),
        "request" => resolve_request_reference(&segments[1..], context),
        "config" => {
            // Known gap: config resolution is not implemented yet.
            warn!(path = %reference, "config resolution not implemented");
            None
        }
        "env" => context.env_var(&segments[1..].join(".")).map(Value::String),
        other => {
            warn!(domain = %other, expression = %reference, "unknown resolution domain");
            None
        }
    }
}

fn resolve_step_reference(segments: &[&str], context: &ExecutionContext) -> Option<Value> {
    if segments.len() < 2 {
        return None;
    }

    let step_name = segments[0];
    let Some(output) = context.output(step_name) else {
        warn!(step = %step_name, "step not found in execution context");
        return None;
    };

    let rest = &segments[1..];
    if rest == ["data"] {
        return Some(output.data.clone());
    }

    // Tolerate an explicit leading `data` segment before the nested path.
    let path = if rest.first() == Some(&"data") { &rest[1..] } else { rest };
    navigate(&output.data, path)
}

fn resolve_request_reference(segments: &[&str], context: &ExecutionContext) -> Option<Value> {
    match segments[0] {
        "path" => segments
            .get(1)
            .and_then(|key| context.path_param(key))
            .map(|value| Value::String(value.to_string())),
        "query" => segments
            .get(1)
            .and_then(|key| context.query_param(key))
            .map(|value| Value::String(value.to_string())),
        "headers" => segments
            .get(1)
            .and_then(|key| context.header(key))
            .map(|value| Value::String(value.to_string())),
        "body" => {
            let body = context.body()?;
            if segments.len() == 1 {
                Some(body.clone())
            } else {
                navigate(body, &segments[1..])
            }
        }
        other => {
            warn!(part = %other, "unknown request accessor");
            None
        }
    }
}

/// Walks a dotted path into opaque structured data one segment at a time.
/// Object nodes look up the segment as a key, sequence nodes accept numeric
/// indices; absent keys, null nodes, and scalars with path remaining all
/// short-circuit to `None`. Navigation never panics.
fn navigate(root: &Value, segments: &[&str]) -> Option<Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
        if current.is_null() {
            return None;
        }
    }
    Some(current.clone())
}
