//! Ordered step-list execution: condition gating, parameter resolution,
//! module invocation, and first-failure abort.
//!
//! Steps run strictly sequentially because later steps may reference earlier
//! outputs through the expression resolver, and the abort policy requires a
//! deterministic stopping point. Each module invocation is awaited fully
//! before the next step's condition is evaluated; no timeout or cancellation
//! exists at this layer.

use std::sync::Arc;

use indexmap::IndexMap;
use relay_types::StepSpec;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::context::ExecutionContext;
use crate::module::ModuleParameters;
use crate::registry::ModuleRegistry;
use crate::resolve::{contains_template, resolve_expression, truthy};

/// Terminal state of one step-list execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Every step finished or was skipped.
    Completed,
    /// A step failed; no later steps ran. Prior recorded outputs remain.
    Aborted {
        /// Name of the step that failed.
        step: String,
        /// Error text surfaced in the terminal response payload.
        error: String,
    },
}

/// Executes endpoint step lists against per-request contexts.
pub struct StepExecutor {
    registry: Arc<ModuleRegistry>,
}

impl StepExecutor {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }

    /// Runs `steps` in list order against `context`.
    ///
    /// Per step: a falsy condition skips it (no output recorded, not a
    /// failure); a registry resolution failure, a raised module error, or an
    /// explicit `success == false` output aborts the whole execution and
    /// writes one terminal error payload to the response sink. Successful
    /// outputs are recorded under the step's name for later references.
    pub async fn execute(&self, steps: &[StepSpec], context: &mut ExecutionContext) -> ExecutionOutcome {
        for (index, step) in steps.iter().enumerate() {
            if let Some(condition) = step.r#if.as_deref().filter(|c| !c.is_empty()) {
                let resolved = resolve_expression(condition, context);
                if !truthy(resolved.as_ref()) {
                    info!(step = %step.name, %condition, "skipping step: condition is falsy");
                    continue;
                }
            }

            info!(step = %step.name, number = index + 1, uses = %step.uses, "executing step");

            let module = match self.registry.resolve(&step.uses) {
                Ok(module) => module,
                Err(resolve_error) => return abort(context, &step.name, resolve_error.to_string()),
            };

            let parameters = resolve_parameters(&step.with, context);

            let failure = match module.execute(&parameters, context).await {
                Ok(output) if output.success => {
                    context.record_output(&step.name, output);
                    None
                }
                Ok(output) => Some(
                    output
                        .error
                        .unwrap_or_else(|| format!("module '{}' reported failure", step.uses)),
                ),
                Err(invocation_error) => Some(format!("{invocation_error:#}")),
            };

            if let Some(message) = failure {
                return abort(context, &step.name, message);
            }
        }

        ExecutionOutcome::Completed
    }
}

/// Resolves template-bearing string parameters through the expression
/// resolver; all other values pass through unchanged.
fn resolve_parameters(with: &IndexMap<String, Value>, context: &ExecutionContext) -> ModuleParameters {
    with.iter()
        .map(|(key, value)| {
            let resolved = match value {
                Value::String(text) if contains_template(text) => {
                    resolve_expression(text, context).unwrap_or(Value::Null)
                }
                other => other.clone(),
            };
            (key.clone(), resolved)
        })
        .collect()
}

/// Emits the terminal failure signal to the response surface exactly once and
/// stops the execution. Already-recorded outputs are kept: partial completion
/// is the accepted failure state.
fn abort(context: &mut ExecutionContext, step: &str, message: String) -> ExecutionOutcome {
    error!(step = %step, error = %message, "step failed, aborting execution");

    let sink = context.response_mut();
    sink.set_status(500);
    sink.set_content_type("application/json");
    sink.set_body(json!({ "error": format!("Step execution failed: {message}") }).to_string());

    ExecutionOutcome::Aborted {
        step: step.to_string(),
        error: message,
    }
}
