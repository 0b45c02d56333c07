//! The capability contract every pipeline step handler implements.

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use relay_types::StepOutput;
use serde_json::Value;

use crate::context::ExecutionContext;

/// Resolved parameters handed to a module, in authoring order.
pub type ModuleParameters = IndexMap<String, Value>;

/// A named, versioned handler capable of executing one pipeline step.
///
/// Implementations must not assume prior steps exist and must be safe to
/// invoke with an empty parameter map. Failure is signaled either by an
/// explicit [`StepOutput`] with `success == false` or by returning `Err`;
/// the executor treats both identically and aborts the pipeline.
#[async_trait]
pub trait Module: Send + Sync {
    /// Registry key component in the form `namespace/name`. Non-empty.
    fn name(&self) -> &str;

    /// Registry key component, e.g. `1.0.0`. Non-empty.
    fn version(&self) -> &str;

    /// Executes one step with resolved parameters against the shared context.
    ///
    /// Modules may write response content through
    /// [`ExecutionContext::response_mut`] as a side effect.
    async fn execute(&self, parameters: &ModuleParameters, context: &mut ExecutionContext) -> Result<StepOutput>;
}
