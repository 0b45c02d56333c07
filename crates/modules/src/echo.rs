//! Echo module: returns a value from its parameters.

use anyhow::Result;
use async_trait::async_trait;
use relay_engine::{ExecutionContext, Module, ModuleParameters};
use relay_types::StepOutput;
use serde_json::Value;

const DEFAULT_MESSAGE: &str = "Hello, World!";

/// Returns `with.message` as its data, defaulting to a friendly greeting.
/// Always succeeds.
#[derive(Debug, Default)]
pub struct EchoModule;

#[async_trait]
impl Module for EchoModule {
    fn name(&self) -> &str {
        "relay.modules/echo"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn execute(&self, parameters: &ModuleParameters, _context: &mut ExecutionContext) -> Result<StepOutput> {
        let message = match parameters.get("message") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => DEFAULT_MESSAGE.to_string(),
            Some(other) => other.to_string(),
        };
        Ok(StepOutput::ok(message))
    }
}
