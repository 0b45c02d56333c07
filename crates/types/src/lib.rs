//! Shared type definitions for relay specifications.
//!
//! The models defined here are consumed by the engine, the built-in modules,
//! the HTTP host, and the CLI. Step parameter maps intentionally preserve
//! authoring order (via `IndexMap`) so modules receive parameters in the
//! sequence the author wrote them.

pub mod spec;
pub mod validation;

pub use spec::{ApiSpec, EndpointSpec, StepOutput, StepSpec};
pub use validation::{ValidationIssue, validate_spec};
