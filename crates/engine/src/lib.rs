//! # Relay Engine
//!
//! Executes declaratively defined HTTP request pipelines: each endpoint is an
//! ordered list of steps, each step invoking a registered module with
//! parameters that may reference prior step outputs, request data, or
//! environment values through `${{ ... }}` template expressions.
//!
//! ## Architecture
//!
//! - **`registry`**: maps `namespace/name[@version]` references to module
//!   instances, with fallback to `latest` and prefix matching.
//! - **`resolve`**: evaluates bare dotted references and template strings
//!   against a per-request [`ExecutionContext`].
//! - **`executor`**: runs a step list in order, gating on conditions,
//!   resolving parameters, invoking modules, and aborting on first failure.
//! - **`context`**: per-request state: recorded step outputs, request
//!   accessors, the expression memo, and the response sink modules write to.
//!
//! The engine owns no wire format: an external host supplies request data and
//! converts the [`ResponseSink`] back into an HTTP response.

pub mod context;
pub mod executor;
pub mod module;
pub mod registry;
pub mod resolve;

pub use context::{ExecutionContext, ResponseSink};
pub use executor::{ExecutionOutcome, StepExecutor};
pub use module::{Module, ModuleParameters};
pub use registry::{ModuleRegistry, ResolveError};
pub use resolve::{interpolate, resolve_expression, truthy};
