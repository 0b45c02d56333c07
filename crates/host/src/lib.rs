//! HTTP hosting for relay specifications.
//!
//! The host owns everything the engine treats as external collaborators: spec
//! file loading and deserialization, dynamic endpoint registration, request
//! body pre-parsing, and the conversion between HTTP requests/responses and
//! the engine's [`relay_engine::ExecutionContext`] / `ResponseSink`.

pub mod router;
pub mod spec_file;

pub use router::{build_router, serve};
pub use spec_file::load_spec;
