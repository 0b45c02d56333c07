//! Maps module references to handler instances.
//!
//! References take the form `namespace/name[@version]`; the version defaults
//! to the `latest` sentinel. Registration binds a module under both its
//! versioned key and `@latest`, so unpinned references resolve to whatever was
//! registered most recently for that name.

use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::module::Module;

/// Version sentinel bound automatically at registration time and assumed for
/// references without an explicit `@version` pin.
pub const LATEST_VERSION: &str = "latest";

/// Failure to map a module reference to exactly one handler.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No registered key matched the reference, even by prefix.
    #[error("module not found: {reference}")]
    NotFound { reference: String },
    /// The reference prefix-matched more than one distinct module. Ambiguity
    /// is surfaced rather than silently picking a candidate.
    #[error("module reference '{reference}' is ambiguous; candidates: {}", candidates.join(", "))]
    Ambiguous { reference: String, candidates: Vec<String> },
}

/// Read-mostly shared registry of modules keyed by `name@version`.
///
/// Built once at startup and read concurrently by many requests; the interior
/// lock keeps overwrite-on-register legal after traffic starts.
#[derive(Default)]
pub struct ModuleRegistry {
    bindings: RwLock<IndexMap<String, Arc<dyn Module>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from an initial set of modules.
    pub fn with_modules(modules: impl IntoIterator<Item = Arc<dyn Module>>) -> Self {
        let registry = Self::new();
        for module in modules {
            registry.register(module);
        }
        registry
    }

    /// Stores the module under `{name}@{version}` and `{name}@latest`,
    /// overwriting any prior binding with a warning. Re-registration is legal
    /// and expected when one module is bound under multiple logical names.
    pub fn register(&self, module: Arc<dyn Module>) {
        let versioned_key = format!("{}@{}", module.name(), module.version());
        let latest_key = format!("{}@{}", module.name(), LATEST_VERSION);

        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        if bindings.contains_key(&versioned_key) {
            warn!(key = %versioned_key, "module already registered, overwriting");
        }
        info!(module = %module.name(), version = %module.version(), "registered module");
        bindings.insert(versioned_key, Arc::clone(&module));
        bindings.insert(latest_key, module);
    }

    /// Resolves a reference to one concrete module.
    ///
    /// Lookup order: exact `{id}@{version}` match, then `{id}@latest` when a
    /// pinned version is missing (unresolvable specific versions silently
    /// degrade to latest, with a warning), then a prefix scan for callers who
    /// passed a bare or partial id. A prefix scan matching more than one
    /// distinct module is an error, not a silent first match.
    pub fn resolve(&self, reference: &str) -> Result<Arc<dyn Module>, ResolveError> {
        let (module_id, version) = split_reference(reference);
        let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(module) = bindings.get(&format!("{module_id}@{version}")) {
            return Ok(Arc::clone(module));
        }

        if version != LATEST_VERSION
            && let Some(module) = bindings.get(&format!("{module_id}@{LATEST_VERSION}"))
        {
            warn!(module = %module_id, %version, "requested version not found, using latest");
            return Ok(Arc::clone(module));
        }

        let matching: Vec<(&String, &Arc<dyn Module>)> =
            bindings.iter().filter(|(key, _)| key.starts_with(module_id)).collect();

        let mut distinct: Vec<&Arc<dyn Module>> = Vec::new();
        for (_, module) in &matching {
            if !distinct.iter().any(|candidate| Arc::ptr_eq(candidate, module)) {
                distinct.push(module);
            }
        }

        match distinct.len() {
            0 => Err(ResolveError::NotFound {
                reference: reference.to_string(),
            }),
            1 => {
                info!(reference = %reference, key = %matching[0].0, "resolved module by prefix");
                Ok(Arc::clone(distinct[0]))
            }
            _ => {
                let mut candidates: Vec<String> = matching.iter().map(|(key, _)| (*key).clone()).collect();
                candidates.sort();
                Err(ResolveError::Ambiguous {
                    reference: reference.to_string(),
                    candidates,
                })
            }
        }
    }
}

/// Splits `namespace/name[@version]` into `(id, version)`, defaulting the
/// version to [`LATEST_VERSION`].
fn split_reference(reference: &str) -> (&str, &str) {
    match reference.split_once('@') {
        Some((id, version)) if !version.is_empty() => (id, version),
        Some((id, _)) => (id, LATEST_VERSION),
        None => (reference, LATEST_VERSION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::module::ModuleParameters;
    use anyhow::Result;
    use async_trait::async_trait;
    use relay_types::StepOutput;

    struct NamedModule {
        name: &'static str,
        version: &'static str,
    }

    #[async_trait]
    impl Module for NamedModule {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            self.version
        }

        async fn execute(&self, _parameters: &ModuleParameters, _context: &mut ExecutionContext) -> Result<StepOutput> {
            Ok(StepOutput::ok(self.name))
        }
    }

    fn module(name: &'static str, version: &'static str) -> Arc<dyn Module> {
        Arc::new(NamedModule { name, version })
    }

    #[test]
    fn resolves_exact_versioned_reference() {
        let registry = ModuleRegistry::with_modules(vec![module("m/a", "1.0.0")]);

        let resolved = registry.resolve("m/a@1.0.0").expect("resolve pinned");
        assert_eq!(resolved.name(), "m/a");
    }

    #[test]
    fn unversioned_reference_falls_back_to_latest_registration() {
        let registry = ModuleRegistry::with_modules(vec![module("m/a", "1.0.0")]);

        let resolved = registry.resolve("m/a").expect("resolve unversioned");
        assert_eq!(resolved.version(), "1.0.0");
    }

    #[test]
    fn missing_pinned_version_degrades_to_latest() {
        let registry = ModuleRegistry::with_modules(vec![module("m/a", "1.0.0")]);

        let resolved = registry.resolve("m/a@9.9.9").expect("degrade to latest");
        assert_eq!(resolved.version(), "1.0.0");
    }

    #[test]
    fn partial_reference_resolves_when_unambiguous() {
        let registry = ModuleRegistry::with_modules(vec![module("acme/echo", "1.0.0")]);

        let resolved = registry.resolve("acme").expect("prefix match");
        assert_eq!(resolved.name(), "acme/echo");
    }

    #[test]
    fn ambiguous_prefix_is_an_error_not_a_silent_pick() {
        let registry = ModuleRegistry::with_modules(vec![module("acme/echo", "1.0.0"), module("acme/format", "1.0.0")]);

        let error = registry.resolve("acme").map(|module| module.name().to_string()).expect_err("ambiguous prefix");
        match error {
            ResolveError::Ambiguous { reference, candidates } => {
                assert_eq!(reference, "acme");
                assert!(candidates.len() > 1);
            }
            other => panic!("expected ambiguous error, got: {other}"),
        }
    }

    #[test]
    fn unknown_reference_reports_not_found_with_original_reference() {
        let registry = ModuleRegistry::new();

        let error = registry
            .resolve("ghost/module@2.0.0")
            .map(|module| module.name().to_string())
            .expect_err("not found");
        assert!(error.to_string().contains("ghost/module@2.0.0"));
    }

    #[test]
    fn resolution_is_idempotent_by_identity() {
        let registry = ModuleRegistry::with_modules(vec![module("m/a", "1.0.0")]);

        let first = registry.resolve("m/a").expect("first resolve");
        let second = registry.resolve("m/a").expect("second resolve");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn reregistration_overwrites_versioned_and_latest_keys() {
        let registry = ModuleRegistry::with_modules(vec![module("m/a", "1.0.0")]);
        let replacement = module("m/a", "1.0.0");
        registry.register(Arc::clone(&replacement));

        let pinned = registry.resolve("m/a@1.0.0").expect("pinned resolve");
        let latest = registry.resolve("m/a").expect("latest resolve");
        assert!(Arc::ptr_eq(&pinned, &replacement));
        assert!(Arc::ptr_eq(&latest, &replacement));
    }

    #[test]
    fn empty_version_pin_is_treated_as_latest() {
        let registry = ModuleRegistry::with_modules(vec![module("m/a", "1.0.0")]);

        let resolved = registry.resolve("m/a@").expect("empty pin");
        assert_eq!(resolved.name(), "m/a");
    }
}
