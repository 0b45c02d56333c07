//! Specification file loading and validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use relay_types::{ApiSpec, validate_spec};

/// Loads a YAML specification from disk and validates it.
///
/// The specification is an immutable input for the process lifetime; every
/// structural problem is collected and reported at once rather than failing
/// on the first.
pub fn load_spec(path: impl AsRef<Path>) -> Result<ApiSpec> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("failed to read spec file: {}", path.display()))?;

    let spec: ApiSpec =
        serde_yaml::from_str(&content).with_context(|| format!("failed to parse spec file: {}", path.display()))?;

    let issues = validate_spec(&spec);
    if !issues.is_empty() {
        let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();
        bail!("invalid specification '{}':\n  {}", path.display(), rendered.join("\n  "));
    }

    Ok(spec)
}
