use serde::Serialize;

use crate::hierarchy::descriptor::Descriptor;

/// Top-level shape of a discovery document.
#[derive(Debug, Serialize)]
struct Discovery<'a> {
    features: &'a [Descriptor],
    tests_total: usize,
}

impl<'a> Discovery<'a> {
    fn new(features: &'a [Descriptor]) -> Self {
        Self {
            features,
            tests_total: features.iter().map(|f| f.tests().len()).sum(),
        }
    }
}

/// Emit resolved feature trees as YAML.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn emit_yaml(features: &[Descriptor]) -> Result<String, String> {
    serde_yaml::to_string(&Discovery::new(features))
        .map_err(|e| format!("yaml serialization failed: {e}"))
}

/// Emit resolved feature trees as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn emit_json(features: &[Descriptor]) -> Result<String, String> {
    serde_json::to_string_pretty(&Discovery::new(features))
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| format!("json serialization failed: {e}"))
}
