// crates/pocopi-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for pocopi-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::path::PathBuf;

use pocopi_config::ConfigError;
use serde_json::Value;
use serde_json::json;

/// Result type for tests that report failures as strings.
pub type TestResult = Result<(), String>;

/// Sample study shipped with the repository.
pub const SAMPLE_STUDY_YAML: &str = include_str!("../../../../config/pocopi.yaml");

/// Sample server configuration shipped with the repository.
pub const SAMPLE_SERVER_TOML: &str = include_str!("../../../../config/pocopi.toml");

/// Asserts that a result failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

/// Returns a minimal valid study as JSON.
pub fn minimal_study() -> Value {
    json!({
        "groups": {
            "only": { "probability": 1, "protocol": "main" }
        },
        "protocols": {
            "main": {
                "phases": [{
                    "questions": [{
                        "image": { "src": "q.png", "alt": "Q" },
                        "options": [
                            { "image": { "src": "a.png", "alt": "A" }, "correct": true },
                            { "image": { "src": "b.png", "alt": "B" } }
                        ]
                    }]
                }]
            }
        }
    })
}

/// Writes `content` to `name` inside `dir` and returns the path.
pub fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> Result<PathBuf, String> {
    let path = dir.path().join(name);
    std::fs::write(&path, content).map_err(|err| err.to_string())?;
    Ok(path)
}
