// crates/pocopi-config/src/test_config.rs
// ============================================================================
// Module: Test Config Loading
// Description: YAML loading and schema validation for test configurations.
// Purpose: Turn untrusted YAML or editor JSON into a parsed `Config`.
// Dependencies: pocopi-core, jsonschema, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! Test configurations pass three gates in order: YAML syntax, the JSON
//! schema from [`test_config_schema`], and the model invariants checked by
//! [`Config::from_raw`]. [`TestConfigValidator::validate`] runs the same
//! gates without failing fast so the admin editor can show every problem.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use jsonschema::Draft;
use jsonschema::Validator;
use pocopi_core::Config;
use pocopi_core::RawConfig;
use serde::Serialize;
use serde_json::Value;

use crate::config::ConfigError;
use crate::config::validate_path;
use crate::schema::test_config_schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum test configuration file size in bytes.
pub(crate) const MAX_TEST_CONFIG_SIZE: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Validation Report
// ============================================================================

/// Outcome of validating a candidate test configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Whether the candidate is loadable.
    pub valid: bool,
    /// Human-readable problems, empty when valid.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Builds a report from collected errors.
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Compiled schema validator for test configurations.
pub struct TestConfigValidator {
    /// Compiled JSON schema.
    validator: Validator,
}

impl TestConfigValidator {
    /// Compiles the test configuration schema.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] when the schema fails to compile.
    pub fn new() -> Result<Self, ConfigError> {
        let schema = test_config_schema();
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .map_err(|err| ConfigError::Schema(err.to_string()))?;
        Ok(Self {
            validator,
        })
    }

    /// Returns every schema violation in the candidate.
    #[must_use]
    pub fn schema_errors(&self, candidate: &Value) -> Vec<String> {
        self.validator.iter_errors(candidate).map(|err| err.to_string()).collect()
    }

    /// Checks the candidate against the schema and decodes the raw model.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for the first schema or decoding problem.
    pub fn to_raw(&self, candidate: &Value) -> Result<RawConfig, ConfigError> {
        if let Some(first) = self.schema_errors(candidate).into_iter().next() {
            return Err(ConfigError::Schema(first));
        }
        serde_json::from_value(candidate.clone()).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Fully parses the candidate into a runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any gate rejects the candidate.
    pub fn parse(&self, candidate: &Value) -> Result<Config, ConfigError> {
        let raw = self.to_raw(candidate)?;
        Ok(Config::from_raw(&raw)?)
    }

    /// Validates the candidate and reports every problem found.
    ///
    /// Model invariants are only checked once the schema passes.
    #[must_use]
    pub fn validate(&self, candidate: &Value) -> ValidationReport {
        let schema_errors = self.schema_errors(candidate);
        if !schema_errors.is_empty() {
            return ValidationReport::from_errors(schema_errors);
        }
        let outcome = serde_json::from_value::<RawConfig>(candidate.clone())
            .map_err(|err| err.to_string())
            .and_then(|raw| Config::from_raw(&raw).map_err(|err| err.to_string()));
        ValidationReport::from_errors(outcome.err().into_iter().collect())
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Parses YAML text into a JSON value for schema validation.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed YAML.
pub fn parse_test_config_yaml(content: &str) -> Result<Value, ConfigError> {
    serde_yaml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
}

/// Loads, validates, and parses a YAML test configuration file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is unreadable or any gate fails.
pub fn load_test_config(path: &Path) -> Result<Config, ConfigError> {
    validate_path(path)?;
    let bytes =
        fs::read(path).map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_TEST_CONFIG_SIZE {
        return Err(ConfigError::Invalid("test config exceeds size limit".to_string()));
    }
    let content = std::str::from_utf8(&bytes)
        .map_err(|_| ConfigError::Invalid("test config must be utf-8".to_string()))?;
    let candidate = parse_test_config_yaml(content)?;
    TestConfigValidator::new()?.parse(&candidate)
}
