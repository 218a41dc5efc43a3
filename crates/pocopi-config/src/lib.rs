// crates/pocopi-config/src/lib.rs
// ============================================================================
// Module: PoCoPI Config Library
// Description: Server config model, test config loading, and schema output.
// Purpose: Single source of truth for pocopi.toml and test YAML semantics.
// Dependencies: pocopi-core, jsonschema, serde, serde_yaml, toml
// ============================================================================

//! ## Overview
//! `pocopi-config` owns the two configuration documents of a deployment:
//! `pocopi.toml`, which configures the server process, and the declarative
//! YAML test configuration, which describes groups, protocols, phases, and
//! questions. Both fail closed on invalid input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod schema;
pub mod test_config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use schema::test_config_schema;
pub use test_config::TestConfigValidator;
pub use test_config::ValidationReport;
pub use test_config::load_test_config;
pub use test_config::parse_test_config_yaml;
