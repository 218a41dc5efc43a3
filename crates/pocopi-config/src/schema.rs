// crates/pocopi-config/src/schema.rs
// ============================================================================
// Module: Test Config Schema
// Description: JSON schema builder for the declarative test configuration.
// Purpose: Gate untrusted YAML and editor payloads before model parsing.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The schema mirrors the raw configuration model: camelCase keys, boolean
//! flags defaulting to `false`, and no unknown properties. Constraints the
//! schema cannot express (dangling protocol references, an all-zero weight
//! total) are enforced by the model parser.

use serde_json::Value;
use serde_json::json;

/// Returns the JSON schema for the YAML test configuration.
#[must_use]
pub fn test_config_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "pocopi://schemas/test-config.schema.json",
        "title": "PoCoPI Test Configuration",
        "description": "Groups, protocols, phases, and questions for a PoCoPI study.",
        "type": "object",
        "required": ["groups", "protocols"],
        "properties": {
            "title": schema_for_string("Study title shown on the home page."),
            "description": schema_for_string("Study description shown on the home page."),
            "translations": {
                "type": "object",
                "additionalProperties": { "type": "string" },
                "default": {},
                "description": "UI translation strings keyed by message id."
            },
            "groups": {
                "type": "object",
                "minProperties": 1,
                "additionalProperties": group_schema(),
                "description": "Experimental groups keyed by label."
            },
            "protocols": {
                "type": "object",
                "additionalProperties": protocol_schema(),
                "description": "Protocols keyed by label."
            }
        },
        "additionalProperties": false
    })
}

// ============================================================================
// SECTION: Tree Schemas
// ============================================================================

/// Schema for a group entry.
fn group_schema() -> Value {
    json!({
        "type": "object",
        "required": ["probability", "protocol"],
        "properties": {
            "probability": {
                "type": "number",
                "minimum": 0,
                "description": "Relative sampling weight; weights need not sum to 1."
            },
            "protocol": schema_for_non_empty_string("Label of the administered protocol.")
        },
        "additionalProperties": false
    })
}

/// Schema for a protocol entry.
fn protocol_schema() -> Value {
    json!({
        "type": "object",
        "required": ["phases"],
        "properties": {
            "phases": {
                "type": "array",
                "minItems": 1,
                "items": phase_schema()
            },
            "allowPreviousPhase": schema_for_flag("Allow navigating back into earlier phases."),
            "allowSkipPhase": schema_for_flag("Allow leaving a phase before finishing it."),
            "randomize": schema_for_flag("Shuffle phase order once at load.")
        },
        "additionalProperties": false
    })
}

/// Schema for a phase entry.
fn phase_schema() -> Value {
    json!({
        "type": "object",
        "required": ["questions"],
        "properties": {
            "questions": {
                "type": "array",
                "minItems": 1,
                "items": question_schema()
            },
            "allowPreviousQuestion": schema_for_flag("Allow navigating back to earlier questions."),
            "allowSkipQuestion": schema_for_flag("Allow advancing without an answer."),
            "randomize": schema_for_flag("Shuffle question order once at load."),
            "showSummary": schema_for_flag("Show a summary screen when the phase ends.")
        },
        "additionalProperties": false
    })
}

/// Schema for a question entry.
fn question_schema() -> Value {
    json!({
        "type": "object",
        "required": ["image", "options"],
        "properties": {
            "image": image_schema(),
            "options": {
                "type": "array",
                "minItems": 1,
                "items": option_schema()
            },
            "randomize": schema_for_flag("Shuffle option order once at load.")
        },
        "additionalProperties": false
    })
}

/// Schema for an answer option.
fn option_schema() -> Value {
    json!({
        "type": "object",
        "required": ["image"],
        "properties": {
            "image": image_schema(),
            "correct": schema_for_flag("Marks the option as a correct answer.")
        },
        "additionalProperties": false
    })
}

/// Schema for an image reference.
fn image_schema() -> Value {
    json!({
        "type": "object",
        "required": ["src", "alt"],
        "properties": {
            "src": schema_for_non_empty_string("Image URL or path."),
            "alt": schema_for_string("Alternative text.")
        },
        "additionalProperties": false
    })
}

// ============================================================================
// SECTION: Leaf Helpers
// ============================================================================

/// Schema for a boolean flag defaulting to `false`.
fn schema_for_flag(description: &str) -> Value {
    json!({
        "type": "boolean",
        "default": false,
        "description": description
    })
}

/// Schema for any string.
fn schema_for_string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description
    })
}

/// Schema for a non-empty string.
fn schema_for_non_empty_string(description: &str) -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "description": description
    })
}
