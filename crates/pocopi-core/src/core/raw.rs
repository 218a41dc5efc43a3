// crates/pocopi-core/src/core/raw.rs
// ============================================================================
// Module: Raw Test Configuration
// Description: Declarative configuration as authored in YAML.
// Purpose: Mirror the on-disk document before it is parsed into runtime values.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Raw types are the source of truth loaded from disk. They are never
//! mutated after load; [`crate::core::config::Config::from_raw`] builds the
//! immutable runtime graph from them. Field names follow the camelCase keys
//! used by the authored YAML documents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Raw Types
// ============================================================================

/// Declarative test configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
    /// Optional study title shown on the home page.
    #[serde(default)]
    pub title: Option<String>,
    /// Optional study description shown on the home page.
    #[serde(default)]
    pub description: Option<String>,
    /// UI translation strings keyed by message id.
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
    /// Experimental groups keyed by label.
    pub groups: BTreeMap<String, RawGroup>,
    /// Test protocols keyed by label.
    pub protocols: BTreeMap<String, RawProtocol>,
}

/// Weighted experimental group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawGroup {
    /// Relative sampling weight (need not sum to one across groups).
    pub probability: f64,
    /// Label of the protocol administered to this group.
    pub protocol: String,
}

/// Ordered sequence of phases with navigation flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawProtocol {
    /// Phases in declaration order.
    pub phases: Vec<RawPhase>,
    /// Allows navigating back into earlier phases.
    #[serde(default)]
    pub allow_previous_phase: bool,
    /// Allows leaving a phase before finishing it.
    #[serde(default)]
    pub allow_skip_phase: bool,
    /// Shuffles phase order once at load.
    #[serde(default)]
    pub randomize: bool,
}

/// Ordered sequence of questions with navigation flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawPhase {
    /// Questions in declaration order.
    pub questions: Vec<RawQuestion>,
    /// Allows navigating back to earlier questions.
    #[serde(default)]
    pub allow_previous_question: bool,
    /// Allows advancing without an answer.
    #[serde(default)]
    pub allow_skip_question: bool,
    /// Shuffles question order once at load.
    #[serde(default)]
    pub randomize: bool,
    /// Shows a summary screen when the phase ends.
    #[serde(default)]
    pub show_summary: bool,
}

/// Single question: one stimulus image and its candidate options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawQuestion {
    /// Stimulus image.
    pub image: Image,
    /// Options in declaration order.
    pub options: Vec<RawOption>,
    /// Shuffles option order once at load.
    #[serde(default)]
    pub randomize: bool,
}

/// Candidate answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawOption {
    /// Option image.
    pub image: Image,
    /// Marks the option as a correct answer.
    #[serde(default)]
    pub correct: bool,
}

/// Image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Image {
    /// Image source URL or asset path.
    pub src: String,
    /// Alternative text.
    pub alt: String,
}
