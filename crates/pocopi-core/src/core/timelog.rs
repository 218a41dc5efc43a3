// crates/pocopi-core/src/core/timelog.rs
// ============================================================================
// Module: PoCoPI Timelogs
// Description: Per-question timing and interaction records.
// Purpose: Define the analytics payload emitted when a question is completed.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A [`TimelogRecord`] captures one visit to one question: when it started
//! and ended, the outcome, interaction counters, and the ordered event log.
//! The wire form uses camelCase keys.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::OptionId;
use crate::core::identifiers::PhaseId;
use crate::core::identifiers::QuestionId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Option interaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionEventKind {
    /// Option became the selected answer.
    Select,
    /// Selected option was cleared.
    Deselect,
    /// Pointer hovered over the option.
    Hover,
}

impl OptionEventKind {
    /// Returns a stable label for the event kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Deselect => "deselect",
            Self::Hover => "hover",
        }
    }

    /// Parses a stable label into an event kind.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "select" => Some(Self::Select),
            "deselect" => Some(Self::Deselect),
            "hover" => Some(Self::Hover),
            _ => None,
        }
    }
}

/// Single option interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionEvent {
    /// Interaction kind.
    #[serde(rename = "type")]
    pub kind: OptionEventKind,
    /// Option the interaction targeted.
    pub option_id: OptionId,
    /// When the interaction happened.
    pub timestamp: Timestamp,
}

// ============================================================================
// SECTION: Timelog Record
// ============================================================================

/// Analytics record for one completed question visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelogRecord {
    /// Participant identifier.
    pub user_id: UserId,
    /// Phase identifier.
    pub phase_id: PhaseId,
    /// Question identifier.
    pub question_id: QuestionId,
    /// When the question was shown.
    pub start_timestamp: Timestamp,
    /// When the participant left the question.
    pub end_timestamp: Timestamp,
    /// Whether the recorded answer is correct.
    pub correct: bool,
    /// Whether the participant left without answering.
    pub skipped: bool,
    /// Number of select/deselect changes.
    pub total_option_changes: u32,
    /// Number of hover interactions.
    pub total_option_hovers: u32,
    /// Ordered interaction log.
    pub events: Vec<OptionEvent>,
}

impl TimelogRecord {
    /// Returns the time spent on the question in milliseconds.
    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        self.end_timestamp.saturating_since(self.start_timestamp)
    }
}
