// crates/pocopi-core/src/core/mod.rs
// ============================================================================
// Module: PoCoPI Core Types
// Description: Configuration model, identifiers, timelogs, and summaries.
// Purpose: Provide stable, serializable types shared by every PoCoPI surface.
// Dependencies: rand, serde, thiserror
// ============================================================================

//! ## Overview
//! Core types define the raw configuration document, the parsed immutable
//! [`Config`] graph with weighted group sampling, per-question timelogs, and
//! the results summary derived from them.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod config;
pub mod identifiers;
pub mod raw;
pub mod shuffle;
pub mod summary;
pub mod time;
pub mod timelog;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AnswerOption;
pub use config::Config;
pub use config::Group;
pub use config::ModelError;
pub use config::Phase;
pub use config::Protocol;
pub use config::Question;
pub use identifiers::GroupLabel;
pub use identifiers::MAX_USER_ID_LENGTH;
pub use identifiers::OptionId;
pub use identifiers::PhaseId;
pub use identifiers::ProtocolLabel;
pub use identifiers::QuestionId;
pub use identifiers::UserId;
pub use raw::Image;
pub use raw::RawConfig;
pub use raw::RawGroup;
pub use raw::RawOption;
pub use raw::RawPhase;
pub use raw::RawProtocol;
pub use raw::RawQuestion;
pub use shuffle::shuffle;
pub use shuffle::shuffle_with;
pub use summary::PhaseSummary;
pub use summary::ResultTotals;
pub use summary::ResultsSummary;
pub use summary::summarize;
pub use time::Timestamp;
pub use timelog::OptionEvent;
pub use timelog::OptionEventKind;
pub use timelog::TimelogRecord;
