// crates/pocopi-core/src/core/config.rs
// ============================================================================
// Module: PoCoPI Runtime Configuration
// Description: Immutable group, protocol, phase, question, and option graph.
// Purpose: Parse raw configuration once and perform weighted group sampling.
// Dependencies: crate::core::{identifiers, raw, shuffle}, rand, serde, thiserror
// ============================================================================

//! ## Overview
//! [`Config`] is built once per process from a [`RawConfig`] and shared
//! read-only afterwards. Randomized phases, questions, and options are
//! shuffled during construction, so their order is fixed for the lifetime of
//! the value. Group weights are kept as a private cumulative-sum vector that
//! backs [`Config::sample_group`].
//!
//! Construction fails closed: empty group sets, invalid weights, dangling
//! protocol references, and empty protocols, phases, or questions are
//! rejected with [`ModelError`] so sampling never fails afterwards.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use rand::rngs::OsRng;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::GroupLabel;
use crate::core::identifiers::OptionId;
use crate::core::identifiers::PhaseId;
use crate::core::identifiers::ProtocolLabel;
use crate::core::identifiers::QuestionId;
use crate::core::raw::Image;
use crate::core::raw::RawConfig;
use crate::core::raw::RawOption;
use crate::core::raw::RawPhase;
use crate::core::raw::RawProtocol;
use crate::core::raw::RawQuestion;
use crate::core::shuffle::shuffle_with;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Parsed, immutable test configuration.
///
/// # Invariants
/// - At least one group exists and the total weight is positive and finite.
/// - `probability_sums` is parallel to `groups` and non-decreasing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional study title.
    title: Option<String>,
    /// Optional study description.
    description: Option<String>,
    /// UI translation strings.
    translations: BTreeMap<String, String>,
    /// Groups in label order.
    groups: Vec<Group>,
    /// Cumulative weights parallel to `groups`.
    probability_sums: Vec<f64>,
    /// Index of the last group with a positive weight.
    fallback_index: usize,
    /// Parsed protocols keyed by label.
    protocols: BTreeMap<ProtocolLabel, Arc<Protocol>>,
}

impl Config {
    /// Parses a raw configuration using the operating system CSPRNG for any
    /// randomized ordering.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the configuration violates an invariant.
    pub fn from_raw(raw: &RawConfig) -> Result<Self, ModelError> {
        Self::from_raw_with(raw, &mut OsRng)
    }

    /// Parses a raw configuration with the provided generator.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the configuration violates an invariant.
    pub fn from_raw_with<R: Rng + ?Sized>(raw: &RawConfig, rng: &mut R) -> Result<Self, ModelError> {
        if raw.groups.is_empty() {
            return Err(ModelError::NoGroups);
        }

        let mut ids = IdAllocator::new();
        let mut protocols = BTreeMap::new();
        for (label, protocol) in &raw.protocols {
            let label = ProtocolLabel::new(label.as_str());
            let parsed = Protocol::parse(label.clone(), protocol, &mut ids, rng)?;
            protocols.insert(label, Arc::new(parsed));
        }

        let mut groups = Vec::with_capacity(raw.groups.len());
        let mut probability_sums = Vec::with_capacity(raw.groups.len());
        let mut total = 0.0_f64;
        let mut fallback_index = None;
        for (index, (label, group)) in raw.groups.iter().enumerate() {
            if !group.probability.is_finite() || group.probability < 0.0 {
                return Err(ModelError::InvalidWeight {
                    group: label.clone(),
                });
            }
            let protocol_label = ProtocolLabel::new(group.protocol.as_str());
            let protocol = protocols.get(&protocol_label).cloned().ok_or_else(|| {
                ModelError::UnknownProtocol {
                    group: label.clone(),
                    protocol: group.protocol.clone(),
                }
            })?;
            total += group.probability;
            if group.probability > 0.0 {
                fallback_index = Some(index);
            }
            probability_sums.push(total);
            groups.push(Group {
                label: GroupLabel::new(label.as_str()),
                probability: group.probability,
                protocol,
            });
        }
        if !total.is_finite() {
            return Err(ModelError::WeightOverflow);
        }
        let fallback_index = fallback_index.ok_or(ModelError::ZeroTotalWeight)?;

        Ok(Self {
            title: raw.title.clone(),
            description: raw.description.clone(),
            translations: raw.translations.clone(),
            groups,
            probability_sums,
            fallback_index,
            protocols,
        })
    }

    /// Samples a group proportionally to its weight using the OS CSPRNG.
    #[must_use]
    pub fn sample_group(&self) -> &Group {
        self.sample_group_with(&mut OsRng)
    }

    /// Samples a group proportionally to its weight with the provided generator.
    ///
    /// Draws `r` uniformly from `[0, total)` and returns the first group whose
    /// cumulative weight exceeds `r`. Zero-weight groups own an empty interval
    /// and are never returned.
    pub fn sample_group_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &Group {
        let total = self.probability_sums.last().copied().unwrap_or_default();
        let draw = rng.gen_range(0.0 .. total);
        self.groups
            .iter()
            .zip(&self.probability_sums)
            .find(|(_, sum)| **sum > draw)
            .map_or(&self.groups[self.fallback_index], |(group, _)| group)
    }

    /// Iterates groups in label order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Returns the group with the given label.
    #[must_use]
    pub fn group(&self, label: &GroupLabel) -> Option<&Group> {
        self.groups.iter().find(|group| &group.label == label)
    }

    /// Returns the protocol with the given label.
    #[must_use]
    pub fn protocol(&self, label: &ProtocolLabel) -> Option<&Arc<Protocol>> {
        self.protocols.get(label)
    }

    /// Iterates protocols in label order.
    pub fn protocols(&self) -> impl Iterator<Item = &Arc<Protocol>> {
        self.protocols.values()
    }

    /// Returns the study title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the study description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the translation table.
    #[must_use]
    pub const fn translations(&self) -> &BTreeMap<String, String> {
        &self.translations
    }

    /// Locates a question by id together with the phase that owns it.
    #[must_use]
    pub fn find_question(&self, question_id: QuestionId) -> Option<(&Protocol, &Phase, &Question)> {
        self.protocols.values().find_map(|protocol| {
            protocol.phases.iter().find_map(|phase| {
                phase
                    .questions
                    .iter()
                    .find(|question| question.id == question_id)
                    .map(|question| (protocol.as_ref(), phase, question))
            })
        })
    }
}

// ============================================================================
// SECTION: Group
// ============================================================================

/// Experimental group shared read-only by every session that samples it.
#[derive(Debug, Clone)]
pub struct Group {
    /// Group label.
    label: GroupLabel,
    /// Declared weight.
    probability: f64,
    /// Protocol administered to participants in this group.
    protocol: Arc<Protocol>,
}

impl Group {
    /// Returns the group label.
    #[must_use]
    pub const fn label(&self) -> &GroupLabel {
        &self.label
    }

    /// Returns the declared weight.
    #[must_use]
    pub const fn probability(&self) -> f64 {
        self.probability
    }

    /// Returns the administered protocol.
    #[must_use]
    pub const fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }
}

// ============================================================================
// SECTION: Protocol Tree
// ============================================================================

/// Parsed protocol: phases in presentation order plus navigation flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    /// Protocol label.
    pub label: ProtocolLabel,
    /// Phases in presentation order.
    pub phases: Vec<Phase>,
    /// Allows navigating back into earlier phases.
    pub allow_previous_phase: bool,
    /// Allows leaving a phase before finishing it.
    pub allow_skip_phase: bool,
}

impl Protocol {
    /// Parses a raw protocol, assigning item identifiers before any shuffle.
    fn parse<R: Rng + ?Sized>(
        label: ProtocolLabel,
        raw: &RawProtocol,
        ids: &mut IdAllocator,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        if raw.phases.is_empty() {
            return Err(ModelError::EmptyProtocol {
                protocol: label.to_string(),
            });
        }
        let mut phases = Vec::with_capacity(raw.phases.len());
        for (index, phase) in raw.phases.iter().enumerate() {
            let ordinal = index.checked_add(1).ok_or(ModelError::IdOverflow)?;
            let id = PhaseId::new(u32::try_from(ordinal).map_err(|_| ModelError::IdOverflow)?);
            phases.push(Phase::parse(&label, id, phase, ids, rng)?);
        }
        if raw.randomize {
            shuffle_with(&mut phases, rng);
        }
        Ok(Self {
            label,
            phases,
            allow_previous_phase: raw.allow_previous_phase,
            allow_skip_phase: raw.allow_skip_phase,
        })
    }

    /// Returns the phase at a presentation index.
    #[must_use]
    pub fn phase_at(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    /// Returns the presentation index of a phase id.
    #[must_use]
    pub fn phase_index(&self, phase_id: PhaseId) -> Option<usize> {
        self.phases.iter().position(|phase| phase.id == phase_id)
    }

    /// Returns the total number of questions across all phases.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.phases.iter().map(|phase| phase.questions.len()).sum()
    }
}

/// Parsed phase: questions in presentation order plus navigation flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    /// Phase identifier (1-based declaration position within the protocol).
    pub id: PhaseId,
    /// Questions in presentation order.
    pub questions: Vec<Question>,
    /// Allows navigating back to earlier questions.
    pub allow_previous_question: bool,
    /// Allows advancing without an answer.
    pub allow_skip_question: bool,
    /// Shows a summary screen when the phase ends.
    pub show_summary: bool,
}

impl Phase {
    /// Parses a raw phase.
    fn parse<R: Rng + ?Sized>(
        protocol: &ProtocolLabel,
        id: PhaseId,
        raw: &RawPhase,
        ids: &mut IdAllocator,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        if raw.questions.is_empty() {
            return Err(ModelError::EmptyPhase {
                protocol: protocol.to_string(),
                phase: id,
            });
        }
        let mut questions = Vec::with_capacity(raw.questions.len());
        for question in &raw.questions {
            questions.push(Question::parse(protocol, id, question, ids, rng)?);
        }
        if raw.randomize {
            shuffle_with(&mut questions, rng);
        }
        Ok(Self {
            id,
            questions,
            allow_previous_question: raw.allow_previous_question,
            allow_skip_question: raw.allow_skip_question,
            show_summary: raw.show_summary,
        })
    }

    /// Returns the question at a presentation index.
    #[must_use]
    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Returns the presentation index of a question id.
    #[must_use]
    pub fn question_index(&self, question_id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|question| question.id == question_id)
    }
}

/// Parsed question: stimulus image and options in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Question identifier.
    pub id: QuestionId,
    /// Stimulus image.
    pub image: Image,
    /// Options in presentation order.
    pub options: Vec<AnswerOption>,
}

impl Question {
    /// Parses a raw question.
    fn parse<R: Rng + ?Sized>(
        protocol: &ProtocolLabel,
        phase: PhaseId,
        raw: &RawQuestion,
        ids: &mut IdAllocator,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        let id = ids.next_question()?;
        if raw.options.is_empty() {
            return Err(ModelError::EmptyQuestion {
                protocol: protocol.to_string(),
                phase,
                question: id,
            });
        }
        let mut options = raw
            .options
            .iter()
            .map(|option| AnswerOption::parse(option, ids))
            .collect::<Result<Vec<_>, _>>()?;
        if raw.randomize {
            shuffle_with(&mut options, rng);
        }
        Ok(Self {
            id,
            image: raw.image.clone(),
            options,
        })
    }

    /// Returns the option with the given id.
    #[must_use]
    pub fn option(&self, option_id: OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    /// Returns whether the given option is marked correct.
    #[must_use]
    pub fn is_correct(&self, option_id: OptionId) -> bool {
        self.option(option_id).is_some_and(|option| option.correct)
    }
}

/// Parsed answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    /// Option identifier.
    pub id: OptionId,
    /// Option image.
    pub image: Image,
    /// Whether selecting this option is a correct answer.
    pub correct: bool,
}

impl AnswerOption {
    /// Parses a raw option.
    fn parse(raw: &RawOption, ids: &mut IdAllocator) -> Result<Self, ModelError> {
        Ok(Self {
            id: ids.next_option()?,
            image: raw.image.clone(),
            correct: raw.correct,
        })
    }
}

// ============================================================================
// SECTION: Identifier Allocation
// ============================================================================

/// Sequential identifier allocator threaded through a single parse.
///
/// Identifiers start at 1 so that zero never addresses an item.
#[derive(Debug)]
struct IdAllocator {
    /// Next question identifier.
    question: u32,
    /// Next option identifier.
    option: u32,
}

impl IdAllocator {
    /// Creates an allocator positioned at the first identifier.
    const fn new() -> Self {
        Self {
            question: 1,
            option: 1,
        }
    }

    /// Allocates the next question identifier.
    fn next_question(&mut self) -> Result<QuestionId, ModelError> {
        let id = QuestionId::new(self.question);
        self.question = self.question.checked_add(1).ok_or(ModelError::IdOverflow)?;
        Ok(id)
    }

    /// Allocates the next option identifier.
    fn next_option(&mut self) -> Result<OptionId, ModelError> {
        let id = OptionId::new(self.option);
        self.option = self.option.checked_add(1).ok_or(ModelError::IdOverflow)?;
        Ok(id)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration model errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// No groups were declared.
    #[error("configuration declares no groups")]
    NoGroups,
    /// A group weight is negative or not finite.
    #[error("group {group} has a negative or non-finite probability")]
    InvalidWeight {
        /// Offending group label.
        group: String,
    },
    /// Every group weight is zero.
    #[error("group probabilities sum to zero")]
    ZeroTotalWeight,
    /// Group weights overflow to infinity.
    #[error("group probabilities overflow")]
    WeightOverflow,
    /// A group references a protocol that does not exist.
    #[error("group {group} references unknown protocol {protocol}")]
    UnknownProtocol {
        /// Offending group label.
        group: String,
        /// Missing protocol label.
        protocol: String,
    },
    /// A protocol declares no phases.
    #[error("protocol {protocol} declares no phases")]
    EmptyProtocol {
        /// Offending protocol label.
        protocol: String,
    },
    /// A phase declares no questions.
    #[error("protocol {protocol} phase {phase} declares no questions")]
    EmptyPhase {
        /// Owning protocol label.
        protocol: String,
        /// Offending phase id.
        phase: PhaseId,
    },
    /// A question declares no options.
    #[error("protocol {protocol} phase {phase} question {question} declares no options")]
    EmptyQuestion {
        /// Owning protocol label.
        protocol: String,
        /// Owning phase id.
        phase: PhaseId,
        /// Offending question id.
        question: QuestionId,
    },
    /// Too many items to number.
    #[error("configuration has too many items to assign identifiers")]
    IdOverflow,
}
