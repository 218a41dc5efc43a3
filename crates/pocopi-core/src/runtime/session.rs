// crates/pocopi-core/src/runtime/session.rs
// ============================================================================
// Module: Test Session
// Description: Participant flow and test-taking state machine.
// Purpose: Drive phase/question navigation, answer tracking, and timelogs.
// Dependencies: crate::{core, interfaces}, tracing, thiserror
// ============================================================================

//! ## Overview
//! A [`TestSession`] walks one participant through
//! `Home -> Greeting -> Test -> Summary -> End`, with `Dashboard` and
//! `Admin` reachable from `Home`. Navigation honors the protocol and phase
//! flags; rejected transitions return [`NavigationError`] and leave the
//! session untouched.
//!
//! Leaving a question by any transition completes the current visit and
//! hands a [`TimelogRecord`] to the configured [`TimelogSink`]. Delivery
//! failures are logged and never block navigation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::core::OptionEvent;
use crate::core::OptionEventKind;
use crate::core::OptionId;
use crate::core::Phase;
use crate::core::Protocol;
use crate::core::Question;
use crate::core::QuestionId;
use crate::core::TimelogRecord;
use crate::core::Timestamp;
use crate::core::UserId;
use crate::interfaces::TimelogSink;

// ============================================================================
// SECTION: Flow State
// ============================================================================

/// Participant flow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Landing page.
    Home,
    /// Consent and instructions.
    Greeting,
    /// Answering a question, addressed by presentation indices.
    Test {
        /// Phase presentation index.
        phase: usize,
        /// Question presentation index within the phase.
        question: usize,
    },
    /// End-of-phase summary screen.
    Summary {
        /// Phase presentation index.
        phase: usize,
    },
    /// Test finished.
    End,
    /// Read-only results dashboard.
    Dashboard,
    /// Configuration editor.
    Admin,
}

impl FlowState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Greeting => "greeting",
            Self::Test {
                ..
            } => "test",
            Self::Summary {
                ..
            } => "summary",
            Self::End => "end",
            Self::Dashboard => "dashboard",
            Self::Admin => "admin",
        }
    }
}

/// Row of the end-of-phase summary screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryEntry {
    /// Question identifier.
    pub question_id: QuestionId,
    /// Phase presentation index.
    pub phase: usize,
    /// Question presentation index.
    pub question: usize,
    /// Whether an answer is recorded.
    pub answered: bool,
    /// Whether the row accepts a jump from the current summary.
    pub jumpable: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rejected navigation or interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// Action is not available from the current state.
    #[error("cannot {action} from {state}")]
    InvalidTransition {
        /// Current state label.
        state: &'static str,
        /// Attempted action.
        action: &'static str,
    },
    /// The phase requires an answer before advancing.
    #[error("question {question_id} requires an answer")]
    AnswerRequired {
        /// Unanswered question.
        question_id: QuestionId,
    },
    /// The phase does not allow going back.
    #[error("previous question is not allowed in this phase")]
    PreviousQuestionDisallowed,
    /// Already at the first question of the protocol.
    #[error("already at the first question")]
    NoPreviousQuestion,
    /// The protocol does not allow returning to earlier phases.
    #[error("previous phase is not allowed in this protocol")]
    PreviousPhaseDisallowed,
    /// The protocol does not allow skipping phases.
    #[error("skipping phases is not allowed in this protocol")]
    SkipPhaseDisallowed,
    /// Summary jump target is not reachable.
    #[error("cannot jump to phase {phase} question {question}")]
    JumpDisallowed {
        /// Target phase index.
        phase: usize,
        /// Target question index.
        question: usize,
    },
    /// Indices do not address a question.
    #[error("phase {phase} question {question} does not exist")]
    OutOfRange {
        /// Phase index.
        phase: usize,
        /// Question index.
        question: usize,
    },
    /// Option does not belong to the current question.
    #[error("option {option_id} is not part of the current question")]
    UnknownOption {
        /// Offending option.
        option_id: OptionId,
    },
}

// ============================================================================
// SECTION: Question Visit
// ============================================================================

/// In-flight timing for the question currently on screen.
#[derive(Debug, Clone)]
struct QuestionVisit {
    /// Phase presentation index.
    phase: usize,
    /// Question presentation index.
    question: usize,
    /// When the question was shown.
    started_at: Timestamp,
    /// Ordered interaction log.
    events: Vec<OptionEvent>,
    /// Select/deselect counter.
    option_changes: u32,
    /// Hover counter.
    option_hovers: u32,
}

impl QuestionVisit {
    /// Starts a visit at the given position.
    const fn new(phase: usize, question: usize, started_at: Timestamp) -> Self {
        Self {
            phase,
            question,
            started_at,
            events: Vec::new(),
            option_changes: 0,
            option_hovers: 0,
        }
    }
}

// ============================================================================
// SECTION: Test Session
// ============================================================================

/// Test-taking state machine for a single participant.
pub struct TestSession {
    /// Participant identifier.
    user_id: UserId,
    /// Protocol assigned to the participant's group.
    protocol: Arc<Protocol>,
    /// Current flow state.
    state: FlowState,
    /// Recorded answers keyed by question.
    answers: BTreeMap<QuestionId, OptionId>,
    /// Visit for the question on screen.
    visit: Option<QuestionVisit>,
    /// Timelog destination.
    sink: Arc<dyn TimelogSink>,
}

impl TestSession {
    /// Creates a session at `Home`.
    #[must_use]
    pub fn new(user_id: UserId, protocol: Arc<Protocol>, sink: Arc<dyn TimelogSink>) -> Self {
        Self {
            user_id,
            protocol,
            state: FlowState::Home,
            answers: BTreeMap::new(),
            visit: None,
            sink,
        }
    }

    /// Returns the current flow state.
    #[must_use]
    pub const fn state(&self) -> FlowState {
        self.state
    }

    /// Returns the participant identifier.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the assigned protocol.
    #[must_use]
    pub const fn protocol(&self) -> &Arc<Protocol> {
        &self.protocol
    }

    /// Returns the recorded answer for a question.
    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<OptionId> {
        self.answers.get(&question_id).copied()
    }

    /// Returns the question on screen, if any.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            FlowState::Test {
                phase,
                question,
            } => self.protocol.phase_at(phase).and_then(|phase| phase.question_at(question)),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Flow transitions
    // ------------------------------------------------------------------------

    /// Moves from `Home` to the greeting screen.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTransition`] outside `Home`.
    pub fn open_greeting(&mut self) -> Result<(), NavigationError> {
        self.from_home(FlowState::Greeting, "open greeting")
    }

    /// Moves from `Home` to the dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTransition`] outside `Home`.
    pub fn open_dashboard(&mut self) -> Result<(), NavigationError> {
        self.from_home(FlowState::Dashboard, "open dashboard")
    }

    /// Moves from `Home` to the configuration editor.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTransition`] outside `Home`.
    pub fn open_admin(&mut self) -> Result<(), NavigationError> {
        self.from_home(FlowState::Admin, "open admin")
    }

    /// Returns to `Home` from the dashboard, editor, or end screen.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTransition`] from any other state.
    pub fn return_home(&mut self) -> Result<(), NavigationError> {
        match self.state {
            FlowState::Dashboard | FlowState::Admin | FlowState::End => {
                self.state = FlowState::Home;
                Ok(())
            }
            _ => Err(self.invalid("return home")),
        }
    }

    /// Starts the test at the first question of the first phase.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTransition`] outside `Greeting`.
    pub fn start_test(&mut self, now: Timestamp) -> Result<(), NavigationError> {
        if self.state != FlowState::Greeting {
            return Err(self.invalid("start test"));
        }
        self.enter_phase(0, now);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Option interactions
    // ------------------------------------------------------------------------

    /// Toggles an option as the answer to the current question.
    ///
    /// Selecting the recorded answer again clears it.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError`] outside `Test` or for foreign options.
    pub fn select_option(&mut self, option_id: OptionId, now: Timestamp) -> Result<(), NavigationError> {
        let question_id = self.owned_option(option_id, "select option")?;
        let kind = if self.answers.get(&question_id) == Some(&option_id) {
            self.answers.remove(&question_id);
            OptionEventKind::Deselect
        } else {
            self.answers.insert(question_id, option_id);
            OptionEventKind::Select
        };
        if let Some(visit) = self.visit.as_mut() {
            visit.option_changes = visit.option_changes.saturating_add(1);
            visit.events.push(OptionEvent {
                kind,
                option_id,
                timestamp: now,
            });
        }
        Ok(())
    }

    /// Records a hover over an option of the current question.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError`] outside `Test` or for foreign options.
    pub fn hover_option(&mut self, option_id: OptionId, now: Timestamp) -> Result<(), NavigationError> {
        self.owned_option(option_id, "hover option")?;
        if let Some(visit) = self.visit.as_mut() {
            visit.option_hovers = visit.option_hovers.saturating_add(1);
            visit.events.push(OptionEvent {
                kind: OptionEventKind::Hover,
                option_id,
                timestamp: now,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Question navigation
    // ------------------------------------------------------------------------

    /// Advances to the next question, the phase summary, or the next phase.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::AnswerRequired`] when the phase forbids
    /// skipping and the current question is unanswered.
    pub fn next_question(&mut self, now: Timestamp) -> Result<(), NavigationError> {
        let (phase_index, question_index) = self.position("go to next question")?;
        let phase = self.phase(phase_index, question_index)?;
        let question = phase
            .question_at(question_index)
            .ok_or(NavigationError::OutOfRange {
                phase: phase_index,
                question: question_index,
            })?;
        if !phase.allow_skip_question && !self.answers.contains_key(&question.id) {
            return Err(NavigationError::AnswerRequired {
                question_id: question.id,
            });
        }
        let has_next = question_index + 1 < phase.questions.len();
        let show_summary = phase.show_summary;

        self.complete_visit(now);
        if has_next {
            self.enter_question(phase_index, question_index + 1, now);
        } else if show_summary {
            self.state = FlowState::Summary {
                phase: phase_index,
            };
        } else {
            self.enter_phase(phase_index + 1, now);
        }
        Ok(())
    }

    /// Returns to the previous question, crossing into the previous phase
    /// when the protocol allows it.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError`] when the phase or protocol flags forbid
    /// going back.
    pub fn previous_question(&mut self, now: Timestamp) -> Result<(), NavigationError> {
        let (phase_index, question_index) = self.position("go to previous question")?;
        let phase = self.phase(phase_index, question_index)?;
        if !phase.allow_previous_question {
            return Err(NavigationError::PreviousQuestionDisallowed);
        }
        let target = if question_index > 0 {
            (phase_index, question_index - 1)
        } else if phase_index == 0 {
            return Err(NavigationError::NoPreviousQuestion);
        } else if !self.protocol.allow_previous_phase {
            return Err(NavigationError::PreviousPhaseDisallowed);
        } else {
            let previous = self.phase(phase_index - 1, 0)?;
            let last = previous.questions.len().checked_sub(1).ok_or(
                NavigationError::OutOfRange {
                    phase: phase_index - 1,
                    question: 0,
                },
            )?;
            (phase_index - 1, last)
        };

        self.complete_visit(now);
        self.enter_question(target.0, target.1, now);
        Ok(())
    }

    /// Leaves the current phase immediately.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::SkipPhaseDisallowed`] when the protocol
    /// forbids it, or [`NavigationError::InvalidTransition`] outside
    /// `Test`/`Summary`.
    pub fn skip_phase(&mut self, now: Timestamp) -> Result<(), NavigationError> {
        let phase_index = match self.state {
            FlowState::Test {
                phase, ..
            }
            | FlowState::Summary {
                phase,
            } => phase,
            _ => return Err(self.invalid("skip phase")),
        };
        if !self.protocol.allow_skip_phase {
            return Err(NavigationError::SkipPhaseDisallowed);
        }
        self.complete_visit(now);
        self.enter_phase(phase_index + 1, now);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Phase summary
    // ------------------------------------------------------------------------

    /// Lists summary rows for a phase, flagging which ones accept a jump.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::OutOfRange`] for an unknown phase.
    pub fn summary_entries(&self, phase_index: usize) -> Result<Vec<SummaryEntry>, NavigationError> {
        let phase = self.phase(phase_index, 0)?;
        Ok(phase
            .questions
            .iter()
            .enumerate()
            .map(|(question_index, question)| SummaryEntry {
                question_id: question.id,
                phase: phase_index,
                question: question_index,
                answered: self.answers.contains_key(&question.id),
                jumpable: self.can_jump(phase_index),
            })
            .collect())
    }

    /// Jumps from the summary screen back to a question.
    ///
    /// Targets in the current phase are reachable; earlier phases only when
    /// the protocol allows previous phases. The target phase must allow
    /// previous questions.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError`] when the target is unreachable.
    pub fn jump_to(
        &mut self,
        phase_index: usize,
        question_index: usize,
        now: Timestamp,
    ) -> Result<(), NavigationError> {
        if !matches!(self.state, FlowState::Summary { .. }) {
            return Err(self.invalid("jump to question"));
        }
        let phase = self.phase(phase_index, question_index)?;
        if question_index >= phase.questions.len() {
            return Err(NavigationError::OutOfRange {
                phase: phase_index,
                question: question_index,
            });
        }
        if !self.can_jump(phase_index) {
            return Err(NavigationError::JumpDisallowed {
                phase: phase_index,
                question: question_index,
            });
        }
        self.enter_question(phase_index, question_index, now);
        Ok(())
    }

    /// Continues from the summary screen to the next phase or the end.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTransition`] outside `Summary`.
    pub fn continue_from_summary(&mut self, now: Timestamp) -> Result<(), NavigationError> {
        let FlowState::Summary {
            phase,
        } = self.state
        else {
            return Err(self.invalid("continue from summary"));
        };
        self.enter_phase(phase + 1, now);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Moves from `Home` to `target`.
    fn from_home(&mut self, target: FlowState, action: &'static str) -> Result<(), NavigationError> {
        if self.state != FlowState::Home {
            return Err(self.invalid(action));
        }
        self.state = target;
        Ok(())
    }

    /// Builds an invalid-transition error for the current state.
    const fn invalid(&self, action: &'static str) -> NavigationError {
        NavigationError::InvalidTransition {
            state: self.state.label(),
            action,
        }
    }

    /// Returns the current test position.
    fn position(&self, action: &'static str) -> Result<(usize, usize), NavigationError> {
        match self.state {
            FlowState::Test {
                phase,
                question,
            } => Ok((phase, question)),
            _ => Err(self.invalid(action)),
        }
    }

    /// Returns the phase at `phase_index`.
    fn phase(&self, phase_index: usize, question_index: usize) -> Result<&Phase, NavigationError> {
        self.protocol.phase_at(phase_index).ok_or(NavigationError::OutOfRange {
            phase: phase_index,
            question: question_index,
        })
    }

    /// Validates that an option belongs to the question on screen.
    fn owned_option(
        &self,
        option_id: OptionId,
        action: &'static str,
    ) -> Result<QuestionId, NavigationError> {
        self.position(action)?;
        let question = self.current_question().ok_or_else(|| self.invalid(action))?;
        if question.option(option_id).is_none() {
            return Err(NavigationError::UnknownOption {
                option_id,
            });
        }
        Ok(question.id)
    }

    /// Returns whether the current summary accepts a jump into `phase_index`.
    fn can_jump(&self, phase_index: usize) -> bool {
        let FlowState::Summary {
            phase: current,
        } = self.state
        else {
            return false;
        };
        let reachable = phase_index == current
            || (phase_index < current && self.protocol.allow_previous_phase);
        reachable
            && self.protocol.phase_at(phase_index).is_some_and(|phase| phase.allow_previous_question)
    }

    /// Enters the first non-empty phase at or after `phase_index`, or ends.
    fn enter_phase(&mut self, phase_index: usize, now: Timestamp) {
        let next = self
            .protocol
            .phases
            .iter()
            .enumerate()
            .skip(phase_index)
            .find(|(_, phase)| !phase.questions.is_empty())
            .map(|(index, _)| index);
        match next {
            Some(index) => self.enter_question(index, 0, now),
            None => {
                self.visit = None;
                self.state = FlowState::End;
            }
        }
    }

    /// Shows a question and starts a visit.
    fn enter_question(&mut self, phase: usize, question: usize, now: Timestamp) {
        self.state = FlowState::Test {
            phase,
            question,
        };
        self.visit = Some(QuestionVisit::new(phase, question, now));
    }

    /// Completes the in-flight visit and delivers its timelog.
    fn complete_visit(&mut self, now: Timestamp) {
        let Some(visit) = self.visit.take() else {
            return;
        };
        let Some(record) = self.timelog_for(visit, now) else {
            return;
        };
        let question_id = record.question_id;
        if let Err(err) = self.sink.send(record) {
            tracing::warn!(
                user_id = %self.user_id,
                question_id = %question_id,
                error = %err,
                "timelog delivery failed"
            );
        }
    }

    /// Builds the timelog for a finished visit.
    fn timelog_for(&self, visit: QuestionVisit, now: Timestamp) -> Option<TimelogRecord> {
        let phase = self.protocol.phase_at(visit.phase)?;
        let question = phase.question_at(visit.question)?;
        let answer = self.answers.get(&question.id).copied();
        Some(TimelogRecord {
            user_id: self.user_id.clone(),
            phase_id: phase.id,
            question_id: question.id,
            start_timestamp: visit.started_at,
            end_timestamp: now,
            correct: answer.is_some_and(|option_id| question.is_correct(option_id)),
            skipped: answer.is_none(),
            total_option_changes: visit.option_changes,
            total_option_hovers: visit.option_hovers,
            events: visit.events,
        })
    }
}
