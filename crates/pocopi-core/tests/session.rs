// crates/pocopi-core/tests/session.rs
// ============================================================================
// Module: Test Session Tests
// Description: Navigation rules, option tracking, and timelog emission.
// Purpose: Ensure the participant flow honors protocol and phase flags.
// Dependencies: pocopi-core
// ============================================================================

//! ## Overview
//! Fixtures use two phases of two questions each. Option ids are assigned
//! in declaration order, so question `n` owns options `2n - 1` (correct)
//! and `2n`.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;

use pocopi_core::FlowState;
use pocopi_core::NavigationError;
use pocopi_core::OptionEventKind;
use pocopi_core::OptionId;
use pocopi_core::PhaseId;
use pocopi_core::QuestionId;
use pocopi_core::RawProtocol;
use pocopi_core::SinkError;
use pocopi_core::TestSession;
use pocopi_core::TimelogRecord;
use pocopi_core::TimelogSink;
use pocopi_core::UserId;

use crate::common::at;
use crate::common::main_protocol;
use crate::common::phase;
use crate::common::protocol;
use crate::common::single_group;
use crate::common::started_session;

/// Two phases of two questions with every flag off.
fn two_by_two() -> RawProtocol {
    protocol(vec![phase(2), phase(2)])
}

/// Shorthand for a test position.
const fn test_at(phase: usize, question: usize) -> FlowState {
    FlowState::Test {
        phase,
        question,
    }
}

/// Sink that rejects every record.
struct FailingSink;

impl TimelogSink for FailingSink {
    fn send(&self, _record: TimelogRecord) -> Result<(), SinkError> {
        Err(SinkError::Sink("collector offline".to_string()))
    }
}

#[test]
fn home_routes_to_dashboard_admin_and_greeting() {
    let protocol = main_protocol(&single_group(two_by_two()));
    let sink = Arc::new(pocopi_core::InMemoryTimelogSink::new());
    let mut session = TestSession::new(UserId::new("u1"), protocol, sink);
    assert_eq!(session.state(), FlowState::Home);

    session.open_dashboard().unwrap();
    assert_eq!(session.state(), FlowState::Dashboard);
    assert!(matches!(session.open_admin(), Err(NavigationError::InvalidTransition { .. })));
    session.return_home().unwrap();
    session.open_admin().unwrap();
    assert_eq!(session.state(), FlowState::Admin);
    session.return_home().unwrap();

    assert_eq!(
        session.start_test(at(0)),
        Err(NavigationError::InvalidTransition {
            state: "home",
            action: "start test",
        })
    );
    session.open_greeting().unwrap();
    assert!(session.return_home().is_err());
    session.start_test(at(0)).unwrap();
    assert_eq!(session.state(), test_at(0, 0));
    assert_eq!(session.current_question().map(|q| q.id), Some(QuestionId::new(1)));
}

#[test]
fn next_is_blocked_until_answered_when_skipping_is_disallowed() {
    let (mut session, sink) = started_session(main_protocol(&single_group(two_by_two())));
    assert_eq!(
        session.next_question(at(10)),
        Err(NavigationError::AnswerRequired {
            question_id: QuestionId::new(1),
        })
    );
    assert_eq!(session.state(), test_at(0, 0));
    assert!(sink.records().unwrap().is_empty());

    session.select_option(OptionId::new(1), at(20)).unwrap();
    session.next_question(at(30)).unwrap();
    assert_eq!(session.state(), test_at(0, 1));

    // Deselecting clears the answer and blocks again.
    session.select_option(OptionId::new(3), at(40)).unwrap();
    session.select_option(OptionId::new(3), at(50)).unwrap();
    assert_eq!(session.answer(QuestionId::new(2)), None);
    assert!(session.next_question(at(60)).is_err());
}

#[test]
fn next_is_never_blocked_when_skipping_is_allowed() {
    let mut raw = two_by_two();
    for phase in &mut raw.phases {
        phase.allow_skip_question = true;
    }
    let (mut session, sink) = started_session(main_protocol(&single_group(raw)));
    for step in 1 ..= 4 {
        session.next_question(at(step * 100)).unwrap();
    }
    assert_eq!(session.state(), FlowState::End);

    let records = sink.records().unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|record| record.skipped && !record.correct));
    let phases: Vec<PhaseId> = records.iter().map(|record| record.phase_id).collect();
    assert_eq!(phases, vec![PhaseId::new(1), PhaseId::new(1), PhaseId::new(2), PhaseId::new(2)]);
}

#[test]
fn option_interactions_are_counted_and_logged_in_order() {
    let (mut session, sink) = started_session(main_protocol(&single_group(two_by_two())));
    session.select_option(OptionId::new(1), at(100)).unwrap();
    session.select_option(OptionId::new(1), at(200)).unwrap();
    session.select_option(OptionId::new(2), at(300)).unwrap();
    session.hover_option(OptionId::new(2), at(350)).unwrap();
    session.hover_option(OptionId::new(1), at(400)).unwrap();
    session.next_question(at(500)).unwrap();

    let records = sink.records().unwrap();
    let record = records.first().expect("timelog");
    assert_eq!(record.user_id, UserId::new("u1"));
    assert_eq!(record.question_id, QuestionId::new(1));
    assert_eq!(record.duration_ms(), 500);
    assert!(!record.correct);
    assert!(!record.skipped);
    assert_eq!(record.total_option_changes, 3);
    assert_eq!(record.total_option_hovers, 2);
    let kinds: Vec<OptionEventKind> = record.events.iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            OptionEventKind::Select,
            OptionEventKind::Deselect,
            OptionEventKind::Select,
            OptionEventKind::Hover,
            OptionEventKind::Hover,
        ]
    );
    assert_eq!(record.events[3].option_id, OptionId::new(2));
    assert_eq!(record.events[3].timestamp, at(350));
}

#[test]
fn correct_answer_is_flagged() {
    let (mut session, sink) = started_session(main_protocol(&single_group(two_by_two())));
    session.select_option(OptionId::new(1), at(5)).unwrap();
    session.next_question(at(9)).unwrap();
    assert!(sink.records().unwrap()[0].correct);
}

#[test]
fn options_of_other_questions_are_rejected() {
    let (mut session, _sink) = started_session(main_protocol(&single_group(two_by_two())));
    assert_eq!(
        session.select_option(OptionId::new(5), at(1)),
        Err(NavigationError::UnknownOption {
            option_id: OptionId::new(5),
        })
    );
    assert!(session.hover_option(OptionId::new(99), at(1)).is_err());
}

#[test]
fn previous_question_respects_phase_flag() {
    let (mut session, _sink) = started_session(main_protocol(&single_group(two_by_two())));
    session.select_option(OptionId::new(1), at(1)).unwrap();
    session.next_question(at(2)).unwrap();
    assert_eq!(session.previous_question(at(3)), Err(NavigationError::PreviousQuestionDisallowed));
    assert_eq!(session.state(), test_at(0, 1));
}

#[test]
fn previous_question_crosses_phases_only_when_protocol_allows() {
    let mut raw = two_by_two();
    for phase in &mut raw.phases {
        phase.allow_previous_question = true;
        phase.allow_skip_question = true;
    }
    let (mut session, _sink) = started_session(main_protocol(&single_group(raw.clone())));
    assert_eq!(session.previous_question(at(1)), Err(NavigationError::NoPreviousQuestion));
    session.next_question(at(2)).unwrap();
    session.next_question(at(3)).unwrap();
    assert_eq!(session.state(), test_at(1, 0));
    assert_eq!(session.previous_question(at(4)), Err(NavigationError::PreviousPhaseDisallowed));

    raw.allow_previous_phase = true;
    let (mut session, sink) = started_session(main_protocol(&single_group(raw)));
    session.next_question(at(2)).unwrap();
    session.next_question(at(3)).unwrap();
    session.previous_question(at(4)).unwrap();
    assert_eq!(session.state(), test_at(0, 1));
    session.previous_question(at(5)).unwrap();
    assert_eq!(session.state(), test_at(0, 0));
    assert_eq!(sink.records().unwrap().len(), 4);
}

#[test]
fn answers_survive_navigation() {
    let mut raw = two_by_two();
    raw.phases[0].allow_previous_question = true;
    let (mut session, _sink) = started_session(main_protocol(&single_group(raw)));
    session.select_option(OptionId::new(2), at(1)).unwrap();
    session.next_question(at(2)).unwrap();
    session.previous_question(at(3)).unwrap();
    assert_eq!(session.answer(QuestionId::new(1)), Some(OptionId::new(2)));
}

#[test]
fn phase_summary_allows_jumps_within_the_phase() {
    let mut raw = two_by_two();
    raw.phases[0].show_summary = true;
    raw.phases[0].allow_previous_question = true;
    let (mut session, sink) = started_session(main_protocol(&single_group(raw)));
    session.select_option(OptionId::new(1), at(1)).unwrap();
    session.next_question(at(2)).unwrap();
    session.select_option(OptionId::new(4), at(3)).unwrap();
    session.next_question(at(4)).unwrap();
    assert_eq!(
        session.state(),
        FlowState::Summary {
            phase: 0
        }
    );
    assert!(session.current_question().is_none());

    let entries = session.summary_entries(0).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry.answered && entry.jumpable));

    session.jump_to(0, 1, at(5)).unwrap();
    assert_eq!(session.state(), test_at(0, 1));
    session.next_question(at(6)).unwrap();
    session.continue_from_summary(at(7)).unwrap();
    assert_eq!(session.state(), test_at(1, 0));
    assert_eq!(sink.records().unwrap().len(), 3);
}

#[test]
fn summary_jumps_into_earlier_phases_need_permission() {
    let mut raw = two_by_two();
    for phase in &mut raw.phases {
        phase.allow_skip_question = true;
        phase.show_summary = true;
    }
    raw.phases[0].allow_previous_question = true;
    let (mut session, _sink) = started_session(main_protocol(&single_group(raw.clone())));
    assert!(matches!(session.jump_to(0, 0, at(0)), Err(NavigationError::InvalidTransition { .. })));
    for step in 1 ..= 2 {
        session.next_question(at(step)).unwrap();
    }
    session.continue_from_summary(at(3)).unwrap();
    session.next_question(at(4)).unwrap();
    session.next_question(at(5)).unwrap();
    assert_eq!(
        session.state(),
        FlowState::Summary {
            phase: 1
        }
    );

    assert_eq!(
        session.jump_to(0, 0, at(6)),
        Err(NavigationError::JumpDisallowed {
            phase: 0,
            question: 0,
        })
    );
    // The current phase does not allow previous questions.
    assert!(matches!(session.jump_to(1, 0, at(6)), Err(NavigationError::JumpDisallowed { .. })));
    assert!(matches!(session.jump_to(1, 7, at(6)), Err(NavigationError::OutOfRange { .. })));
    assert!(matches!(session.jump_to(4, 0, at(6)), Err(NavigationError::OutOfRange { .. })));
    assert!(session.summary_entries(0).unwrap().iter().all(|entry| !entry.jumpable));

    raw.allow_previous_phase = true;
    let (mut session, _sink) = started_session(main_protocol(&single_group(raw)));
    session.next_question(at(1)).unwrap();
    session.next_question(at(2)).unwrap();
    session.continue_from_summary(at(3)).unwrap();
    session.next_question(at(4)).unwrap();
    session.next_question(at(5)).unwrap();
    session.jump_to(0, 1, at(6)).unwrap();
    assert_eq!(session.state(), test_at(0, 1));
}

#[test]
fn skip_phase_requires_protocol_permission() {
    let (mut session, _sink) = started_session(main_protocol(&single_group(two_by_two())));
    assert_eq!(session.skip_phase(at(1)), Err(NavigationError::SkipPhaseDisallowed));

    let mut raw = two_by_two();
    raw.allow_skip_phase = true;
    let (mut session, sink) = started_session(main_protocol(&single_group(raw)));
    session.skip_phase(at(10)).unwrap();
    assert_eq!(session.state(), test_at(1, 0));
    session.skip_phase(at(20)).unwrap();
    assert_eq!(session.state(), FlowState::End);

    let records = sink.records().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.skipped));
    assert_eq!(records[1].question_id, QuestionId::new(3));
}

#[test]
fn finishing_the_last_phase_ends_the_test() {
    let (mut session, sink) = started_session(main_protocol(&single_group(two_by_two())));
    for (step, option) in (0_u64 ..).zip([1_u32, 3, 5, 7]) {
        session.select_option(OptionId::new(option), at(step * 10)).unwrap();
        session.next_question(at(step * 10 + 5)).unwrap();
    }
    assert_eq!(session.state(), FlowState::End);
    assert!(session.next_question(at(100)).is_err());
    assert!(sink.records().unwrap().iter().all(|record| record.correct));
    session.return_home().unwrap();
    assert_eq!(session.state(), FlowState::Home);
}

#[test]
fn sink_failures_do_not_block_navigation() {
    let mut raw = two_by_two();
    raw.phases[0].allow_skip_question = true;
    raw.phases[1].allow_skip_question = true;
    let mut session =
        TestSession::new(UserId::new("u9"), main_protocol(&single_group(raw)), Arc::new(FailingSink));
    session.open_greeting().unwrap();
    session.start_test(at(0)).unwrap();
    for step in 1 ..= 4 {
        session.next_question(at(step)).unwrap();
    }
    assert_eq!(session.state(), FlowState::End);
}
