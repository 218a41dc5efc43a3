// crates/pocopi-core/src/core/summary.rs
// ============================================================================
// Module: PoCoPI Results Summary
// Description: Per-phase and overall result aggregation from timelogs.
// Purpose: Back the results dashboard with deterministic arithmetic.
// Dependencies: crate::core::{config, identifiers, timelog}, serde
// ============================================================================

//! ## Overview
//! Summaries are computed from the timelogs of a single participant against
//! the protocol they were assigned. The latest visit to each question
//! decides its outcome; time spent counts every visit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::config::Phase;
use crate::core::config::Protocol;
use crate::core::identifiers::PhaseId;
use crate::core::identifiers::QuestionId;
use crate::core::identifiers::UserId;
use crate::core::timelog::TimelogRecord;

// ============================================================================
// SECTION: Summary Types
// ============================================================================

/// Aggregated counters for a set of questions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultTotals {
    /// Number of questions in scope.
    pub questions: u32,
    /// Questions whose latest visit recorded an answer.
    pub answered: u32,
    /// Questions whose latest answer is correct.
    pub correct: u32,
    /// Questions whose latest visit was skipped.
    pub skipped: u32,
    /// Correct answers over questions, as a percentage.
    pub accuracy_percent: f64,
    /// Milliseconds spent across every visit.
    pub time_spent_ms: u64,
}

impl ResultTotals {
    /// Recomputes the accuracy percentage from the counters.
    fn finish(mut self) -> Self {
        self.accuracy_percent = percentage(self.correct, self.questions);
        self
    }

    /// Adds another set of counters into this one.
    fn absorb(&mut self, other: &Self) {
        self.questions += other.questions;
        self.answered += other.answered;
        self.correct += other.correct;
        self.skipped += other.skipped;
        self.time_spent_ms = self.time_spent_ms.saturating_add(other.time_spent_ms);
    }
}

/// Summary for one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSummary {
    /// Phase identifier.
    pub phase_id: PhaseId,
    /// Phase counters.
    #[serde(flatten)]
    pub totals: ResultTotals,
}

/// Summary of a participant's results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSummary {
    /// Participant identifier.
    pub user_id: UserId,
    /// Per-phase summaries in presentation order.
    pub phases: Vec<PhaseSummary>,
    /// Overall counters.
    pub overall: ResultTotals,
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Summarizes a participant's timelogs against their protocol.
///
/// Timelogs for questions outside the protocol are ignored.
#[must_use]
pub fn summarize(user_id: &UserId, protocol: &Protocol, timelogs: &[TimelogRecord]) -> ResultsSummary {
    let mut latest: BTreeMap<QuestionId, &TimelogRecord> = BTreeMap::new();
    let mut time_spent: BTreeMap<QuestionId, u64> = BTreeMap::new();
    for record in timelogs.iter().filter(|record| &record.user_id == user_id) {
        let spent = time_spent.entry(record.question_id).or_default();
        *spent = spent.saturating_add(record.duration_ms());
        latest
            .entry(record.question_id)
            .and_modify(|current| {
                if record.end_timestamp >= current.end_timestamp {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    let mut overall = ResultTotals::default();
    let phases = protocol
        .phases
        .iter()
        .map(|phase| {
            let totals = phase_totals(phase, &latest, &time_spent);
            overall.absorb(&totals);
            PhaseSummary {
                phase_id: phase.id,
                totals,
            }
        })
        .collect();

    ResultsSummary {
        user_id: user_id.clone(),
        phases,
        overall: overall.finish(),
    }
}

/// Computes totals for a single phase.
fn phase_totals(
    phase: &Phase,
    latest: &BTreeMap<QuestionId, &TimelogRecord>,
    time_spent: &BTreeMap<QuestionId, u64>,
) -> ResultTotals {
    let mut totals = ResultTotals::default();
    for question in &phase.questions {
        totals.questions += 1;
        totals.time_spent_ms = totals
            .time_spent_ms
            .saturating_add(time_spent.get(&question.id).copied().unwrap_or_default());
        let Some(record) = latest.get(&question.id) else {
            continue;
        };
        if record.skipped {
            totals.skipped += 1;
        } else {
            totals.answered += 1;
            if record.correct {
                totals.correct += 1;
            }
        }
    }
    totals.finish()
}

/// Returns `part / whole * 100`, or zero when `whole` is zero.
fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    f64::from(part) / f64::from(whole) * 100.0
}
