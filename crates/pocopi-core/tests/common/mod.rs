// crates/pocopi-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Raw configuration builders and session fixtures.
// Purpose: Reduce duplication across integration tests for pocopi-core.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::expect_used, reason = "Fixtures panic on malformed setup.")]

use std::collections::BTreeMap;
use std::sync::Arc;

use pocopi_core::Config;
use pocopi_core::Image;
use pocopi_core::InMemoryTimelogSink;
use pocopi_core::Protocol;
use pocopi_core::RawConfig;
use pocopi_core::RawGroup;
use pocopi_core::RawOption;
use pocopi_core::RawPhase;
use pocopi_core::RawProtocol;
use pocopi_core::RawQuestion;
use pocopi_core::TestSession;
use pocopi_core::Timestamp;
use pocopi_core::UserId;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Two-group study used by YAML parsing tests.
pub const STUDY_YAML: &str = r#"
title: Raven study
translations:
  greeting.title: Welcome
groups:
  control:
    probability: 0.5
    protocol: standard
  treatment:
    probability: 0.5
    protocol: guided
protocols:
  standard:
    allowPreviousPhase: false
    phases:
      - questions:
          - image: { src: q1.png, alt: Q1 }
            options:
              - image: { src: q1a.png, alt: A }
                correct: true
              - image: { src: q1b.png, alt: B }
          - image: { src: q2.png, alt: Q2 }
            options:
              - image: { src: q2a.png, alt: A }
              - image: { src: q2b.png, alt: B }
                correct: true
  guided:
    allowPreviousPhase: true
    allowSkipPhase: true
    phases:
      - allowPreviousQuestion: true
        allowSkipQuestion: true
        showSummary: true
        questions:
          - image: { src: g1.png, alt: G1 }
            options:
              - image: { src: g1a.png, alt: A }
                correct: true
"#;

/// Parses a YAML document into a raw configuration.
pub fn raw_from_yaml(yaml: &str) -> RawConfig {
    serde_yaml::from_str(yaml).expect("raw config yaml")
}

/// Builds an image reference.
pub fn image(src: &str) -> Image {
    Image {
        src: src.to_string(),
        alt: src.to_string(),
    }
}

/// Builds a question with `options` options where only `correct` is right.
pub fn question(options: usize, correct: usize) -> RawQuestion {
    RawQuestion {
        image: image("question.png"),
        options: (0 .. options)
            .map(|index| RawOption {
                image: image(&format!("option-{index}.png")),
                correct: index == correct,
            })
            .collect(),
        randomize: false,
    }
}

/// Builds a phase of `questions` two-option questions with every flag off.
pub fn phase(questions: usize) -> RawPhase {
    RawPhase {
        questions: (0 .. questions).map(|_| question(2, 0)).collect(),
        allow_previous_question: false,
        allow_skip_question: false,
        randomize: false,
        show_summary: false,
    }
}

/// Builds a protocol over the given phases with every flag off.
pub fn protocol(phases: Vec<RawPhase>) -> RawProtocol {
    RawProtocol {
        phases,
        allow_previous_phase: false,
        allow_skip_phase: false,
        randomize: false,
    }
}

/// Wraps a protocol in a single-group configuration.
pub fn single_group(protocol: RawProtocol) -> RawConfig {
    RawConfig {
        title: None,
        description: None,
        translations: BTreeMap::new(),
        groups: BTreeMap::from([(
            "only".to_string(),
            RawGroup {
                probability: 1.0,
                protocol: "main".to_string(),
            },
        )]),
        protocols: BTreeMap::from([("main".to_string(), protocol)]),
    }
}

/// Builds a configuration with the given `(label, weight)` groups sharing one protocol.
pub fn weighted(groups: &[(&str, f64)]) -> RawConfig {
    let mut raw = single_group(protocol(vec![phase(1)]));
    raw.groups = groups
        .iter()
        .map(|(label, weight)| {
            (
                (*label).to_string(),
                RawGroup {
                    probability: *weight,
                    protocol: "main".to_string(),
                },
            )
        })
        .collect();
    raw
}

/// Parses a raw configuration with a fixed seed.
pub fn build(raw: &RawConfig) -> Config {
    Config::from_raw_with(raw, &mut StdRng::seed_from_u64(7)).expect("valid config")
}

/// Returns the single protocol of a single-group configuration.
pub fn main_protocol(raw: &RawConfig) -> Arc<Protocol> {
    let config = build(raw);
    Arc::clone(config.sample_group().protocol())
}

/// Starts a session on the first question of the protocol at t=0.
pub fn started_session(protocol: Arc<Protocol>) -> (TestSession, InMemoryTimelogSink) {
    let sink = InMemoryTimelogSink::new();
    let mut session = TestSession::new(UserId::new("u1"), protocol, Arc::new(sink.clone()));
    session.open_greeting().expect("greeting");
    session.start_test(at(0)).expect("start");
    (session, sink)
}

/// Timestamp shorthand.
pub const fn at(millis: u64) -> Timestamp {
    Timestamp::from_millis(millis)
}
