// crates/pocopi-server/tests/file_store.rs
// ============================================================================
// Module: File Store Tests
// Description: JSON-file persistence layout and failure handling.
// Purpose: Ensure result files are keyed by user id and written whole.
// Dependencies: pocopi-server, tempfile, tokio
// ============================================================================

//! JSON-file persistence layout and failure handling.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]

mod common;

use std::fs;
use std::sync::Arc;

use pocopi_core::GroupLabel;
use pocopi_core::OptionEvent;
use pocopi_core::OptionEventKind;
use pocopi_core::OptionId;
use pocopi_core::PhaseId;
use pocopi_core::ProtocolLabel;
use pocopi_core::QuestionId;
use pocopi_core::TimelogRecord;
use pocopi_core::Timestamp;
use pocopi_core::UserId;
use pocopi_server::FileResultStore;
use pocopi_server::FormKind;
use pocopi_server::FormSubmission;
use pocopi_server::ResultStore;
use pocopi_server::StoreError;
use pocopi_server::User;
use pocopi_server::dto::AnonymousUser;
use serde_json::json;
use tempfile::TempDir;

use crate::common::DEFAULT_BODY_LIMIT;
use crate::common::spawn_with;

/// Opens a store in a fresh temporary directory.
fn open_store() -> (TempDir, FileResultStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileResultStore::open(dir.path()).unwrap();
    (dir, store)
}

/// Builds a timelog record for `question` ending at `end`.
fn record(user: &str, question: u32, end: u64) -> TimelogRecord {
    TimelogRecord {
        user_id: UserId::new(user),
        phase_id: PhaseId::new(1),
        question_id: QuestionId::new(question),
        start_timestamp: Timestamp::from_millis(0),
        end_timestamp: Timestamp::from_millis(end),
        correct: false,
        skipped: false,
        total_option_changes: 1,
        total_option_hovers: 0,
        events: vec![OptionEvent {
            kind: OptionEventKind::Select,
            option_id: OptionId::new(1),
            timestamp: Timestamp::from_millis(end / 2),
        }],
    }
}

#[test]
fn users_round_trip_through_user_json() {
    let (dir, store) = open_store();
    let user = User::Anonymous(AnonymousUser {
        username: UserId::new("u1"),
        group: GroupLabel::new("control"),
        protocol: ProtocolLabel::new("standard"),
    });
    store.save_user(&user).unwrap();
    assert!(dir.path().join("u1-user.json").is_file());
    assert_eq!(store.load_user(&UserId::new("u1")).unwrap(), Some(user));
    assert_eq!(store.load_user(&UserId::new("u2")).unwrap(), None);
}

#[test]
fn forms_overwrite_earlier_submissions() {
    let (dir, store) = open_store();
    let user = UserId::new("u1");
    for answers in [vec!["a"], vec!["b", "c"]] {
        store
            .save_form(FormKind::PostTest, &FormSubmission {
                user_id: user.clone(),
                answers: answers.into_iter().map(str::to_string).collect(),
            })
            .unwrap();
    }
    let content = fs::read_to_string(dir.path().join("u1-post-test.json")).unwrap();
    assert_eq!(content, r#"{"userId":"u1","answers":["b","c"]}"#);
    assert!(!dir.path().join("u1-pre-test.json").exists());
}

#[test]
fn timelogs_append_one_line_per_record() {
    let (dir, store) = open_store();
    store.append_timelog(&record("u1", 1, 1_000)).unwrap();
    store.append_timelog(&record("u1", 2, 2_000)).unwrap();
    store.append_timelog(&record("u2", 1, 500)).unwrap();

    let content = fs::read_to_string(dir.path().join("u1-timelogs.jsonl")).unwrap();
    assert_eq!(content.lines().count(), 2);
    let first: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(first["questionId"], 1);
    assert_eq!(first["events"][0]["type"], "select");

    let history = store.timelogs(&UserId::new("u1")).unwrap();
    assert_eq!(history, vec![record("u1", 1, 1_000), record("u1", 2, 2_000)]);
    assert!(store.timelogs(&UserId::new("nobody")).unwrap().is_empty());
}

#[test]
fn corrupt_timelog_lines_are_reported() {
    let (dir, store) = open_store();
    store.append_timelog(&record("u1", 1, 1_000)).unwrap();
    let path = dir.path().join("u1-timelogs.jsonl");
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("{not json\n");
    fs::write(&path, content).unwrap();

    let error = store.timelogs(&UserId::new("u1")).unwrap_err();
    match error {
        StoreError::Corrupt(message) => assert!(message.contains("line 2")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unsafe_user_ids_never_touch_the_filesystem() {
    let (dir, store) = open_store();
    for id in ["../escape", ".hidden", "a/b", ""] {
        let error = store.timelogs(&UserId::new(id)).unwrap_err();
        assert!(matches!(error, StoreError::InvalidKey(_)), "{id}");
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn open_creates_missing_data_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("results").join("2026");
    let store = FileResultStore::open(&nested).unwrap();
    assert!(nested.is_dir());
    assert_eq!(store.root(), nested.as_path());
}

#[tokio::test(flavor = "multi_thread")]
async fn pre_test_endpoint_writes_payload_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileResultStore::open(dir.path()).unwrap());
    let server = spawn_with(store, DEFAULT_BODY_LIMIT).await;

    let body = json!({ "userId": "u1", "answers": ["a", "b"] });
    let response = server.post("/api/forms/pretest", &body).await;
    assert_eq!(response.status().as_u16(), 201);

    let content = fs::read_to_string(dir.path().join("u1-pre-test.json")).unwrap();
    assert_eq!(content, r#"{"userId":"u1","answers":["a","b"]}"#);
    let stored: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(stored, body);
}
