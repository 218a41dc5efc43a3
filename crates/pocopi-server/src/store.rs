// crates/pocopi-server/src/store.rs
// ============================================================================
// Module: Result Stores
// Description: Persistence for users, questionnaires, and timelogs.
// Purpose: Keep participant results as JSON files or in memory.
// Dependencies: pocopi-core, serde_json, tempfile, thiserror
// ============================================================================

//! ## Overview
//! [`ResultStore`] is synchronous; handlers call it on the blocking pool.
//! The file store keys every artifact by user id:
//!
//! - `<userId>-user.json`
//! - `<userId>-pre-test.json` / `<userId>-post-test.json`
//! - `<userId>-timelogs.jsonl`, one record per line
//!
//! Whole-file writes go through a temporary file and an atomic rename, so a
//! crash never leaves a half-written JSON document. Later writes overwrite
//! earlier ones. User ids must pass [`UserId::is_path_safe`] before they are
//! used as file-name prefixes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use pocopi_core::TimelogRecord;
use pocopi_core::UserId;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::dto::FormKind;
use crate::dto::FormSubmission;
use crate::dto::User;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Result store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// User id is not safe to use as a storage key.
    #[error("invalid store key: {0}")]
    InvalidKey(String),
    /// Filesystem failure.
    #[error("store io error: {0}")]
    Io(String),
    /// Stored data could not be decoded.
    #[error("store data corrupt: {0}")]
    Corrupt(String),
    /// Store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: Interface
// ============================================================================

/// Participant result persistence.
pub trait ResultStore: Send + Sync {
    /// Saves a registered user, replacing any earlier registration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the user cannot be persisted.
    fn save_user(&self, user: &User) -> Result<(), StoreError>;

    /// Loads a registered user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when stored data cannot be read.
    fn load_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError>;

    /// Saves a questionnaire submission, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the submission cannot be persisted.
    fn save_form(&self, kind: FormKind, form: &FormSubmission) -> Result<(), StoreError>;

    /// Loads a questionnaire submission.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when stored data cannot be read.
    fn load_form(&self, kind: FormKind, user_id: &UserId)
    -> Result<Option<FormSubmission>, StoreError>;

    /// Appends a timelog record to the participant's history.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the record cannot be persisted.
    fn append_timelog(&self, record: &TimelogRecord) -> Result<(), StoreError>;

    /// Returns the participant's timelog history in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when stored data cannot be read.
    fn timelogs(&self, user_id: &UserId) -> Result<Vec<TimelogRecord>, StoreError>;
}

/// Rejects user ids that are unsafe as storage keys.
fn checked_key(user_id: &UserId) -> Result<&str, StoreError> {
    if user_id.is_path_safe() {
        Ok(user_id.as_str())
    } else {
        Err(StoreError::InvalidKey(user_id.to_string()))
    }
}

// ============================================================================
// SECTION: File Store
// ============================================================================

/// JSON-file result store rooted at a data directory.
#[derive(Debug)]
pub struct FileResultStore {
    /// Data directory.
    root: PathBuf,
    /// Serializes timelog appends.
    append_lock: Mutex<()>,
}

impl FileResultStore {
    /// Opens the store, creating the data directory when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| io_error(&root, &err))?;
        Ok(Self {
            root,
            append_lock: Mutex::new(()),
        })
    }

    /// Returns the data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of a per-user artifact.
    fn artifact(&self, user_id: &UserId, suffix: &str) -> Result<PathBuf, StoreError> {
        let key = checked_key(user_id)?;
        Ok(self.root.join(format!("{key}-{suffix}")))
    }

    /// Replaces a file atomically.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let mut temp = NamedTempFile::new_in(&self.root).map_err(|err| io_error(&self.root, &err))?;
        temp.write_all(bytes).map_err(|err| io_error(temp.path(), &err))?;
        temp.as_file().sync_all().map_err(|err| io_error(temp.path(), &err))?;
        temp.persist(path).map_err(|err| io_error(path, &err.error))?;
        Ok(())
    }

    /// Reads a JSON document, treating a missing file as absent.
    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(path, &err)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StoreError::Corrupt(format!("{}: {err}", path.display())))
    }
}

/// Formats an I/O failure with its path.
fn io_error(path: &Path, err: &io::Error) -> StoreError {
    StoreError::Io(format!("{}: {err}", path.display()))
}

impl ResultStore for FileResultStore {
    fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let path = self.artifact(user.username(), "user.json")?;
        let bytes = serde_json::to_vec(user).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        self.write_atomic(&path, &bytes)
    }

    fn load_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        Self::read_json(&self.artifact(user_id, "user.json")?)
    }

    fn save_form(&self, kind: FormKind, form: &FormSubmission) -> Result<(), StoreError> {
        let path = self.artifact(&form.user_id, &format!("{}.json", kind.suffix()))?;
        let bytes = serde_json::to_vec(form).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        self.write_atomic(&path, &bytes)
    }

    fn load_form(
        &self,
        kind: FormKind,
        user_id: &UserId,
    ) -> Result<Option<FormSubmission>, StoreError> {
        Self::read_json(&self.artifact(user_id, &format!("{}.json", kind.suffix()))?)
    }

    fn append_timelog(&self, record: &TimelogRecord) -> Result<(), StoreError> {
        let path = self.artifact(&record.user_id, "timelogs.jsonl")?;
        let mut line =
            serde_json::to_vec(record).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        line.push(b'\n');
        let _guard = self.append_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| io_error(&path, &err))?;
        file.write_all(&line).map_err(|err| io_error(&path, &err))?;
        file.sync_data().map_err(|err| io_error(&path, &err))
    }

    fn timelogs(&self, user_id: &UserId) -> Result<Vec<TimelogRecord>, StoreError> {
        let path = self.artifact(user_id, "timelogs.jsonl")?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(&path, &err)),
        };
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|err| {
                    StoreError::Corrupt(format!("{} line {}: {err}", path.display(), index + 1))
                })
            })
            .collect()
    }
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Stored state of the in-memory store.
#[derive(Debug, Default)]
struct MemoryState {
    /// Registered users.
    users: BTreeMap<UserId, User>,
    /// Questionnaire submissions keyed by user and form suffix.
    forms: BTreeMap<(UserId, &'static str), FormSubmission>,
    /// Timelog histories.
    timelogs: BTreeMap<UserId, Vec<TimelogRecord>>,
}

/// In-memory result store for tests and `storage.type = "memory"`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryResultStore {
    /// Shared state.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryResultStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a closure against the locked state.
    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> Result<T, StoreError> {
        let mut guard = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut guard))
    }
}

impl ResultStore for InMemoryResultStore {
    fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let key = UserId::new(checked_key(user.username())?);
        self.with_state(|state| {
            state.users.insert(key, user.clone());
        })
    }

    fn load_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        checked_key(user_id)?;
        self.with_state(|state| state.users.get(user_id).cloned())
    }

    fn save_form(&self, kind: FormKind, form: &FormSubmission) -> Result<(), StoreError> {
        checked_key(&form.user_id)?;
        self.with_state(|state| {
            state.forms.insert((form.user_id.clone(), kind.suffix()), form.clone());
        })
    }

    fn load_form(
        &self,
        kind: FormKind,
        user_id: &UserId,
    ) -> Result<Option<FormSubmission>, StoreError> {
        checked_key(user_id)?;
        self.with_state(|state| state.forms.get(&(user_id.clone(), kind.suffix())).cloned())
    }

    fn append_timelog(&self, record: &TimelogRecord) -> Result<(), StoreError> {
        checked_key(&record.user_id)?;
        self.with_state(|state| {
            state.timelogs.entry(record.user_id.clone()).or_default().push(record.clone());
        })
    }

    fn timelogs(&self, user_id: &UserId) -> Result<Vec<TimelogRecord>, StoreError> {
        checked_key(user_id)?;
        self.with_state(|state| state.timelogs.get(user_id).cloned().unwrap_or_default())
    }
}
