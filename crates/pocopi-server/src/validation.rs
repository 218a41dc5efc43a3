// crates/pocopi-server/src/validation.rs
// ============================================================================
// Module: Request Validation
// Description: Explicit validation pass over untrusted JSON bodies.
// Purpose: Turn request bodies into typed values or dotted-path field errors.
// Dependencies: pocopi-core, serde_json
// ============================================================================

//! ## Overview
//! Each validator walks a JSON body once, records every failed constraint in
//! field order, and returns either a typed value or [`ValidationErrors`].
//! Endpoints report the first error; nested fields are addressed with dotted
//! paths such as `events.2.optionId`. Unknown properties are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use pocopi_core::Config;
use pocopi_core::GroupLabel;
use pocopi_core::MAX_USER_ID_LENGTH;
use pocopi_core::OptionEvent;
use pocopi_core::OptionEventKind;
use pocopi_core::OptionId;
use pocopi_core::PhaseId;
use pocopi_core::QuestionId;
use pocopi_core::TimelogRecord;
use pocopi_core::Timestamp;
use pocopi_core::UserId;
use serde_json::Map;
use serde_json::Value;

use crate::dto::FormSubmission;
use crate::dto::Identity;
use crate::dto::NewUser;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted name length.
const MAX_NAME_LENGTH: usize = 200;
/// Maximum accepted email length.
const MAX_EMAIL_LENGTH: usize = 254;
/// Accepted participant ages.
const AGE_RANGE: std::ops::RangeInclusive<u64> = 1 ..= 150;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// One failed constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the offending field; empty for the body itself.
    pub path: String,
    /// Constraint description.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} {}", self.path, self.message)
        }
    }
}

/// Failed validation pass.
///
/// # Invariants
/// - Holds at least one error, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Wraps a single error.
    fn single(error: FieldError) -> Self {
        Self(vec![error])
    }

    /// Returns the first failed constraint.
    #[must_use]
    pub fn first(&self) -> Option<&FieldError> {
        self.0.first()
    }

    /// Returns every failed constraint in field order.
    #[must_use]
    pub fn all(&self) -> &[FieldError] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first() {
            Some(error) => error.fmt(f),
            None => f.write_str("request is invalid"),
        }
    }
}

// ============================================================================
// SECTION: Validation Pass
// ============================================================================

/// Error accumulator for one validation pass.
struct Pass {
    /// Failed constraints in field order.
    errors: Vec<FieldError>,
}

impl Pass {
    /// Starts an empty pass.
    const fn new() -> Self {
        Self {
            errors: Vec::new(),
        }
    }

    /// Records a field result, yielding the value when it passed.
    fn check<T>(&mut self, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.errors.push(error);
                None
            }
        }
    }

    /// Records a failed constraint.
    fn fail(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Ends the pass, building the value only when every field passed.
    fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        if !self.errors.is_empty() {
            return Err(ValidationErrors(self.errors));
        }
        build().ok_or_else(|| {
            ValidationErrors::single(FieldError {
                path: String::new(),
                message: "request is invalid".to_string(),
            })
        })
    }
}

/// JSON object under validation.
struct Fields<'a> {
    /// Dotted path of the object; empty for the body.
    prefix: String,
    /// Object members.
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Views the request body as an object.
    fn root(value: &'a Value) -> Result<Self, ValidationErrors> {
        match value {
            Value::Object(map) => Ok(Self {
                prefix: String::new(),
                map,
            }),
            _ => Err(ValidationErrors::single(FieldError {
                path: String::new(),
                message: "request body must be a JSON object".to_string(),
            })),
        }
    }

    /// Views a nested value as an object.
    fn nested(value: &'a Value, path: String) -> Result<Self, FieldError> {
        match value {
            Value::Object(map) => Ok(Self {
                prefix: path,
                map,
            }),
            _ => Err(FieldError {
                path,
                message: "must be an object".to_string(),
            }),
        }
    }

    /// Returns the dotted path of a member.
    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() { key.to_string() } else { format!("{}.{key}", self.prefix) }
    }

    /// Builds an error for a member.
    fn error(&self, key: &str, message: impl Into<String>) -> FieldError {
        FieldError {
            path: self.path(key),
            message: message.into(),
        }
    }

    /// Returns a member, treating `null` as absent.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|value| !value.is_null())
    }

    /// Records an error for every member outside `allowed`.
    fn reject_unknown(&self, allowed: &[&str], pass: &mut Pass) {
        for key in self.map.keys().filter(|key| !allowed.contains(&key.as_str())) {
            pass.fail(self.error(key, "should not exist"));
        }
    }

    /// Reads a non-empty string member.
    fn non_empty_string(&self, key: &str) -> Result<&'a str, FieldError> {
        match self.get(key) {
            Some(Value::String(text)) if !text.trim().is_empty() => Ok(text),
            _ => Err(self.error(key, "must be a non-empty string")),
        }
    }

    /// Reads a boolean member.
    fn boolean(&self, key: &str) -> Result<bool, FieldError> {
        self.get(key).and_then(Value::as_bool).ok_or_else(|| self.error(key, "must be a boolean"))
    }

    /// Reads a non-negative integer member.
    fn unsigned(&self, key: &str) -> Result<u64, FieldError> {
        self.get(key)
            .and_then(Value::as_u64)
            .ok_or_else(|| self.error(key, "must be a non-negative integer"))
    }

    /// Reads a non-negative integer member that fits in 32 bits.
    fn counter(&self, key: &str) -> Result<u32, FieldError> {
        self.get(key)
            .and_then(Value::as_u64)
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| self.error(key, "must be a non-negative integer"))
    }

    /// Reads a positive 32-bit identifier member.
    fn positive_id(&self, key: &str) -> Result<u32, FieldError> {
        self.get(key)
            .and_then(Value::as_u64)
            .filter(|value| *value > 0)
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| self.error(key, "must be a positive integer"))
    }

    /// Reads a path-safe user identifier member.
    fn user_id(&self, key: &str) -> Result<UserId, FieldError> {
        let id = UserId::new(self.non_empty_string(key)?);
        if id.is_path_safe() {
            Ok(id)
        } else {
            Err(self.error(
                key,
                format!(
                    "must be at most {MAX_USER_ID_LENGTH} letters, digits, '-', '_' or '.' and not \
                     start with '.'"
                ),
            ))
        }
    }

    /// Reads an array member.
    fn array(&self, key: &str) -> Result<&'a Vec<Value>, FieldError> {
        self.get(key).and_then(Value::as_array).ok_or_else(|| self.error(key, "must be an array"))
    }

    /// Reads an option event kind member.
    fn event_kind(&self, key: &str) -> Result<OptionEventKind, FieldError> {
        self.get(key)
            .and_then(Value::as_str)
            .and_then(OptionEventKind::parse)
            .ok_or_else(|| self.error(key, "must be one of select, deselect, hover"))
    }
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Validates a registration body.
///
/// # Errors
///
/// Returns [`ValidationErrors`] when any constraint fails.
pub fn validate_user(body: &Value, config: &Config) -> Result<NewUser, ValidationErrors> {
    let fields = Fields::root(body)?;
    let mut pass = Pass::new();
    fields.reject_unknown(&["username", "anonymous", "group", "name", "email", "age"], &mut pass);

    let username = pass.check(fields.user_id("username"));
    let group = match fields.get("group") {
        None => Some(None),
        Some(_) => pass
            .check(fields.non_empty_string("group").and_then(|label| {
                let label = GroupLabel::new(label);
                if config.group(&label).is_some() {
                    Ok(label)
                } else {
                    Err(fields.error("group", "must reference a configured group"))
                }
            }))
            .map(Some),
    };
    let identity = match pass.check(fields.boolean("anonymous")) {
        Some(true) => {
            for key in ["name", "email", "age"] {
                if fields.get(key).is_some() {
                    pass.fail(fields.error(key, "must be absent when anonymous is true"));
                }
            }
            Some(Identity::Anonymous)
        }
        Some(false) => {
            let name = pass.check(name(&fields, "name"));
            let email = pass.check(email(&fields, "email"));
            let age = pass.check(age(&fields, "age"));
            match (name, email, age) {
                (Some(name), Some(email), Some(age)) => Some(Identity::Identified {
                    name,
                    email,
                    age,
                }),
                _ => None,
            }
        }
        None => None,
    };

    pass.finish(|| {
        Some(NewUser {
            username: username?,
            group: group?,
            identity: identity?,
        })
    })
}

/// Reads a participant name.
fn name(fields: &Fields<'_>, key: &str) -> Result<String, FieldError> {
    let value = fields.non_empty_string(key)?.trim();
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(fields.error(key, format!("must be at most {MAX_NAME_LENGTH} characters")));
    }
    Ok(value.to_string())
}

/// Reads a contact email address.
fn email(fields: &Fields<'_>, key: &str) -> Result<String, FieldError> {
    let invalid = || fields.error(key, "must be a valid email address");
    let value = fields.non_empty_string(key).map_err(|_| invalid())?.trim();
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    let well_formed = value.len() <= MAX_EMAIL_LENGTH
        && !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
        && !value.chars().any(char::is_whitespace);
    if well_formed { Ok(value.to_string()) } else { Err(invalid()) }
}

/// Reads a participant age.
fn age(fields: &Fields<'_>, key: &str) -> Result<u8, FieldError> {
    fields
        .get(key)
        .and_then(Value::as_u64)
        .filter(|value| AGE_RANGE.contains(value))
        .and_then(|value| u8::try_from(value).ok())
        .ok_or_else(|| {
            fields.error(
                key,
                format!(
                    "must be an integer between {} and {}",
                    AGE_RANGE.start(),
                    AGE_RANGE.end()
                ),
            )
        })
}

// ============================================================================
// SECTION: Forms
// ============================================================================

/// Validates a questionnaire submission body.
///
/// # Errors
///
/// Returns [`ValidationErrors`] when any constraint fails.
pub fn validate_form(body: &Value) -> Result<FormSubmission, ValidationErrors> {
    let fields = Fields::root(body)?;
    let mut pass = Pass::new();
    fields.reject_unknown(&["userId", "answers"], &mut pass);

    let user_id = pass.check(fields.user_id("userId"));
    let answers = match fields.array("answers") {
        Ok(items) if items.is_empty() => {
            pass.fail(fields.error("answers", "must be a non-empty array"));
            None
        }
        Ok(items) => {
            let mut answers = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(answer) => answers.push(answer.to_string()),
                    None => pass.fail(FieldError {
                        path: fields.path(&format!("answers.{index}")),
                        message: "must be a string".to_string(),
                    }),
                }
            }
            Some(answers)
        }
        Err(_) => {
            pass.fail(fields.error("answers", "must be a non-empty array"));
            None
        }
    };

    pass.finish(|| {
        Some(FormSubmission {
            user_id: user_id?,
            answers: answers?,
        })
    })
}

// ============================================================================
// SECTION: Timelogs
// ============================================================================

/// Members accepted in a timelog body.
const TIMELOG_FIELDS: &[&str] = &[
    "userId",
    "phaseId",
    "questionId",
    "startTimestamp",
    "endTimestamp",
    "correct",
    "skipped",
    "totalOptionChanges",
    "totalOptionHovers",
    "events",
];

/// Validates a timelog body against the loaded configuration.
///
/// # Errors
///
/// Returns [`ValidationErrors`] when any constraint fails, including
/// references to phases, questions, or options that do not exist.
pub fn validate_timelog(body: &Value, config: &Config) -> Result<TimelogRecord, ValidationErrors> {
    let fields = Fields::root(body)?;
    let mut pass = Pass::new();
    fields.reject_unknown(TIMELOG_FIELDS, &mut pass);

    let user_id = pass.check(fields.user_id("userId"));
    let phase_id = pass.check(fields.positive_id("phaseId")).map(PhaseId::new);
    let question_id = pass.check(fields.positive_id("questionId")).map(QuestionId::new);
    let start = pass.check(fields.unsigned("startTimestamp")).map(Timestamp::from_millis);
    let end = pass.check(fields.unsigned("endTimestamp")).map(Timestamp::from_millis);
    let correct = pass.check(fields.boolean("correct"));
    let skipped = pass.check(fields.boolean("skipped"));
    let changes = pass.check(fields.counter("totalOptionChanges"));
    let hovers = pass.check(fields.counter("totalOptionHovers"));
    let events = pass.check(fields.array("events")).map(|items| {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| option_event(item, fields.path(&format!("events.{index}")), &mut pass))
            .collect::<Vec<_>>()
    });

    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        pass.fail(fields.error("endTimestamp", "must not be before startTimestamp"));
    }
    if correct == Some(true) && skipped == Some(true) {
        pass.fail(fields.error("correct", "must be false when skipped is true"));
    }
    if let Some(question_id) = question_id {
        match config.find_question(question_id) {
            None => pass.fail(fields.error("questionId", "does not reference a configured question")),
            Some((_, phase, question)) => {
                if phase_id.is_some_and(|phase_id| phase_id != phase.id) {
                    pass.fail(fields.error(
                        "phaseId",
                        format!("does not match the phase of question {question_id}"),
                    ));
                }
                for (index, event) in events.iter().flatten().enumerate() {
                    if let Some(event) = event
                        && question.option(event.option_id).is_none()
                    {
                        pass.fail(fields.error(
                            &format!("events.{index}.optionId"),
                            format!("does not belong to question {question_id}"),
                        ));
                    }
                }
            }
        }
    }

    pass.finish(|| {
        Some(TimelogRecord {
            user_id: user_id?,
            phase_id: phase_id?,
            question_id: question_id?,
            start_timestamp: start?,
            end_timestamp: end?,
            correct: correct?,
            skipped: skipped?,
            total_option_changes: changes?,
            total_option_hovers: hovers?,
            events: events?.into_iter().collect::<Option<Vec<_>>>()?,
        })
    })
}

/// Validates one element of a timelog event log.
fn option_event(item: &Value, path: String, pass: &mut Pass) -> Option<OptionEvent> {
    let fields = pass.check(Fields::nested(item, path))?;
    fields.reject_unknown(&["optionId", "type", "timestamp"], pass);
    let option_id = pass.check(fields.positive_id("optionId")).map(OptionId::new);
    let kind = pass.check(fields.event_kind("type"));
    let timestamp = pass.check(fields.unsigned("timestamp")).map(Timestamp::from_millis);
    Some(OptionEvent {
        kind: kind?,
        option_id: option_id?,
        timestamp: timestamp?,
    })
}

// ============================================================================
// SECTION: Option Events
// ============================================================================

/// Validated WebSocket option event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEventFrame {
    /// Option the interaction targeted.
    pub option_id: OptionId,
    /// Participant identifier.
    pub username: UserId,
    /// Interaction kind.
    pub kind: OptionEventKind,
}

/// Validates a WebSocket option event frame.
///
/// # Errors
///
/// Returns [`ValidationErrors`] when any constraint fails.
pub fn validate_option_event(body: &Value) -> Result<OptionEventFrame, ValidationErrors> {
    let fields = Fields::root(body)?;
    let mut pass = Pass::new();
    fields.reject_unknown(&["optionId", "username", "type"], &mut pass);
    let option_id = pass.check(fields.positive_id("optionId")).map(OptionId::new);
    let username = pass.check(fields.user_id("username"));
    let kind = pass.check(fields.event_kind("type"));
    pass.finish(|| {
        Some(OptionEventFrame {
            option_id: option_id?,
            username: username?,
            kind: kind?,
        })
    })
}
