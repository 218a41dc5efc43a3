// crates/pocopi-server/src/dto.rs
// ============================================================================
// Module: Wire Types
// Description: Validated request payloads and stored records.
// Purpose: Give handlers typed values once validation has passed.
// Dependencies: pocopi-core, serde
// ============================================================================

//! ## Overview
//! Users are a tagged union: an anonymous participant carries no personal
//! data, an identified one always carries name, email, and age. Request
//! payloads are decoded by the validation pass, never directly by serde, so
//! these types only describe already-valid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use pocopi_core::Group;
use pocopi_core::GroupLabel;
use pocopi_core::OptionEventKind;
use pocopi_core::OptionId;
use pocopi_core::ProtocolLabel;
use pocopi_core::Timestamp;
use pocopi_core::UserId;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Users
// ============================================================================

/// Registered participant without personal data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousUser {
    /// Participant identifier.
    pub username: UserId,
    /// Assigned group.
    pub group: GroupLabel,
    /// Protocol of the assigned group.
    pub protocol: ProtocolLabel,
}

/// Registered participant with personal data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifiedUser {
    /// Participant identifier.
    pub username: UserId,
    /// Assigned group.
    pub group: GroupLabel,
    /// Protocol of the assigned group.
    pub protocol: ProtocolLabel,
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Age in years.
    pub age: u8,
}

/// Registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum User {
    /// Anonymous participant.
    Anonymous(AnonymousUser),
    /// Identified participant.
    Identified(IdentifiedUser),
}

impl User {
    /// Returns the participant identifier.
    #[must_use]
    pub const fn username(&self) -> &UserId {
        match self {
            Self::Anonymous(user) => &user.username,
            Self::Identified(user) => &user.username,
        }
    }

    /// Returns the assigned group.
    #[must_use]
    pub const fn group(&self) -> &GroupLabel {
        match self {
            Self::Anonymous(user) => &user.group,
            Self::Identified(user) => &user.group,
        }
    }

    /// Returns the protocol of the assigned group.
    #[must_use]
    pub const fn protocol(&self) -> &ProtocolLabel {
        match self {
            Self::Anonymous(user) => &user.protocol,
            Self::Identified(user) => &user.protocol,
        }
    }
}

/// Personal data supplied at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No personal data.
    Anonymous,
    /// Name, email, and age.
    Identified {
        /// Full name.
        name: String,
        /// Contact email.
        email: String,
        /// Age in years.
        age: u8,
    },
}

/// Validated registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Requested participant identifier.
    pub username: UserId,
    /// Explicitly requested group; sampled when absent.
    pub group: Option<GroupLabel>,
    /// Personal data.
    pub identity: Identity,
}

impl NewUser {
    /// Completes the registration with the assigned group.
    #[must_use]
    pub fn into_user(self, group: &Group) -> User {
        let username = self.username;
        let protocol = group.protocol().label.clone();
        let group = group.label().clone();
        match self.identity {
            Identity::Anonymous => User::Anonymous(AnonymousUser {
                username,
                group,
                protocol,
            }),
            Identity::Identified {
                name,
                email,
                age,
            } => User::Identified(IdentifiedUser {
                username,
                group,
                protocol,
                name,
                email,
                age,
            }),
        }
    }
}

/// Registration response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCreated {
    /// Participant identifier.
    pub username: UserId,
    /// Assigned group.
    pub group: GroupLabel,
    /// Protocol of the assigned group.
    pub protocol: ProtocolLabel,
}

impl From<&User> for UserCreated {
    fn from(user: &User) -> Self {
        Self {
            username: user.username().clone(),
            group: user.group().clone(),
            protocol: user.protocol().clone(),
        }
    }
}

// ============================================================================
// SECTION: Forms
// ============================================================================

/// Questionnaire kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    /// Questionnaire answered before the test.
    PreTest,
    /// Questionnaire answered after the test.
    PostTest,
}

impl FormKind {
    /// Returns the file-name suffix for stored submissions.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::PreTest => "pre-test",
            Self::PostTest => "post-test",
        }
    }
}

/// Questionnaire submission, stored exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    /// Participant identifier.
    pub user_id: UserId,
    /// Answers in question order.
    pub answers: Vec<String>,
}

// ============================================================================
// SECTION: Option Events
// ============================================================================

/// Live option interaction received over the WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionEventNotice {
    /// Option the interaction targeted.
    pub option_id: OptionId,
    /// Participant identifier.
    pub username: UserId,
    /// Interaction kind.
    #[serde(rename = "type")]
    pub kind: OptionEventKind,
    /// Server receive time.
    pub received_at: Timestamp,
}
