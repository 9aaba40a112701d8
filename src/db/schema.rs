use serde::{Deserialize, Serialize};
use surrealdb::{RecordId, sql::Datetime};

use crate::types::{ConversationId, InvitationCode, MessageId, UserId};

/// Persisted representation of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Database-internal record identifier (table: `conversation`).
    pub id: RecordId,
    /// Stable UUID string handed to clients.
    pub conversation_id: ConversationId,
    /// Owning user. Every query against this table is scoped by this value.
    pub user_id: UserId,
    /// Email of the owning user, as reported by the identity headers.
    pub user_email: String,
    /// Display title of the conversation.
    pub title: String,
    /// When this conversation was created.
    pub created_at: Datetime,
    /// When this conversation last received a message (or was renamed).
    pub updated_at: Datetime,
}

/// Persisted representation of a single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Database-internal record identifier (table: `message`).
    pub id: RecordId,
    /// Caller-supplied stable message identifier.
    pub message_id: MessageId,
    /// Owning user.
    pub user_id: UserId,
    /// Email of the owning user.
    pub user_email: String,
    /// Parent conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Chat role ("user", "assistant", "tool", ...).
    pub role: String,
    /// Message body.
    pub content: String,
    /// User feedback on this message. Only present on deployments with
    /// message feedback enabled; starts out as an empty string there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// When this message was written.
    pub created_at: Datetime,
    /// When this message was last touched (feedback updates).
    pub updated_at: Datetime,
}

/// Persisted representation of an application user (table: `app_user`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Database-internal record identifier.
    pub id: RecordId,
    /// External principal id from the identity headers.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Application role label.
    pub role: String,
    /// When this record was first created.
    pub created_at: Datetime,
}

/// Persisted representation of an invitation (table: `invitation`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationRecord {
    /// Database-internal record identifier.
    pub id: RecordId,
    /// Email the invitation was issued for. Plays the partition-key role:
    /// invitation lookups are always scoped by email.
    pub email: String,
    /// Code the user must present.
    pub invitation_code: InvitationCode,
    /// Whether the invitation has been redeemed at least once.
    pub has_checked_invitation: bool,
    /// When the invitation was last checked successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<Datetime>,
}

/// Incoming message payload: the two caller-controlled fields of a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageInput {
    pub role: String,
    pub content: String,
}

/// Sort direction for conversation listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// SQL keyword for this direction. Used when building ORDER BY clauses,
    /// since sort direction cannot be a bound parameter.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Outcome of writing a message.
///
/// A message write must also advance its parent conversation's `updated_at`;
/// when the parent does not exist there is nothing to advance, and the caller
/// needs to distinguish that from a database failure.
#[derive(Debug, Clone)]
pub enum MessageWrite {
    /// The message was stored and the parent conversation was touched.
    Created(MessageRecord),
    /// No conversation with the given id exists for this user.
    ConversationNotFound,
}

impl MessageWrite {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Result of validating an invitation code against the stored invitation.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationCheck {
    /// Whether the presented code matched.
    pub valid: bool,
    /// Failure reason when `valid` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The redeemed invitation when `valid` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation: Option<InvitationRecord>,
}

impl InvitationCheck {
    pub fn valid(invitation: InvitationRecord) -> Self {
        Self {
            valid: true,
            reason: None,
            invitation: Some(invitation),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            invitation: None,
        }
    }
}
