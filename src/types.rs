//! NewType wrappers for strong typing throughout the history store.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a conversation id where a message id is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// External user identifier injected by the reverse proxy.
    ///
    /// This is the principal id from the authentication headers (an AAD
    /// object id in hosted deployments). Every per-user query in the store
    /// is scoped by this value; it plays the role the partition key played
    /// in the original document database.
    UserId
);

newtype_string!(
    /// Identifier of a conversation record.
    ///
    /// A UUID string chosen by the store when the conversation is created.
    /// Messages reference their parent conversation through this id.
    ConversationId
);

newtype_string!(
    /// Identifier of a message record.
    ///
    /// Supplied by the caller (the frontend generates one per message) so
    /// that retried writes land on the same record.
    MessageId
);

newtype_string!(
    /// An invitation code a user presents to join the application.
    ///
    /// Compared verbatim against the stored invitation for the user's email.
    InvitationCode
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_creation() {
        let id = UserId::new("00000000-0000-0000-0000-000000000000");
        assert_eq!(id.as_str(), "00000000-0000-0000-0000-000000000000");
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_conversation_id_from_string() {
        let id: ConversationId = "abc123".into();
        assert_eq!(id.as_str(), "abc123");

        let id: ConversationId = String::from("xyz789").into();
        assert_eq!(id.as_str(), "xyz789");
    }

    #[test]
    fn test_message_id_into_inner() {
        let id = MessageId::new("msg-1");
        let inner: String = id.into_inner();
        assert_eq!(inner, "msg-1");
    }

    #[test]
    fn test_user_id_serde() {
        let id = UserId::new("user123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user123\"");

        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_type_equality() {
        let id1 = InvitationCode::new("CODE-1");
        let id2 = InvitationCode::new("CODE-1");
        let id3 = InvitationCode::new("CODE-2");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_as_ref_and_borrow() {
        use std::borrow::Borrow;

        let id = ConversationId::new("conv-1");
        let s: &str = id.as_ref();
        assert_eq!(s, "conv-1");
        let s: &str = id.borrow();
        assert_eq!(s, "conv-1");
    }
}
