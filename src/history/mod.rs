//! Conversation history persistence.
//!
//! Three stores share one database connection:
//!
//! - [`HistoryStore`] — conversations and their messages
//! - [`UserDirectory`] — application user records
//! - [`InvitationStore`] — invitation code validation
//!
//! All operations are single, sequential writes. There are no transactions:
//! the one cross-record rule (a message write advances its parent
//! conversation's `updated_at`) is enforced by two back-to-back writes, and
//! a failure of the second write leaves the first in place.

mod invitations;
mod store;
mod users;

pub use invitations::InvitationStore;
pub use store::HistoryStore;
pub use users::UserDirectory;
