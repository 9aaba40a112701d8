// Core modules
mod db;
mod history;
pub mod api;
pub mod auth;
mod types;

// Re-export key types and functions
pub use db::{ConnectError, DatabaseConfig, Db, create_connection, ensure_schema};
pub use history::{HistoryStore, InvitationStore, UserDirectory};
pub use types::{ConversationId, InvitationCode, MessageId, UserId};

use std::sync::Arc;

use anyhow::Result;

use crate::api::AppState;

/// Convenience function to create a fully wired application state.
///
/// Connects to the database, makes sure the schema exists, and builds the
/// three stores the HTTP router works against.
pub async fn create_app_state(config: DatabaseConfig) -> Result<Arc<AppState>> {
    let enable_message_feedback = config.enable_message_feedback;
    let db = create_connection(config).await?;
    ensure_schema(&db).await?;

    Ok(Arc::new(AppState {
        history: HistoryStore::new(db.clone(), enable_message_feedback),
        users: UserDirectory::new(db.clone()),
        invitations: InvitationStore::new(db),
    }))
}
