use anyhow::{Result, anyhow};
use chrono::Utc;
use surrealdb::sql::Datetime;
use tracing::debug;
use uuid::Uuid;

use crate::db::{
    CONVERSATION_TABLE, ConversationRecord, Db, INVITATION_TABLE, MESSAGE_TABLE, MessageInput,
    MessageRecord, MessageWrite, SortOrder, USER_TABLE,
};
use crate::types::{ConversationId, MessageId, UserId};

/// Store for conversations and their messages.
///
/// A thin async wrapper over the document database: parameterized queries in,
/// typed records out. Errors from the database propagate as-is except where
/// a method documents a sentinel (`ensure`, `MessageWrite`).
#[derive(Clone)]
pub struct HistoryStore {
    db: Db,
    enable_message_feedback: bool,
}

impl HistoryStore {
    /// Create a new history store.
    ///
    /// When `enable_message_feedback` is set, newly written messages carry an
    /// empty `feedback` field that can later be filled via
    /// [`update_message_feedback`](Self::update_message_feedback).
    pub fn new(db: Db, enable_message_feedback: bool) -> Self {
        Self {
            db,
            enable_message_feedback,
        }
    }

    /// Get reference to the database.
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Read-probe the database and each table.
    ///
    /// Returns `(healthy, diagnostic)` and never errors; the diagnostic names
    /// the first thing that failed so a misconfigured deployment is easy to
    /// pinpoint.
    pub async fn ensure(&self) -> (bool, String) {
        if let Err(e) = self.db.query("INFO FOR DB").await {
            return (false, format!("history database not reachable: {}", e));
        }

        for table in [
            CONVERSATION_TABLE,
            MESSAGE_TABLE,
            USER_TABLE,
            INVITATION_TABLE,
        ] {
            let probe = self
                .db
                .query(format!("SELECT * FROM {} LIMIT 1", table))
                .await;
            if let Err(e) = probe {
                return (false, format!("table {} not readable: {}", table, e));
            }
        }

        (true, "history store ready".to_string())
    }

    /// Create a new conversation for a user.
    ///
    /// Assigns a fresh UUID and stamps both timestamps with the same instant.
    pub async fn create_conversation(
        &self,
        user_id: &UserId,
        user_email: &str,
        title: &str,
    ) -> Result<ConversationRecord> {
        let conversation_id = ConversationId::new(Uuid::new_v4().to_string());
        let now = Datetime::from(Utc::now());

        debug!(user_id = %user_id, conversation_id = %conversation_id, "creating conversation");

        let mut res = self
            .db
            .query(
                r#"
                CREATE conversation CONTENT {
                    conversation_id: $conversation_id,
                    user_id: $user_id,
                    user_email: $user_email,
                    title: $title,
                    created_at: $now,
                    updated_at: $now
                }
                "#,
            )
            .bind(("conversation_id", conversation_id))
            .bind(("user_id", user_id.clone()))
            .bind(("user_email", user_email.to_string()))
            .bind(("title", title.to_string()))
            .bind(("now", now))
            .await?;

        let created: Option<ConversationRecord> = res.take(0)?;
        created.ok_or_else(|| anyhow!("no response from conversation create"))
    }

    /// Persist a conversation, creating it when it does not exist yet.
    pub async fn upsert_conversation(
        &self,
        conversation: &ConversationRecord,
    ) -> Result<ConversationRecord> {
        let mut res = self
            .db
            .query(
                r#"
                UPSERT conversation SET
                    conversation_id = $conversation_id,
                    user_id = $user_id,
                    user_email = $user_email,
                    title = $title,
                    created_at = $created_at,
                    updated_at = $updated_at
                WHERE conversation_id = $conversation_id
                  AND user_id = $user_id
                "#,
            )
            .bind(("conversation_id", conversation.conversation_id.clone()))
            .bind(("user_id", conversation.user_id.clone()))
            .bind(("user_email", conversation.user_email.clone()))
            .bind(("title", conversation.title.clone()))
            .bind(("created_at", conversation.created_at.clone()))
            .bind(("updated_at", conversation.updated_at.clone()))
            .await?;

        let updated: Vec<ConversationRecord> = res.take(0)?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no response from conversation upsert"))
    }

    /// List a user's conversations ordered by `updated_at`.
    ///
    /// `limit`/`offset` page through the listing; passing `None` for the
    /// limit returns everything.
    pub async fn get_conversations(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        sort_order: SortOrder,
        offset: i64,
    ) -> Result<Vec<ConversationRecord>> {
        let mut query = format!(
            "SELECT * FROM conversation WHERE user_id = $user_id ORDER BY updated_at {}",
            sort_order.as_sql()
        );
        if limit.is_some() {
            query.push_str(" LIMIT $limit START $offset");
        }

        let mut q = self.db.query(query).bind(("user_id", user_id.clone()));
        if let Some(limit) = limit {
            q = q.bind(("limit", limit)).bind(("offset", offset));
        }

        let mut res = q.await?;
        let conversations: Vec<ConversationRecord> = res.take(0)?;
        Ok(conversations)
    }

    /// Fetch a single conversation, or `None` when it does not exist.
    pub async fn get_conversation(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationRecord>> {
        let mut res = self
            .db
            .query(
                r#"
                SELECT * FROM conversation
                WHERE conversation_id = $conversation_id
                  AND user_id = $user_id
                LIMIT 1
                "#,
            )
            .bind(("conversation_id", conversation_id.clone()))
            .bind(("user_id", user_id.clone()))
            .await?;

        let conversations: Vec<ConversationRecord> = res.take(0)?;
        Ok(conversations.into_iter().next())
    }

    /// Delete a conversation.
    ///
    /// Idempotent: deleting a conversation that does not exist is a success.
    pub async fn delete_conversation(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<bool> {
        self.db
            .query(
                r#"
                DELETE conversation
                WHERE conversation_id = $conversation_id
                  AND user_id = $user_id
                "#,
            )
            .bind(("conversation_id", conversation_id.clone()))
            .bind(("user_id", user_id.clone()))
            .await?;

        Ok(true)
    }

    /// Delete all messages of a conversation, returning the deleted records.
    pub async fn delete_messages(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<Vec<MessageRecord>> {
        let mut res = self
            .db
            .query(
                r#"
                DELETE message
                WHERE conversation_id = $conversation_id
                  AND user_id = $user_id
                RETURN BEFORE
                "#,
            )
            .bind(("conversation_id", conversation_id.clone()))
            .bind(("user_id", user_id.clone()))
            .await?;

        let deleted: Vec<MessageRecord> = res.take(0)?;
        Ok(deleted)
    }

    /// Write a message into a conversation.
    ///
    /// Upserts by `(user_id, message_id)` so a retried write lands on the
    /// same record, then advances the parent conversation's `updated_at` to
    /// the message's `created_at`. The two writes are sequential and not
    /// atomic. Returns [`MessageWrite::ConversationNotFound`] when no parent
    /// conversation exists for this user.
    pub async fn create_message(
        &self,
        message_id: &MessageId,
        conversation_id: &ConversationId,
        user_id: &UserId,
        input: &MessageInput,
        user_email: &str,
    ) -> Result<MessageWrite> {
        let now = Datetime::from(Utc::now());
        // Feedback starts out empty; NONE keeps the field off the record.
        let feedback: Option<String> = self.enable_message_feedback.then(String::new);

        let mut res = self
            .db
            .query(
                r#"
                UPSERT message SET
                    message_id = $message_id,
                    user_id = $user_id,
                    user_email = $user_email,
                    conversation_id = $conversation_id,
                    role = $role,
                    content = $content,
                    feedback = $feedback,
                    created_at = $now,
                    updated_at = $now
                WHERE message_id = $message_id
                  AND user_id = $user_id
                "#,
            )
            .bind(("message_id", message_id.clone()))
            .bind(("user_id", user_id.clone()))
            .bind(("user_email", user_email.to_string()))
            .bind(("conversation_id", conversation_id.clone()))
            .bind(("role", input.role.clone()))
            .bind(("content", input.content.clone()))
            .bind(("feedback", feedback))
            .bind(("now", now))
            .await?;

        let written: Vec<MessageRecord> = res.take(0)?;
        let message = written
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no response from message upsert"))?;

        // The parent conversation's updated_at follows the newest message.
        let Some(mut conversation) = self.get_conversation(user_id, conversation_id).await? else {
            return Ok(MessageWrite::ConversationNotFound);
        };
        conversation.updated_at = message.created_at.clone();
        self.upsert_conversation(&conversation).await?;

        Ok(MessageWrite::Created(message))
    }

    /// Set the feedback field of a message.
    ///
    /// Returns the updated record, or `None` when no such message exists for
    /// this user.
    pub async fn update_message_feedback(
        &self,
        user_id: &UserId,
        message_id: &MessageId,
        feedback: &str,
    ) -> Result<Option<MessageRecord>> {
        let now = Datetime::from(Utc::now());

        let mut res = self
            .db
            .query(
                r#"
                UPDATE message SET
                    feedback = $feedback,
                    updated_at = $now
                WHERE message_id = $message_id
                  AND user_id = $user_id
                "#,
            )
            .bind(("feedback", feedback.to_string()))
            .bind(("now", now))
            .bind(("message_id", message_id.clone()))
            .bind(("user_id", user_id.clone()))
            .await?;

        let updated: Vec<MessageRecord> = res.take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Fetch the messages of a conversation, oldest first.
    pub async fn get_messages(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<Vec<MessageRecord>> {
        let mut res = self
            .db
            .query(
                r#"
                SELECT * FROM message
                WHERE conversation_id = $conversation_id
                  AND user_id = $user_id
                ORDER BY created_at ASC
                "#,
            )
            .bind(("conversation_id", conversation_id.clone()))
            .bind(("user_id", user_id.clone()))
            .await?;

        let messages: Vec<MessageRecord> = res.take(0)?;
        Ok(messages)
    }
}
