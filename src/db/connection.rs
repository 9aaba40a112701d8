use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

/// Table holding conversation records.
pub const CONVERSATION_TABLE: &str = "conversation";
/// Table holding message records.
pub const MESSAGE_TABLE: &str = "message";
/// Table holding application user records.
pub const USER_TABLE: &str = "app_user";
/// Table holding invitation records.
pub const INVITATION_TABLE: &str = "invitation";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Whether newly created messages carry a (initially empty) feedback field.
    pub enable_message_feedback: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("CHAT_HISTORY_DB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("CHAT_HISTORY_DB_NAMESPACE")
                .unwrap_or_else(|_| "chat".to_string()),
            database: env::var("CHAT_HISTORY_DB_DATABASE")
                .unwrap_or_else(|_| "history".to_string()),
            username: env::var("CHAT_HISTORY_DB_USERNAME").ok(),
            password: env::var("CHAT_HISTORY_DB_PASSWORD").ok(),
            enable_message_feedback: env::var("CHAT_HISTORY_ENABLE_FEEDBACK")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

/// Construction-time connection errors.
///
/// Each failure mode gets its own human-readable variant so a misconfigured
/// deployment can tell apart a bad endpoint, bad credentials, and a bad
/// namespace/database selection.
#[derive(Debug, Clone)]
pub enum ConnectError {
    /// The endpoint URL could not be reached or is not a valid engine URL.
    Endpoint(String),
    /// Root sign-in was rejected.
    Credentials(String),
    /// The namespace/database selection failed.
    Database(String),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoint(msg) => write!(f, "Invalid database endpoint: {}", msg),
            Self::Credentials(msg) => write!(f, "Invalid database credentials: {}", msg),
            Self::Database(msg) => write!(f, "Invalid database selection: {}", msg),
        }
    }
}

impl std::error::Error for ConnectError {}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db, ConnectError> {
    let db = surrealdb::engine::any::connect(config.url)
        .await
        .map_err(|e| ConnectError::Endpoint(e.to_string()))?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await
        .map_err(|e| ConnectError::Credentials(e.to_string()))?;
    }

    // Use the specified namespace and database
    db.use_ns(config.namespace)
        .use_db(config.database)
        .await
        .map_err(|e| ConnectError::Database(e.to_string()))?;

    Ok(db)
}

pub async fn ensure_schema(db: &Db) -> anyhow::Result<()> {
    // Define schema for each table
    let schema_queries = vec![
        // Conversations. `conversation_id` is the UUID string handed to
        // clients; the record id stays database-internal.
        "DEFINE TABLE conversation SCHEMAFULL;
         DEFINE FIELD conversation_id ON TABLE conversation TYPE string;
         DEFINE FIELD user_id ON TABLE conversation TYPE string;
         DEFINE FIELD user_email ON TABLE conversation TYPE string;
         DEFINE FIELD title ON TABLE conversation TYPE string;
         DEFINE FIELD created_at ON TABLE conversation TYPE datetime;
         DEFINE FIELD updated_at ON TABLE conversation TYPE datetime;",
        // Messages. SCHEMALESS so the feedback field only exists on
        // deployments that enable it.
        "DEFINE TABLE message SCHEMALESS;
         DEFINE FIELD message_id ON TABLE message TYPE string;
         DEFINE FIELD user_id ON TABLE message TYPE string;
         DEFINE FIELD user_email ON TABLE message TYPE string;
         DEFINE FIELD conversation_id ON TABLE message TYPE string;
         DEFINE FIELD role ON TABLE message TYPE string;
         DEFINE FIELD content ON TABLE message TYPE string;
         DEFINE FIELD created_at ON TABLE message TYPE datetime;
         DEFINE FIELD updated_at ON TABLE message TYPE datetime;",
        // Application users, looked up by their external principal id.
        "DEFINE TABLE app_user SCHEMAFULL;
         DEFINE FIELD user_id ON TABLE app_user TYPE string;
         DEFINE FIELD name ON TABLE app_user TYPE string;
         DEFINE FIELD role ON TABLE app_user TYPE string;
         DEFINE FIELD created_at ON TABLE app_user TYPE datetime;",
        // Invitations, looked up by email.
        "DEFINE TABLE invitation SCHEMAFULL;
         DEFINE FIELD email ON TABLE invitation TYPE string;
         DEFINE FIELD invitation_code ON TABLE invitation TYPE string;
         DEFINE FIELD has_checked_invitation ON TABLE invitation TYPE bool DEFAULT false;
         DEFINE FIELD last_checked_at ON TABLE invitation TYPE option<datetime>;",
        // Indexes for the two parameterized query patterns.
        "DEFINE INDEX conversation_user ON TABLE conversation COLUMNS user_id;
         DEFINE INDEX conversation_user_cid ON TABLE conversation COLUMNS user_id, conversation_id;
         DEFINE INDEX message_user_conversation ON TABLE message COLUMNS user_id, conversation_id;
         DEFINE INDEX message_user_mid ON TABLE message COLUMNS user_id, message_id;
         DEFINE INDEX app_user_user_id ON TABLE app_user COLUMNS user_id;
         DEFINE INDEX invitation_email ON TABLE invitation COLUMNS email;",
    ];

    for query in schema_queries {
        db.query(query).await?;
    }

    Ok(())
}
