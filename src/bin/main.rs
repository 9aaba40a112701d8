use anyhow::Result;
use chat_history::{DatabaseConfig, create_app_state, create_connection, ensure_schema};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chat-history")]
#[command(about = "Conversation history store for a chat application")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the history HTTP server
    Serve {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, env = "CHAT_HISTORY_DB_URL", default_value = "memory")]
        db_url: String,
        /// Whether new messages carry a feedback field
        #[arg(long, env = "CHAT_HISTORY_ENABLE_FEEDBACK", default_value_t = false)]
        enable_feedback: bool,
    },
    /// Initialize the database schema
    Init {
        #[arg(long, env = "CHAT_HISTORY_DB_URL", default_value = "memory")]
        db_url: String,
    },
    /// Probe the database and report store health
    Check {
        #[arg(long, env = "CHAT_HISTORY_DB_URL", default_value = "memory")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("chat_history=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            db_url,
            enable_feedback,
        } => {
            let config = DatabaseConfig {
                url: db_url,
                enable_message_feedback: enable_feedback,
                ..Default::default()
            };
            info!("Using database url for history server: {}", config.url);

            let state = create_app_state(config).await?;
            let app = chat_history::api::create_router(state);

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("History server listening on http://{}", bind);

            axum::serve(listener, app).await?;
        }
        Commands::Init { db_url } => {
            let config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url for initialization: {}", config.url);

            info!("Initializing database...");
            let db = create_connection(config).await?;
            ensure_schema(&db).await?;
            info!("Database initialized successfully");
        }
        Commands::Check { db_url } => {
            let config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            let db = create_connection(config).await?;

            let store = chat_history::HistoryStore::new(db, false);
            let (healthy, detail) = store.ensure().await;
            println!("{}", detail);
            if !healthy {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
