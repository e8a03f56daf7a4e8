//! Roomchat CLI - terminal client for the multi-room chat server.
//!
//! This is the main binary entry point. See the `roomchat` library for the
//! core functionality.

use anyhow::{Context, Result};
use mimalloc::MiMalloc;
use roomchat::api::types::CreateRoomRequest;
use roomchat::commands::{self, chat::Start};
use roomchat::RoomId;

/// Global allocator configured per M-MIMALLOC-APPS guideline.
/// mimalloc provides better multi-threaded performance than the system allocator.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
use clap::{Parser, Subcommand};

// CLI
#[derive(Parser)]
#[command(name = "roomchat")]
#[command(version)]
#[command(about = "Terminal client for multi-room chat")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        /// Login name
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List chat rooms
    Rooms,
    /// Create a room and start chatting in it
    Create {
        /// Room name
        name: String,
        /// Room description
        #[arg(long, default_value = "")]
        description: String,
        /// Make the room invite-only
        #[arg(long)]
        private: bool,
    },
    /// Delete a room
    Delete {
        /// Room id
        id: u64,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Join a room and start chatting
    Join {
        /// Room id
        id: u64,
    },
    /// Show or change configuration
    Config {
        key: Option<String>,
        value: Option<String>,
    },
}

fn init_logging() -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder.format_timestamp_secs();

    // Keep log lines out of the chat when a log file is given
    if let Ok(path) = std::env::var("ROOMCHAT_LOG_FILE") {
        let log_file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create log file at {path}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Login { username, password } => {
            commands::account::login(&username, password).await?;
        }
        Commands::Logout => {
            commands::account::logout()?;
        }
        Commands::Whoami => {
            commands::account::whoami().await?;
        }
        Commands::Rooms => {
            commands::rooms::list().await?;
        }
        Commands::Create {
            name,
            description,
            private,
        } => {
            let request = CreateRoomRequest {
                name,
                description,
                is_private: private,
            };
            commands::chat::run(Start::Create(request)).await?;
        }
        Commands::Delete { id, yes } => {
            commands::rooms::delete(id, yes).await?;
        }
        Commands::Join { id } => {
            commands::chat::run(Start::Join(RoomId(id))).await?;
        }
        Commands::Config { key, value } => {
            commands::settings::run(key.as_deref(), value.as_deref())?;
        }
    }

    Ok(())
}
