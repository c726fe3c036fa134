#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use clap::{Parser, Subcommand};
use command::{ChatInput, ChatStrategy, CommandStrategy, InfoStrategy, InitStrategy, VersionStrategy};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "botline")]
#[command(about = "Console client for a conversation-relay bot service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start or continue a conversation
    Chat {
        /// Conversation ID to resume (skips the interactive menu)
        #[arg(short, long)]
        conversation: Option<String>,

        /// Watermark to replay history from when resuming
        #[arg(short, long)]
        watermark: Option<String>,
    },
    /// Initialize configuration
    Init,
    /// Show configuration
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            conversation,
            watermark,
        } => {
            info!("Starting chat session");
            ChatStrategy
                .execute(ChatInput {
                    conversation,
                    watermark,
                })
                .await?;
        }
        Commands::Init => {
            InitStrategy.execute(()).await?;
        }
        Commands::Info => {
            InfoStrategy.execute(()).await?;
        }
        Commands::Version => {
            VersionStrategy.execute(()).await?;
        }
    }

    Ok(())
}
