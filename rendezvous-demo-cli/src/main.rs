//! Rendezvous Demo CLI
//!
//! Command-line interface for trying the secure rendezvous channel between
//! two terminals.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod ui;

#[derive(Parser)]
#[command(name = "rendezvous-demo")]
#[command(about = "Rendezvous Demo CLI - Set up a secure channel through an untrusted relay", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Rendezvous endpoint new sessions are created under
    #[arg(long, global = true, env = "RENDEZVOUS_SERVER_URL")]
    server: Option<String>,

    /// Use the v1 algorithm (padded base64) when creating
    #[arg(long, global = true)]
    legacy: bool,

    /// Accept the check code without prompting
    #[arg(short, long, global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a rendezvous and wait for another device to join
    Create {
        /// User ID to put in the invite
        #[arg(short, long, default_value = "@demo:localhost")]
        user: String,

        /// Message to send once the channel is confirmed
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Join a rendezvous from an invite
    Join {
        /// Invite JSON, or a path to a file containing it (prompted if omitted)
        invite: Option<String>,

        /// Reply to send after the creator's message
        #[arg(short, long)]
        reply: Option<String>,
    },

    /// Show the check code for 5 derived bytes
    Code {
        /// 10 hex characters
        hex: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("rendezvous_demo=debug,rendezvous_lib=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("rendezvous_demo=info,rendezvous_lib=warn")
            .init();
    }

    let options = commands::SessionOptions {
        server: cli.server,
        legacy: cli.legacy,
        assume_yes: cli.yes,
        verbose: cli.verbose,
    };

    // Dispatch commands
    match cli.command {
        Commands::Create { user, message } => {
            commands::create::run(&options, &user, message.as_deref()).await?;
        }
        Commands::Join { invite, reply } => {
            commands::join::run(&options, invite.as_deref(), reply.as_deref()).await?;
        }
        Commands::Code { hex } => {
            commands::code::run(&hex, cli.verbose)?;
        }
    }

    Ok(())
}
