//! CLI module for the ragchat binary.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};

/// Retrieval-augmented conversational agent CLI.
#[derive(Debug, Parser)]
#[command(name = "ragchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format"
    )]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check infrastructure status (embedding provider, vector backend)
    Status,

    /// Create the vector index and chat store schema out-of-band
    Bootstrap,

    /// Ingest a document into the vector index
    Ingest(commands::IngestArgs),

    /// Run one chat turn against a session
    Chat(commands::ChatArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
