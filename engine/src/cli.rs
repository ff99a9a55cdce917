//! CLI interface for Codify
//!
//! Commands and global flags, defined with clap's derive API.

use clap::{Parser, Subcommand};
use sdk::types::Backend;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Codify - Your Coding Partner
///
/// Chat with a hosted model about programming problems. Every answer is traced
/// to LangSmith and can be rated.
#[derive(Parser, Debug)]
#[command(name = "codify")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the chat page
    Serve {
        /// Address to listen on (default: ui.bind from the config)
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question
        prompt: String,

        /// Model backend (mistral, gemini)
        #[arg(short, long)]
        backend: Option<Backend>,
    },

    /// Start an interactive chat in the terminal
    Chat {
        /// Model backend (mistral, gemini)
        #[arg(short, long)]
        backend: Option<Backend>,
    },

    /// Store API keys in the system keychain
    Setup,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check configuration and stored keys
    Doctor,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file location
    Path,
}
