//! CLI argument definitions using clap
//!
//! Commands:
//! - queueview publish --topic <topic> <message>
//! - queueview set <message>
//! - queueview get <index>
//! - queueview scan --topic <topic> [--all]
//! - queueview next [--limit <n>]
//! - queueview dump
//! - queueview clear
//! - queueview info
//!
//! Every command takes `--config <path>` (default `./queueview.json`).
//! Messages are JSON values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// queueview - topic-addressed access to an append-only queue
#[derive(Parser, Debug)]
#[command(name = "queueview")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log lifecycle events below WARN as well
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Append a message under a topic
    Publish {
        /// Path to configuration file
        #[arg(long, default_value = "./queueview.json")]
        config: PathBuf,

        /// Topic to publish under
        #[arg(long)]
        topic: String,

        /// Message as JSON
        message: String,
    },

    /// Append a message under the empty topic
    Set {
        /// Path to configuration file
        #[arg(long, default_value = "./queueview.json")]
        config: PathBuf,

        /// Message as JSON
        message: String,
    },

    /// Read the record at an index
    Get {
        /// Path to configuration file
        #[arg(long, default_value = "./queueview.json")]
        config: PathBuf,

        /// Record index
        index: u64,
    },

    /// Find records on a topic, scanning from the first index
    Scan {
        /// Path to configuration file
        #[arg(long, default_value = "./queueview.json")]
        config: PathBuf,

        /// Topic to look for
        #[arg(long)]
        topic: String,

        /// Return every match instead of the first
        #[arg(long)]
        all: bool,
    },

    /// Read records in order from the first index
    Next {
        /// Path to configuration file
        #[arg(long, default_value = "./queueview.json")]
        config: PathBuf,

        /// Maximum number of records
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Print every record
    Dump {
        /// Path to configuration file
        #[arg(long, default_value = "./queueview.json")]
        config: PathBuf,
    },

    /// Remove every record
    Clear {
        /// Path to configuration file
        #[arg(long, default_value = "./queueview.json")]
        config: PathBuf,
    },

    /// Show index range, role and location
    Info {
        /// Path to configuration file
        #[arg(long, default_value = "./queueview.json")]
        config: PathBuf,
    },
}

impl Command {
    /// Configuration file of any command
    pub fn config(&self) -> &PathBuf {
        match self {
            Command::Publish { config, .. }
            | Command::Set { config, .. }
            | Command::Get { config, .. }
            | Command::Scan { config, .. }
            | Command::Next { config, .. }
            | Command::Dump { config }
            | Command::Clear { config }
            | Command::Info { config } => config,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
