//! CLI argument parsing for Tempo.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tempo",
    about = "Tasks, epics and subtasks on a conflict-free schedule",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/tempo/logs/tempo.log"
)]
pub struct Cli {
    /// Path to the snapshot file
    #[arg(short, long, global = true, default_value = "tasks.csv")]
    pub file: PathBuf,

    /// Keep at most this many entries in the view history
    #[arg(long, global = true)]
    pub history_limit: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a task
    Task {
        /// Task name
        name: String,

        /// Description
        #[arg(short = 'D', long, default_value = "")]
        description: String,

        /// Start time, e.g. 2025-01-06T10:00
        #[arg(short, long, requires = "minutes")]
        start: Option<String>,

        /// Duration in minutes
        #[arg(short, long)]
        minutes: Option<i64>,
    },

    /// Create an epic
    Epic {
        /// Epic name
        name: String,

        /// Description
        #[arg(short = 'D', long, default_value = "")]
        description: String,
    },

    /// Create a subtask inside an epic
    Subtask {
        /// Owning epic ID
        epic_id: u64,

        /// Subtask name
        name: String,

        /// Description
        #[arg(short = 'D', long, default_value = "")]
        description: String,

        /// Start time, e.g. 2025-01-06T10:00
        #[arg(short, long, requires = "minutes")]
        start: Option<String>,

        /// Duration in minutes
        #[arg(short, long)]
        minutes: Option<i64>,
    },

    /// Show an entity by ID (recorded in history)
    Get {
        /// Entity ID
        id: u64,
    },

    /// List entities of one kind (tasks, epics, subtasks)
    List {
        /// Kind to list
        #[arg(default_value = "tasks")]
        kind: String,

        /// Only the subtasks of this epic
        #[arg(short, long, conflicts_with = "kind")]
        epic: Option<u64>,
    },

    /// Set the status of a task or subtask (new, in_progress, done)
    Status {
        /// Task or subtask ID
        id: u64,

        /// New status
        status: String,
    },

    /// Delete an entity by ID
    Delete {
        /// Entity ID
        id: u64,
    },

    /// Delete every entity of one kind
    Clear {
        /// Kind to clear (tasks, epics, subtasks)
        kind: String,
    },

    /// Show scheduled work in start order
    Prioritized,

    /// Show recently viewed entities
    History,

    /// Serve the store over HTTP in the foreground
    Serve {
        /// Listen address
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}
