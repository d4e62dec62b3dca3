//! Command-line interface for uttt.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ultimate Tic-Tac-Toe against a search engine, with history and snapshots
#[derive(Parser, Debug)]
#[command(name = "uttt")]
#[command(about = "Play Ultimate Tic-Tac-Toe with rewind and snapshots", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use the built-in first-legal opponent instead of the engine
    #[arg(long, global = true)]
    pub offline: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new match
    New {
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// List matches
    Games {
        /// Include finished matches
        #[arg(long)]
        all: bool,
    },

    /// Print the board of a match
    Show {
        /// Match id
        id: String,

        /// Show the position after this many moves instead of the cursor
        #[arg(long)]
        at: Option<usize>,
    },

    /// Play a move; the opponent answers
    Play {
        /// Match id
        id: String,

        /// Sub-board, 1-9
        #[arg(value_parser = clap::value_parser!(u8).range(1..=9))]
        board: u8,

        /// Cell, 1-9
        #[arg(value_parser = clap::value_parser!(u8).range(1..=9))]
        cell: u8,
    },

    /// Ask the opponent to move again after a failure
    Retry {
        /// Match id
        id: String,
    },

    /// Move the cursor to the position after N moves
    Goto {
        /// Match id
        id: String,

        /// Number of moves in effect
        n: usize,
    },

    /// Snapshot the current position
    Snapshot {
        /// Match id
        id: String,

        /// Label (defaults to "Snapshot at move N")
        #[arg(long)]
        label: Option<String>,
    },

    /// List snapshots
    Snapshots {
        /// Match id
        id: String,
    },

    /// Restore a snapshot
    Restore {
        /// Match id
        id: String,

        /// Snapshot id
        snapshot: String,
    },

    /// Rename a match
    Rename {
        /// Match id
        id: String,

        /// New name
        name: String,
    },
}
