//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Press tool cycle tracker.
///
/// Records cumulative cycle-count observations per press and derives tool
/// wear, occupancy timelines, and cross-press conflicts from them.
#[derive(Debug, Parser)]
#[command(name = "pt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record and inspect cycle observations.
    Cycles {
        #[command(subcommand)]
        action: CyclesAction,
    },

    /// Press report: usage summaries and aggregate statistics.
    Report {
        /// Press number (0, 2, 3, 4, or 5).
        #[arg(long)]
        press: u8,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Cross-press overlap report.
    Overlaps {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage tool regenerations.
    Regen {
        #[command(subcommand)]
        action: RegenAction,
    },

    /// Manage tools.
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Manage operators.
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
}

/// Cycle ledger operations.
#[derive(Debug, Subcommand)]
pub enum CyclesAction {
    /// Append a cycle observation to the ledger.
    Add {
        /// Press number (0, 2, 3, 4, or 5).
        #[arg(long)]
        press: u8,

        /// Tool id.
        #[arg(long)]
        tool: i64,

        /// Tool position: top, "cassette top", or bottom.
        #[arg(long)]
        position: String,

        /// Cumulative press counter reading.
        #[arg(long)]
        total: i64,

        /// Acting operator id.
        #[arg(long)]
        user: i64,

        /// Observation timestamp, RFC 3339. Defaults to now.
        #[arg(long)]
        date: Option<String>,
    },

    /// List ledger records for a press or a tool, newest first.
    List {
        /// Press number to list.
        #[arg(long, conflicts_with = "tool")]
        press: Option<u8>,

        /// Tool id to list.
        #[arg(long)]
        tool: Option<i64>,

        /// Maximum number of records.
        #[arg(long)]
        limit: Option<i64>,

        /// Number of records to skip.
        #[arg(long)]
        offset: Option<i64>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Remove a ledger record (administrative).
    Delete {
        /// Cycle record id.
        id: i64,
    },
}

/// Regeneration state machine operations.
#[derive(Debug, Subcommand)]
pub enum RegenAction {
    /// Start regenerating a tool.
    Start {
        /// Tool id.
        #[arg(long)]
        tool: i64,

        /// Free-text reason.
        #[arg(long, default_value = "")]
        reason: String,

        /// Acting operator id.
        #[arg(long)]
        user: i64,
    },

    /// Finish a regeneration, keeping its history.
    Stop {
        /// Tool id.
        #[arg(long)]
        tool: i64,

        /// Acting operator id.
        #[arg(long)]
        user: i64,
    },

    /// Cancel an in-progress regeneration, deleting its record.
    Abort {
        /// Tool id.
        #[arg(long)]
        tool: i64,

        /// Acting operator id.
        #[arg(long)]
        user: i64,
    },

    /// Show a tool's regeneration history, newest first.
    History {
        /// Tool id.
        #[arg(long)]
        tool: i64,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Tool management operations.
#[derive(Debug, Subcommand)]
pub enum ToolsAction {
    /// Add a tool.
    Add {
        /// Tool position: top, "cassette top", or bottom.
        #[arg(long)]
        position: String,

        /// Plate width.
        #[arg(long, default_value_t = 0)]
        width: i64,

        /// Plate height.
        #[arg(long, default_value_t = 0)]
        height: i64,

        /// Tool code, e.g. G01.
        #[arg(long)]
        code: String,

        /// Tool type, e.g. FC.
        #[arg(long, default_value = "")]
        kind: String,
    },

    /// List all tools with their derived status.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Mount a tool on a press, or take it off when --press is omitted.
    SetPress {
        /// Tool id.
        #[arg(long)]
        tool: i64,

        /// Press number (0, 2, 3, 4, or 5).
        #[arg(long)]
        press: Option<u8>,

        /// Acting operator id.
        #[arg(long)]
        user: i64,
    },

    /// Mark a tool dead. Refused while the tool is mounted on a press.
    MarkDead {
        /// Tool id.
        #[arg(long)]
        tool: i64,

        /// Acting operator id.
        #[arg(long)]
        user: i64,
    },

    /// Bring a dead tool back.
    Revive {
        /// Tool id.
        #[arg(long)]
        tool: i64,

        /// Acting operator id.
        #[arg(long)]
        user: i64,
    },
}

/// Operator management operations.
#[derive(Debug, Subcommand)]
pub enum UsersAction {
    /// Add an operator.
    Add {
        /// Display name.
        name: String,
    },

    /// List all operators.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
