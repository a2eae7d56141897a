//! CLI module for funnelboard
//!
//! Provides the command-line interface using clap.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Funnelboard - move opportunities through a sales pipeline
#[derive(Parser, Debug)]
#[command(name = "funnelboard")]
#[command(version)]
#[command(about = "Move opportunities through a kanban sales pipeline")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress info-level output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Preview operations without writing the board
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Override the working directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a .funnelboard directory with a starter sales funnel
    Init {
        /// Overwrite an existing board
        #[arg(long)]
        force: bool,
    },

    /// Show every stage with its opportunity count and value
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show details of a specific opportunity
    Show {
        /// Opportunity ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report what a stage would ask for before accepting an opportunity
    Check {
        /// Opportunity ID
        id: String,

        /// Destination stage ID
        #[arg(long)]
        to: String,
    },

    /// Move an opportunity to another stage
    Move {
        /// Opportunity ID
        id: String,

        /// Destination stage ID
        #[arg(long)]
        to: String,

        /// Position in the destination stage (defaults to the end)
        #[arg(long)]
        index: Option<usize>,

        /// Required field value as name=value, repeatable
        #[arg(long = "field", value_name = "NAME=VALUE")]
        field: Vec<String>,

        /// Required task ID to mark complete, repeatable
        #[arg(long = "task", value_name = "TASK_ID")]
        task: Vec<String>,

        /// Reason for winning, for win stages
        #[arg(long)]
        win_reason: Option<String>,

        /// Reason for losing, for loss stages
        #[arg(long)]
        loss_reason: Option<String>,
    },

    /// Validate the board document
    Doctor,
}
