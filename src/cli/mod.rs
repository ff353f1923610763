//! CLI command definitions for task-board
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::client::StatusFilter;
use crate::format::OutputFormat;
use crate::types::{Priority, SortField, SortOrder, TaskFilter};

/// Task board API server and client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Port for the API server (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Task collection URL for client commands (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format for client commands
    #[arg(short, long, value_enum, default_value = "markdown", global = true)]
    pub format: FormatArg,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    All,
    Completed,
    Pending,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => StatusFilter::All,
            StatusArg::Completed => StatusFilter::Completed,
            StatusArg::Pending => StatusFilter::Pending,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the API server (default if no subcommand given)
    Serve,

    /// List tasks
    List(ListArgs),

    /// Add a task
    Add(AddArgs),

    /// Mark a task completed
    Done { id: String },

    /// Mark a task pending again
    Reopen { id: String },

    /// Replace a task's text
    Edit { id: String, text: String },

    /// Delete a task
    Rm { id: String },

    /// Show aggregate statistics
    Stats,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Completion status to show
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,

    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,

    #[arg(long)]
    pub category: Option<String>,

    /// Case-insensitive text search
    #[arg(short, long)]
    pub search: Option<String>,

    /// Field to sort by (default createdAt)
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort ascending instead of descending
    #[arg(long)]
    pub asc: bool,
}

impl ListArgs {
    pub fn to_filter(&self) -> TaskFilter {
        let status: StatusFilter = self.status.map(Into::into).unwrap_or_default();
        TaskFilter {
            completed: status.as_completed(),
            priority: self.priority.map(|p| Priority::from(p).as_str().to_string()),
            category: self.category.clone().filter(|c| !c.is_empty()),
            search: self.search.clone().filter(|s| !s.is_empty()),
            sort_by: self
                .sort_by
                .as_deref()
                .map(SortField::parse)
                .unwrap_or_default(),
            sort_order: if self.asc {
                SortOrder::Asc
            } else {
                SortOrder::Desc
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task text
    pub text: String,

    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,

    #[arg(long)]
    pub category: Option<String>,

    /// Due date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub due: Option<String>,
}
