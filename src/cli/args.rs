//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    add::AddArgs, category::CategoryCommands, completions::CompletionsArgs,
    config::ConfigCommands, init::InitArgs, shelf::ShelfCommands, tray::TrayCommands,
    tree::TreeArgs, warehouse::WarehouseCommands,
};

#[derive(Parser)]
#[command(name = "shelfwise")]
#[command(author, version, about = "Shelfwise warehouse tray inventory")]
#[command(long_about = "Manage a warehouse / zone / bay / shelf / column / tray hierarchy stored in a local document store.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .shelfwise/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new Shelfwise project
    Init(InitArgs),

    /// Warehouse management
    #[command(subcommand)]
    Warehouse(WarehouseCommands),

    /// Add a zone, bay, shelf or column under an existing layer
    Add(AddArgs),

    /// Tray management
    #[command(subcommand)]
    Tray(TrayCommands),

    /// Category management (stored on the warehouse)
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Print a warehouse hierarchy
    Tree(TreeArgs),

    /// Shelf grid: padded columns and range selection
    #[command(subcommand)]
    Shelf(ShelfCommands),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// Tab-separated values (for piping)
    Tsv,
    /// Just IDs, one per line
    Id,
}
