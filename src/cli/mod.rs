//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod helpers;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};

use miette::Result;

/// Run a parsed command line
pub async fn dispatch(cli: Cli) -> Result<()> {
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Warehouse(cmd) => commands::warehouse::run(cmd, &global).await,
        Commands::Add(args) => commands::add::run(args, &global).await,
        Commands::Tray(cmd) => commands::tray::run(cmd, &global).await,
        Commands::Category(cmd) => commands::category::run(cmd, &global).await,
        Commands::Tree(args) => commands::tree::run(args, &global).await,
        Commands::Shelf(cmd) => commands::shelf::run(cmd, &global).await,
        Commands::Config(cmd) => commands::config::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
