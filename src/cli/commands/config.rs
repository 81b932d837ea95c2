//! `shelfwise config` command - inspect configuration
//!
//! Values come from (lowest to highest priority) the global config, the
//! project config and the environment.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::discover_project;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show paths to configuration files
    Path,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show => run_show(global),
        ConfigCommands::Path => run_path(global),
    }
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    let project = discover_project(global).ok();
    let config = Config::load_for(project.as_ref());

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&config).into_diagnostic()?);
            return Ok(());
        }
        _ => {}
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    println!("  {:<14} {}", style("user").cyan(), config.user());
    println!("  {:<14} {}", style("offline").cyan(), config.offline());
    match &project {
        Some(project) => println!(
            "  {:<14} {}",
            style("store").cyan(),
            config.store_path(project).display()
        ),
        None => println!("  {:<14} {}", style("store").cyan(), style("(no project)").dim()),
    }
    let advance = config.auto_advance();
    let cycle: Vec<&str> = advance.cycle.iter().map(|m| m.as_str()).collect();
    println!(
        "  {:<14} [{}] single_only={}",
        style("auto_advance").cyan(),
        cycle.join(", "),
        advance.single_only
    );

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (SHELFWISE_USER, SHELFWISE_OFFLINE)");
    println!("  2. Project config (.shelfwise/config.yaml)");
    println!("  3. Global config (~/.config/shelfwise/config.yaml)");
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    if let Ok(project) = discover_project(global) {
        println!("project: {}", project.config_path().display());
    }
    if let Some(path) = Config::global_config_path() {
        println!("global:  {}", path.display());
    }
    Ok(())
}
