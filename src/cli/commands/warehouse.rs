//! `shelfwise warehouse` command - create and list warehouses

use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_timestamp, success, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Layer, StageOptions};
use crate::entities::WarehouseFields;

#[derive(Subcommand, Debug)]
pub enum WarehouseCommands {
    /// Create a new warehouse
    New(NewArgs),

    /// List all warehouses in the store
    List,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Warehouse name
    #[arg(long, short = 'n')]
    pub name: String,
}

#[derive(Serialize)]
struct WarehouseRow<'a> {
    id: &'a str,
    #[serde(flatten)]
    fields: &'a WarehouseFields,
    blame: Option<&'a str>,
}

pub async fn run(cmd: WarehouseCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        WarehouseCommands::New(args) => run_new(args, global).await,
        WarehouseCommands::List => run_list(global).await,
    }
}

async fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let inventory = &mut session.inventory;

    let id = inventory.create_warehouse(WarehouseFields::new(args.name.clone()));
    inventory
        .stage(&id, StageOptions::default().and_commit())
        .await
        .into_diagnostic()?;

    match global.format {
        OutputFormat::Id => println!("{}", id),
        _ => success(global, format!("Created warehouse {} ({})", args.name, id)),
    }
    Ok(())
}

async fn run_list(global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let inventory = &mut session.inventory;
    let ids = inventory.load_warehouses().await.into_diagnostic()?;

    let rows: Vec<WarehouseRow> = ids
        .iter()
        .filter_map(|id| {
            let node = inventory.get::<WarehouseFields>(id)?;
            Some(WarehouseRow {
                id: id.as_str(),
                fields: node.fields(),
                blame: node.blame(),
            })
        })
        .collect();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&rows).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for row in &rows {
                println!("{}", row.id);
            }
        }
        OutputFormat::Tsv => {
            for row in &rows {
                println!("{}\t{}\t{}", row.id, row.fields.name, row.fields.categories.len());
            }
        }
        OutputFormat::Auto => {
            if rows.is_empty() {
                if !global.quiet {
                    println!("No warehouses found.");
                }
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["ID", "Name", "Categories", "Last modified", "By"]);
            for id in &ids {
                let Some(node) = inventory.get::<WarehouseFields>(id) else {
                    continue;
                };
                builder.push_record([
                    id.to_string(),
                    node.fields().name.clone(),
                    node.fields().categories.len().to_string(),
                    format_timestamp(node.last_modified()),
                    node.blame().unwrap_or("-").to_string(),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
            if !global.quiet {
                println!("{} warehouse(s) found", rows.len());
            }
        }
    }
    Ok(())
}
