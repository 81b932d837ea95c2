//! `shelfwise category` command - categories live on the warehouse document

use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{success, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{LayerKind, StageOptions};
use crate::entities::{Category, WarehouseFields};

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Define a new category on a warehouse
    Add(AddArgs),

    /// List the categories of a warehouse
    List(ListArgs),

    /// Remove a category (trays keep the dangling id)
    Rm(RmArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Warehouse id
    pub warehouse: String,

    /// Category name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Short label shown in the shelf grid
    #[arg(long, short = 's')]
    pub short: Option<String>,

    /// Display colour (any CSS colour string)
    #[arg(long)]
    pub colour: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Warehouse id
    pub warehouse: String,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Warehouse id
    pub warehouse: String,

    /// Category id, short name or name
    pub category: String,
}

pub async fn run(cmd: CategoryCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CategoryCommands::Add(args) => run_add(args, global).await,
        CategoryCommands::List(args) => run_list(args, global).await,
        CategoryCommands::Rm(args) => run_rm(args, global).await,
    }
}

async fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let warehouse = session
        .open_layer(&args.warehouse, LayerKind::Warehouse)
        .await?;

    let mut category = Category::new(args.name.clone());
    if let Some(short) = args.short {
        category = category.with_short_name(short);
    }
    if let Some(colour) = args.colour {
        category = category.with_colour(colour);
    }
    let id = category.id.clone();

    let inventory = &mut session.inventory;
    inventory
        .update::<WarehouseFields, _>(&warehouse, |f| f.with_category(category))
        .into_diagnostic()?;
    inventory
        .stage(&warehouse, StageOptions::default().and_commit())
        .await
        .into_diagnostic()?;

    match global.format {
        OutputFormat::Id => println!("{}", id),
        _ => success(global, format!("Added category {} ({})", args.name, id)),
    }
    Ok(())
}

async fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let warehouse = session
        .open_layer(&args.warehouse, LayerKind::Warehouse)
        .await?;
    let categories = session
        .inventory
        .fields::<WarehouseFields>(&warehouse)
        .map(|f| f.categories.clone())
        .unwrap_or_default();

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&categories).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&categories).into_diagnostic()?),
        OutputFormat::Id => {
            for c in &categories {
                println!("{}", c.id);
            }
        }
        OutputFormat::Tsv => {
            for c in &categories {
                println!("{}\t{}\t{}", c.id, c.name, c.label());
            }
        }
        OutputFormat::Auto => {
            if categories.is_empty() {
                if !global.quiet {
                    println!("No categories defined.");
                }
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["ID", "Name", "Short", "Colour"]);
            for c in &categories {
                builder.push_record([
                    c.id.to_string(),
                    c.name.clone(),
                    c.label().to_string(),
                    c.colour.clone().unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));
        }
    }
    Ok(())
}

async fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let warehouse = session
        .open_layer(&args.warehouse, LayerKind::Warehouse)
        .await?;
    let inventory = &mut session.inventory;
    let category = crate::cli::helpers::resolve_category(inventory, &warehouse, &args.category)?;

    inventory
        .update::<WarehouseFields, _>(&warehouse, |f| f.without_category(&category))
        .into_diagnostic()?;
    inventory
        .stage(&warehouse, StageOptions::default().and_commit())
        .await
        .into_diagnostic()?;
    success(global, format!("Removed category {}", category));
    Ok(())
}
