//! `shelfwise tray` command - add, edit and remove trays

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{
    describe, parse_expiry, resolve_category, success, Session,
};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Inventory, LayerId, LayerKind, LoadOptions, StageOptions};
use crate::entities::TrayFields;
use crate::grid::{auto_advance, InputMode, Selection, ShelfView, TrayCell};

#[derive(Subcommand, Debug)]
pub enum TrayCommands {
    /// Put a new tray on top of a column
    Add(AddArgs),

    /// Change fields of an existing tray
    Set(SetArgs),

    /// Remove a tray; trays above it move down
    Rm(RmArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Path of the column
    pub column: String,

    #[command(flatten)]
    pub fields: FieldArgs,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Path of the tray
    pub tray: String,

    #[command(flatten)]
    pub fields: FieldArgs,

    /// Clear the category
    #[arg(long, conflicts_with = "category")]
    pub clear_category: bool,

    /// Clear the expiry
    #[arg(long, conflicts_with = "expiry")]
    pub clear_expiry: bool,

    /// Clear the weight
    #[arg(long, conflicts_with = "weight")]
    pub clear_weight: bool,

    /// Clear the comment
    #[arg(long, conflicts_with = "comment")]
    pub clear_comment: bool,
}

#[derive(clap::Args, Debug)]
pub struct FieldArgs {
    /// Category id, short name or name
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Expiry as YYYY or YYYY-MM
    #[arg(long, short = 'e')]
    pub expiry: Option<String>,

    /// Weight in kilograms
    #[arg(long, short = 'w')]
    pub weight: Option<f64>,

    /// Free-text comment
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Path of the tray
    pub tray: String,
}

pub async fn run(cmd: TrayCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TrayCommands::Add(args) => run_add(args, global).await,
        TrayCommands::Set(args) => run_set(args, global).await,
        TrayCommands::Rm(args) => run_rm(args, global).await,
    }
}

/// Apply the given field arguments on top of `fields`
fn apply_fields(
    inventory: &Inventory,
    warehouse: &LayerId,
    args: &FieldArgs,
    mut fields: TrayFields,
) -> Result<TrayFields> {
    if let Some(category) = &args.category {
        fields = fields.with_category(Some(resolve_category(inventory, warehouse, category)?));
    }
    if let Some(expiry) = &args.expiry {
        fields = fields.with_expiry(Some(parse_expiry(expiry)?));
    }
    if let Some(weight) = args.weight {
        if !weight.is_finite() || weight < 0.0 {
            return Err(miette::miette!(
                "weight must be a finite, non-negative number (got {})",
                weight
            ));
        }
        fields = fields.with_weight(Some(weight));
    }
    if let Some(comment) = &args.comment {
        fields = fields.with_comment(Some(comment.clone()));
    }
    Ok(fields)
}

/// The input mode an edit corresponds to, for auto-advance
fn edited_mode(args: &FieldArgs) -> Option<InputMode> {
    if args.category.is_some() {
        Some(InputMode::Category)
    } else if args.expiry.is_some() {
        Some(InputMode::Expiry)
    } else if args.weight.is_some() {
        Some(InputMode::Weight)
    } else if args.comment.is_some() {
        Some(InputMode::Custom)
    } else {
        None
    }
}

fn warehouse_of(inventory: &Inventory, id: &LayerId) -> Result<LayerId> {
    inventory
        .warehouse_of(id)
        .ok_or_else(|| miette::miette!("layer '{}' has no warehouse", id))
}

async fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let column = session
        .open_deep(&args.column, LayerKind::Column, LayerKind::Tray)
        .await?;
    let inventory = &mut session.inventory;

    let warehouse = warehouse_of(inventory, &column)?;
    let fields = apply_fields(inventory, &warehouse, &args.fields, TrayFields::default())?;
    let id = inventory.create_tray(&column, fields).into_diagnostic()?;
    inventory
        .stage(&id, StageOptions::default().and_commit())
        .await
        .into_diagnostic()?;

    let path = inventory.path(&id).into_diagnostic()?;
    match global.format {
        OutputFormat::Id => println!("{}", path),
        _ => success(global, format!("Added tray {}", path)),
    }
    Ok(())
}

async fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let tray = session.open_layer(&args.tray, LayerKind::Tray).await?;
    let warehouse = warehouse_of(&session.inventory, &tray)?;

    let current = session
        .inventory
        .fields::<TrayFields>(&tray)
        .cloned()
        .unwrap_or_default();
    let mut fields = apply_fields(&session.inventory, &warehouse, &args.fields, current)?;
    if args.clear_category {
        fields = fields.with_category(None);
    }
    if args.clear_expiry {
        fields = fields.with_expiry(None);
    }
    if args.clear_weight {
        fields = fields.with_weight(None);
    }
    if args.clear_comment {
        fields = fields.with_comment(None);
    }

    let patch = session
        .inventory
        .update::<TrayFields, _>(&tray, |_| fields)
        .into_diagnostic()?;
    if patch.is_empty() {
        success(global, "Nothing to change");
        return Ok(());
    }
    let changed: Vec<String> = patch.keys().cloned().collect();
    session
        .inventory
        .stage(&tray, StageOptions::default().and_commit())
        .await
        .into_diagnostic()?;
    success(
        global,
        format!("Updated {} ({})", describe(&session.inventory, &tray), changed.join(", ")),
    );

    if let (Some(mode), false) = (edited_mode(&args.fields), global.quiet) {
        print_next(&mut session, &tray, mode).await?;
    }
    Ok(())
}

/// Show where auto-advance would take the operator after this edit
async fn print_next(session: &mut Session, tray: &LayerId, mode: InputMode) -> Result<()> {
    let inventory = &mut session.inventory;
    let shelf = inventory
        .parent(tray)
        .and_then(|column| inventory.parent(column))
        .cloned()
        .ok_or_else(|| miette::miette!("tray '{}' is not on a shelf", tray))?;
    inventory
        .load(&shelf, LoadOptions::deep(LayerKind::Tray))
        .await
        .into_diagnostic()?;

    let mut view = ShelfView::new(shelf);
    let grid = view.cell_grid(inventory).into_diagnostic()?;
    let selection = Selection::single(TrayCell::Tray(tray.clone()));
    let next = auto_advance(
        &session.config.auto_advance(),
        mode,
        &selection,
        &grid,
        inventory,
    );

    let target = match next.selection.last_touched() {
        Some(TrayCell::Tray(id)) => inventory.path(id).into_diagnostic()?,
        Some(TrayCell::Space(space)) => format!(
            "empty slot {} of {}",
            space.index,
            inventory.path(&space.column).into_diagnostic()?
        ),
        None => return Ok(()),
    };
    println!(
        "{} {} ({})",
        style("next:").dim(),
        target,
        style(next.mode).yellow()
    );
    Ok(())
}

async fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let tray = session.open_layer(&args.tray, LayerKind::Tray).await?;
    let inventory = &mut session.inventory;

    let path = inventory.path(&tray).into_diagnostic()?;
    let report = inventory.delete(&tray, true).await.into_diagnostic()?;

    let ops = report.map_or(0, |r| r.ops);
    success(global, format!("Removed tray {} ({} write(s))", path, ops));
    Ok(())
}
