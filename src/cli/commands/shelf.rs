//! `shelfwise shelf` command - the padded tray grid of one shelf

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{describe, parse_position, truncate_str, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Inventory, LayerKind};
use crate::grid::{range_select, Selection, ShelfView, TrayCell};

#[derive(Subcommand, Debug)]
pub enum ShelfCommands {
    /// Show every column with its trays and empty slots
    Show(ShowArgs),

    /// Select a range of cells as a drag from one cell to another would
    Select(SelectArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Path of the shelf
    pub shelf: String,
}

#[derive(clap::Args, Debug)]
pub struct SelectArgs {
    /// Path of the shelf
    pub shelf: String,

    /// Cell the drag starts on, as COLUMN.ROW
    pub from: String,

    /// Cell the drag ends on, as COLUMN.ROW
    pub to: String,
}

#[derive(Serialize)]
struct CellRow {
    column: usize,
    row: usize,
    tray: Option<String>,
    label: String,
}

fn cell_row(inventory: &Inventory, column: usize, row: usize, cell: &TrayCell) -> CellRow {
    match cell {
        TrayCell::Tray(id) => CellRow {
            column,
            row,
            tray: Some(id.to_string()),
            label: describe(inventory, id),
        },
        TrayCell::Space(_) => CellRow {
            column,
            row,
            tray: None,
            label: "(empty)".to_string(),
        },
    }
}

pub async fn run(cmd: ShelfCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ShelfCommands::Show(args) => run_show(args, global).await,
        ShelfCommands::Select(args) => run_select(args, global).await,
    }
}

async fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let shelf = session
        .open_deep(&args.shelf, LayerKind::Shelf, LayerKind::Tray)
        .await?;
    let inventory = &session.inventory;

    let mut view = ShelfView::new(shelf);
    let grid = view.cell_grid(inventory).into_diagnostic()?;
    let rows: Vec<CellRow> = grid
        .iter()
        .enumerate()
        .flat_map(|(c, cells)| {
            cells
                .iter()
                .enumerate()
                .map(move |(r, cell)| cell_row(inventory, c, r, cell))
        })
        .collect();

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&rows).into_diagnostic()?),
        OutputFormat::Id => {
            for row in rows.iter().filter_map(|r| r.tray.as_ref()) {
                println!("{}", row);
            }
        }
        OutputFormat::Tsv => {
            for row in &rows {
                println!(
                    "{}.{}\t{}\t{}",
                    row.column,
                    row.row,
                    row.tray.as_deref().unwrap_or("-"),
                    row.label
                );
            }
        }
        OutputFormat::Auto => print_grid(inventory, &grid),
    }
    Ok(())
}

/// Columns side by side, top slot first
fn print_grid(inventory: &Inventory, grid: &[Vec<TrayCell>]) {
    if grid.is_empty() {
        println!("Shelf has no columns.");
        return;
    }
    let height = grid.iter().map(Vec::len).max().unwrap_or(0);
    let mut builder = Builder::default();
    builder.push_record((0..grid.len()).map(|c| format!("col {}", c)));
    for row in (0..height).rev() {
        builder.push_record(grid.iter().map(|cells| match cells.get(row) {
            Some(TrayCell::Tray(id)) => truncate_str(&describe(inventory, id), 24),
            Some(TrayCell::Space(_)) => "·".to_string(),
            None => String::new(),
        }));
    }
    println!("{}", builder.build().with(Style::rounded()));
}

async fn run_select(args: SelectArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let shelf = session
        .open_deep(&args.shelf, LayerKind::Shelf, LayerKind::Tray)
        .await?;
    let inventory = &session.inventory;

    let mut view = ShelfView::new(shelf);
    let grid = view.cell_grid(inventory).into_diagnostic()?;
    let at = |arg: &str| -> Result<TrayCell> {
        let (c, r) = parse_position(arg)?;
        grid.get(c)
            .and_then(|cells| cells.get(r))
            .cloned()
            .ok_or_else(|| miette::miette!("no cell at {} on this shelf", arg))
    };
    let from = at(&args.from)?;
    let to = at(&args.to)?;

    let sequence: Vec<TrayCell> = grid.iter().flatten().cloned().collect();
    let selection = range_select(&sequence, &Selection::new(), &from, &to);

    let rows: Vec<CellRow> = grid
        .iter()
        .enumerate()
        .flat_map(|(c, cells)| cells.iter().enumerate().map(move |(r, cell)| (c, r, cell)))
        .filter(|(_, _, cell)| selection.contains(cell))
        .map(|(c, r, cell)| cell_row(inventory, c, r, cell))
        .collect();

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&rows).into_diagnostic()?),
        _ => {
            for row in &rows {
                println!("{}.{}\t{}", row.column, row.row, row.label);
            }
            if !global.quiet {
                println!("{}", style(format!("{} cell(s) selected", rows.len())).dim());
            }
        }
    }
    Ok(())
}
