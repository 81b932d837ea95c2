//! `shelfwise add` command - add a zone, bay, shelf or column

use clap::ValueEnum;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{success, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{LayerKind, LoadOptions, StageOptions};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddKind {
    Zone,
    Bay,
    Shelf,
    Column,
}

impl AddKind {
    fn kind(self) -> LayerKind {
        match self {
            AddKind::Zone => LayerKind::Zone,
            AddKind::Bay => LayerKind::Bay,
            AddKind::Shelf => LayerKind::Shelf,
            AddKind::Column => LayerKind::Column,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// What to add
    #[arg(value_enum)]
    pub kind: AddKind,

    /// Path of the parent layer (a bare id means a warehouse)
    pub parent: String,

    /// Name (zones, bays and shelves)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Number of tray slots (columns only; omit for unbounded)
    #[arg(long)]
    pub max_height: Option<u32>,
}

pub async fn run(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let kind = args.kind.kind();
    let parent_kind = kind
        .parent()
        .ok_or_else(|| miette::miette!("a {} has no parent", kind))?;

    let mut session = Session::open(global)?;
    let parent = session.open_layer(&args.parent, parent_kind).await?;
    // siblings decide the next index
    session
        .inventory
        .load(&parent, LoadOptions::deep(kind))
        .await
        .into_diagnostic()?;

    let name = || {
        args.name
            .clone()
            .ok_or_else(|| miette::miette!("--name is required when adding a {}", kind))
    };
    let inventory = &mut session.inventory;
    let id = match args.kind {
        AddKind::Zone => inventory.create_zone(&parent, name()?),
        AddKind::Bay => inventory.create_bay(&parent, name()?),
        AddKind::Shelf => inventory.create_shelf(&parent, name()?),
        AddKind::Column => inventory.create_column(&parent, args.max_height),
    }
    .into_diagnostic()?;

    inventory
        .stage(&id, StageOptions::default().and_commit())
        .await
        .into_diagnostic()?;

    let path = inventory.path(&id).into_diagnostic()?;
    match global.format {
        OutputFormat::Id => println!("{}", path),
        _ => success(global, format!("Added {} {}", kind, path)),
    }
    Ok(())
}
