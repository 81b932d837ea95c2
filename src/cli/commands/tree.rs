//! `shelfwise tree` command - print a warehouse hierarchy

use console::style;
use miette::{IntoDiagnostic, Result};
use serde_json::Value;

use crate::cli::helpers::{describe, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Inventory, LayerId, LayerKind};

#[derive(clap::Args, Debug)]
pub struct TreeArgs {
    /// Warehouse id, or the path of any layer
    pub root: String,

    /// Deepest level to load
    #[arg(long, short = 'd', default_value = "tray")]
    pub depth: LayerKind,
}

pub async fn run(args: TreeArgs, global: &GlobalOpts) -> Result<()> {
    let mut session = Session::open(global)?;
    let path = crate::cli::helpers::layer_path(&args.root);
    let root = session
        .inventory
        .open_path(&path)
        .await
        .into_diagnostic()?;
    session
        .inventory
        .load(&root, crate::core::LoadOptions::deep(args.depth))
        .await
        .into_diagnostic()?;
    let inventory = &session.inventory;

    match global.format {
        OutputFormat::Json => {
            let tree = to_json(inventory, &root)?;
            println!("{}", serde_json::to_string_pretty(&tree).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            let tree = to_json(inventory, &root)?;
            print!("{}", serde_yml::to_string(&tree).into_diagnostic()?);
        }
        OutputFormat::Id | OutputFormat::Tsv => {
            let mut paths = Vec::new();
            inventory.dfs(&root, |node| paths.push(node.layer().id().clone()));
            for id in paths {
                let path = inventory.path(&id).into_diagnostic()?;
                if global.format == OutputFormat::Tsv {
                    println!("{}\t{}", path, describe(inventory, &id));
                } else {
                    println!("{}", path);
                }
            }
        }
        OutputFormat::Auto => print_tree(inventory, &root, "", true, true),
    }
    Ok(())
}

fn print_tree(inventory: &Inventory, id: &LayerId, prefix: &str, last: bool, top: bool) {
    let Some(node) = inventory.node(id) else {
        return;
    };
    let kind = node.kind();
    let branch = match (top, last) {
        (true, _) => "",
        (false, true) => "└── ",
        (false, false) => "├── ",
    };
    println!(
        "{}{}{} {} {}",
        prefix,
        branch,
        style(kind).dim(),
        describe(inventory, id),
        style(id).cyan().dim()
    );

    let children = inventory.children(id);
    let child_prefix = match (top, last) {
        (true, _) => prefix.to_string(),
        (false, true) => format!("{}    ", prefix),
        (false, false) => format!("{}│   ", prefix),
    };
    for (i, child) in children.iter().enumerate() {
        print_tree(inventory, child, &child_prefix, i + 1 == children.len(), false);
    }
}

/// Nested JSON view of the loaded subtree
fn to_json(inventory: &Inventory, id: &LayerId) -> Result<Value> {
    let mut object = inventory.document_for(id).into_diagnostic()?;
    let kind = inventory
        .node(id)
        .map(|n| n.kind())
        .ok_or_else(|| miette::miette!("layer '{}' is not loaded", id))?;
    object.insert("id".to_string(), Value::from(id.as_str()));
    object.insert("kind".to_string(), Value::from(kind.as_str()));

    let children = inventory
        .children(id)
        .iter()
        .map(|child| to_json(inventory, child))
        .collect::<Result<Vec<_>>>()?;
    if let Some(child_kind) = kind.child() {
        object.insert(child_kind.collection().to_string(), Value::Array(children));
    }
    Ok(Value::Object(object))
}
