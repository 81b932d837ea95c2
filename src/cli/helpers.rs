//! Shared helper functions for CLI commands
//!
//! Opening the project store, resolving layer arguments, and formatting
//! values the same way across every command.

use chrono::{DateTime, Local, Utc};
use console::style;
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;

use crate::cli::GlobalOpts;
use crate::core::{
    Config, Inventory, LayerId, LayerKind, LayerNode, LoadOptions, Project, SqliteStore,
};
use crate::entities::{ExpiryRange, WarehouseFields};

/// Everything a store-backed command needs
pub struct Session {
    pub project: Project,
    pub config: Config,
    pub inventory: Inventory,
}

impl Session {
    /// Discover the project, load its config and open its store
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = discover_project(global)?;
        let config = Config::load_for(Some(&project));
        let store = SqliteStore::open(&config.store_path(&project)).into_diagnostic()?;
        let mut inventory = Inventory::new(Arc::new(store), config.user());
        inventory.set_offline(config.offline());
        Ok(Self {
            project,
            config,
            inventory,
        })
    }

    /// Open a layer path and make sure it is of the expected kind
    pub async fn open_layer(&mut self, arg: &str, expected: LayerKind) -> Result<LayerId> {
        let path = layer_path(arg);
        let id = self.inventory.open_path(&path).await.into_diagnostic()?;
        let actual = self
            .inventory
            .node(&id)
            .map(LayerNode::kind)
            .ok_or_else(|| miette::miette!("'{}' did not resolve to a layer", arg))?;
        if actual != expected {
            return Err(miette::miette!(
                "'{}' is a {}, expected a {}",
                arg,
                actual,
                expected
            ));
        }
        Ok(id)
    }

    /// Open a layer and load its children down to `depth`
    pub async fn open_deep(&mut self, arg: &str, expected: LayerKind, depth: LayerKind) -> Result<LayerId> {
        let id = self.open_layer(arg, expected).await?;
        self.inventory
            .load(&id, LoadOptions::deep(depth))
            .await
            .into_diagnostic()?;
        Ok(id)
    }
}

/// Find the project from --project or the current directory
pub fn discover_project(global: &GlobalOpts) -> Result<Project> {
    let found = match &global.project {
        Some(root) => Project::discover_from(root),
        None => Project::discover(),
    };
    found.map_err(|e| miette::miette!("{}", e))
}

/// A bare id names a warehouse; anything with a `/` is a full layer path
pub fn layer_path(arg: &str) -> String {
    let trimmed = arg.trim_matches('/');
    if trimmed.contains('/') {
        trimmed.to_string()
    } else {
        format!("{}/{}", LayerKind::Warehouse.collection(), trimmed)
    }
}

/// Find a category by id, short name or name (case-insensitive)
pub fn resolve_category(inventory: &Inventory, warehouse: &LayerId, query: &str) -> Result<LayerId> {
    let fields = inventory
        .fields::<WarehouseFields>(warehouse)
        .ok_or_else(|| miette::miette!("warehouse '{}' is not loaded", warehouse))?;
    fields
        .categories
        .iter()
        .find(|c| {
            c.id.as_str() == query
                || c.short_name.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(query))
                || c.name.eq_ignore_ascii_case(query)
        })
        .map(|c| c.id.clone())
        .ok_or_else(|| {
            miette::miette!(
                "no category '{}' in warehouse '{}'. Add one with 'shelfwise category add'.",
                query,
                warehouse
            )
        })
}

/// Parse `YYYY` or `YYYY-MM` into an expiry range
pub fn parse_expiry(s: &str) -> Result<ExpiryRange> {
    let invalid = || miette::miette!("invalid expiry '{}' (expected YYYY or YYYY-MM)", s);
    let range = match s.split_once('-') {
        Some((year, month)) => {
            let year = year.parse::<i32>().map_err(|_| invalid())?;
            let month = month.parse::<u32>().map_err(|_| invalid())?;
            ExpiryRange::month(year, month)
        }
        None => ExpiryRange::year(s.parse::<i32>().map_err(|_| invalid())?),
    };
    range.ok_or_else(invalid)
}

/// Parse a grid position written as `column.row` (both zero-based)
pub fn parse_position(s: &str) -> Result<(usize, usize)> {
    let invalid = || miette::miette!("invalid position '{}' (expected COLUMN.ROW, e.g. 0.2)", s);
    let (column, row) = s.split_once('.').ok_or_else(invalid)?;
    Ok((
        column.parse().map_err(|_| invalid())?,
        row.parse().map_err(|_| invalid())?,
    ))
}

/// One-line description of a layer for trees and listings
pub fn describe(inventory: &Inventory, id: &LayerId) -> String {
    let Some(node) = inventory.node(id) else {
        return id.to_string();
    };
    match node {
        LayerNode::Warehouse(n) => format!("{} ({} categories)", n.fields().name, n.fields().categories.len()),
        LayerNode::Zone(n) => n.fields().name.clone(),
        LayerNode::Bay(n) => format!("#{} {}", n.fields().index, n.fields().name),
        LayerNode::Shelf(n) => format!("#{} {}", n.fields().index, n.fields().name),
        LayerNode::Column(n) => match n.fields().max_height {
            Some(h) if h > 0 => format!("#{} (max {})", n.fields().index, h),
            _ => format!("#{} (unbounded)", n.fields().index),
        },
        LayerNode::Tray(n) => {
            let fields = n.fields();
            let category = fields
                .category
                .as_ref()
                .and_then(|c| {
                    inventory
                        .warehouse_of(id)
                        .and_then(|w| inventory.category_by_id(&w, c).map(|c| c.label().to_string()))
                })
                .unwrap_or_else(|| "-".to_string());
            let expiry = fields
                .expiry
                .as_ref()
                .map(|e| e.label.clone())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "#{} {} {} {}",
                fields.index,
                category,
                expiry,
                format_weight(fields.weight)
            )
        }
    }
}

pub fn format_weight(weight: Option<f64>) -> String {
    weight.map_or_else(|| "-".to_string(), |w| format!("{:.2}kg", w))
}

pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "-".to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Truncate a string to max_len, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a success line unless --quiet
pub fn success(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        println!("{} {}", style("✓").green(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_path() {
        assert_eq!(layer_path("W1"), "warehouses/W1");
        assert_eq!(layer_path("/warehouses/W1/zones/Z1/"), "warehouses/W1/zones/Z1");
    }

    #[test]
    fn test_parse_expiry() {
        assert_eq!(parse_expiry("2025").unwrap().label, "2025");
        assert_eq!(parse_expiry("2025-03").unwrap().label, "Mar 2025");
        assert!(parse_expiry("2025-13").is_err());
        assert!(parse_expiry("soon").is_err());
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("1.3").unwrap(), (1, 3));
        assert!(parse_position("13").is_err());
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
    }

    #[test]
    fn test_format_weight() {
        assert_eq!(format_weight(Some(1.5)), "1.50kg");
        assert_eq!(format_weight(None), "-");
    }
}
