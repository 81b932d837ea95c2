//! Entity type definitions
//!
//! The warehouse hierarchy, top to bottom:
//!
//! - [`Warehouse`] - top layer, owns the [`Category`] list
//! - [`Zone`] - named region of a warehouse
//! - [`Bay`] - run of shelving in a zone
//! - [`Shelf`] - one level of a bay
//! - [`Column`] - vertical stack of tray slots on a shelf
//! - [`Tray`] - bottom layer, a container of categorised stock

pub mod bay;
pub mod category;
pub mod column;
pub mod shelf;
pub mod tray;
pub mod warehouse;
pub mod zone;

pub use bay::{Bay, BayFields};
pub use category::Category;
pub use column::{Column, ColumnFields};
pub use shelf::{Shelf, ShelfFields};
pub use tray::{ExpiryRange, Tray, TrayFields};
pub use warehouse::{Warehouse, WarehouseFields};
pub use zone::{Zone, ZoneFields};
