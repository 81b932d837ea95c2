//! Shelfwise: warehouse tray inventory
//!
//! A six-level hierarchy (warehouse, zone, bay, shelf, column, tray) mapped
//! onto a collection-oriented document store, plus the shelf-grid algorithms
//! an operator UI drives: padded columns, drag selection and auto-advance.

pub mod cli;
pub mod core;
pub mod entities;
pub mod grid;
